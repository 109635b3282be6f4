//! The vote record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{account::UserId, choice::ChoiceId, question::QuestionId};

/// Ties one user to one question and the choice they selected.
///
/// There is at most one `Vote` per `(user_id, question_id)` pair; voting
/// again rebinds `choice_id` and refreshes `voted_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
  pub user_id:     UserId,
  pub question_id: QuestionId,
  pub choice_id:   ChoiceId,
  /// Server-assigned; time of the most recent (re)vote.
  pub voted_at:    DateTime<Utc>,
}
