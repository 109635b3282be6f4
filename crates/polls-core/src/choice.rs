//! Choices and the aggregated results read model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  question::{Question, QuestionId},
};

/// Maximum length of a choice's text, in characters.
pub const MAX_CHOICE_TEXT: usize = 200;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChoiceId(pub i64);

impl fmt::Display for ChoiceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// One selectable option; belongs to exactly one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
  pub id:          ChoiceId,
  pub question_id: QuestionId,
  pub text:        String,
}

impl fmt::Display for Choice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text)
  }
}

pub fn validate_choice_text(text: &str) -> Result<()> {
  if text.trim().is_empty() || text.chars().count() > MAX_CHOICE_TEXT {
    return Err(Error::ChoiceText { max: MAX_CHOICE_TEXT });
  }
  Ok(())
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// A choice with the number of votes currently bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceTally {
  pub choice: Choice,
  pub votes:  u64,
}

/// Vote counts for a question, derived on read and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResults {
  pub question: Question,
  /// One entry per choice, in creation order, including choices with zero
  /// votes.
  pub tallies:  Vec<ChoiceTally>,
}

impl QuestionResults {
  pub fn total_votes(&self) -> u64 { self.tallies.iter().map(|t| t.votes).sum() }

  /// The tally for `id`, if it belongs to this question.
  pub fn tally(&self, id: ChoiceId) -> Option<&ChoiceTally> {
    self.tallies.iter().find(|t| t.choice.id == id)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn tally(id: i64, votes: u64) -> ChoiceTally {
    ChoiceTally {
      choice: Choice {
        id:          ChoiceId(id),
        question_id: QuestionId(1),
        text:        format!("choice {id}"),
      },
      votes,
    }
  }

  #[test]
  fn total_sums_every_choice() {
    let now = Utc::now();
    let results = QuestionResults {
      question: Question {
        id:       QuestionId(1),
        text:     "?".into(),
        pub_date: now,
        end_date: now,
      },
      tallies:  vec![tally(1, 3), tally(2, 0), tally(3, 4)],
    };
    assert_eq!(results.total_votes(), 7);
    assert_eq!(results.tally(ChoiceId(3)).map(|t| t.votes), Some(4));
    assert!(results.tally(ChoiceId(9)).is_none());
  }

  #[test]
  fn choice_text_bounds() {
    assert!(validate_choice_text("Yes").is_ok());
    assert!(validate_choice_text("").is_err());
    assert!(validate_choice_text(&"y".repeat(MAX_CHOICE_TEXT + 1)).is_err());
  }
}
