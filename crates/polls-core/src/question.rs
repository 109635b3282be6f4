//! Questions and their publish window.
//!
//! A question becomes visible at `pub_date` and accepts votes until
//! `end_date`. Every predicate here takes `now` from the caller so the same
//! instant is used for a whole request.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum length of a question's text, in characters.
pub const MAX_QUESTION_TEXT: usize = 200;

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Database-assigned question identifier; appears in URLs (`/{id}/`).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct QuestionId(pub i64);

impl fmt::Display for QuestionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Window ──────────────────────────────────────────────────────────────────

/// Where `now` falls relative to a question's publish window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
  /// Not yet published.
  Upcoming,
  /// Published and accepting votes.
  Open,
  /// Published, but past its end date.
  Closed,
}

// ─── Question ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub id:       QuestionId,
  pub text:     String,
  pub pub_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
}

impl Question {
  pub fn is_published(&self, now: DateTime<Utc>) -> bool { now >= self.pub_date }

  /// True while `pub_date <= now <= end_date`, both ends inclusive.
  pub fn can_vote(&self, now: DateTime<Utc>) -> bool {
    self.pub_date <= now && now <= self.end_date
  }

  /// True if the question went live within the 24 hours before `now`.
  pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
    now - TimeDelta::days(1) <= self.pub_date && self.pub_date <= now
  }

  pub fn window(&self, now: DateTime<Utc>) -> Window {
    if !self.is_published(now) {
      Window::Upcoming
    } else if self.can_vote(now) {
      Window::Open
    } else {
      Window::Closed
    }
  }
}

impl fmt::Display for Question {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text)
  }
}

// ─── NewQuestion ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::PollStore::add_question`].
#[derive(Debug, Clone)]
pub struct NewQuestion {
  pub text:     String,
  pub pub_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
}

impl NewQuestion {
  pub fn new(
    text: impl Into<String>,
    pub_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
  ) -> Self {
    Self { text: text.into(), pub_date, end_date }
  }

  /// Reject empty or over-long text and windows that close before they open.
  pub fn validate(&self) -> Result<()> {
    let len = self.text.trim().chars().count();
    if len == 0 || self.text.chars().count() > MAX_QUESTION_TEXT {
      return Err(Error::QuestionText { max: MAX_QUESTION_TEXT });
    }
    if self.end_date < self.pub_date {
      return Err(Error::InvalidWindow {
        publish: self.pub_date,
        end:     self.end_date,
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone, Utc};

  use super::*;

  fn at(pub_offset: TimeDelta, end_offset: TimeDelta) -> (Question, DateTime<Utc>) {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let q = Question {
      id:       QuestionId(1),
      text:     "Tea or coffee?".into(),
      pub_date: now + pub_offset,
      end_date: now + end_offset,
    };
    (q, now)
  }

  #[test]
  fn old_question_is_published() {
    let (q, now) = at(-TimeDelta::days(1) - TimeDelta::seconds(1), TimeDelta::days(5));
    assert!(q.is_published(now));
  }

  #[test]
  fn question_published_exactly_now_is_published() {
    let (q, now) = at(TimeDelta::zero(), TimeDelta::days(1));
    assert!(q.is_published(now));
  }

  #[test]
  fn future_question_is_not_published() {
    let (q, now) = at(TimeDelta::days(30), TimeDelta::days(45));
    assert!(!q.is_published(now));
  }

  #[test]
  fn can_vote_inside_window() {
    let (q, now) = at(-TimeDelta::days(4), TimeDelta::days(5));
    assert!(q.can_vote(now));
  }

  #[test]
  fn can_vote_is_inclusive_at_both_ends() {
    let (q, now) = at(TimeDelta::zero(), TimeDelta::days(1));
    assert!(q.can_vote(now));
    let (q, now) = at(-TimeDelta::days(1), TimeDelta::zero());
    assert!(q.can_vote(now));
  }

  #[test]
  fn cannot_vote_after_end_date() {
    let (q, now) = at(-TimeDelta::days(30), -TimeDelta::days(15));
    assert!(!q.can_vote(now));
  }

  #[test]
  fn cannot_vote_before_publish() {
    let (q, now) = at(TimeDelta::days(30), TimeDelta::days(45));
    assert!(!q.can_vote(now));
  }

  #[test]
  fn recently_published_within_a_day() {
    let delta = TimeDelta::hours(23) + TimeDelta::minutes(59) + TimeDelta::seconds(59);
    let (q, now) = at(-delta, TimeDelta::days(1));
    assert!(q.was_published_recently(now));
  }

  #[test]
  fn recently_published_exactly_one_day_ago() {
    let (q, now) = at(-TimeDelta::days(1), TimeDelta::days(1));
    assert!(q.was_published_recently(now));
  }

  #[test]
  fn not_recent_when_older_than_a_day() {
    let (q, now) = at(-TimeDelta::days(1) - TimeDelta::seconds(1), TimeDelta::days(1));
    assert!(!q.was_published_recently(now));
  }

  #[test]
  fn not_recent_when_in_the_future() {
    let (q, now) = at(TimeDelta::days(30), TimeDelta::days(31));
    assert!(!q.was_published_recently(now));
  }

  #[test]
  fn window_tracks_predicates() {
    let (q, now) = at(TimeDelta::days(1), TimeDelta::days(2));
    assert_eq!(q.window(now), Window::Upcoming);
    let (q, now) = at(-TimeDelta::days(1), TimeDelta::days(2));
    assert_eq!(q.window(now), Window::Open);
    let (q, now) = at(-TimeDelta::days(2), -TimeDelta::days(1));
    assert_eq!(q.window(now), Window::Closed);
  }

  #[test]
  fn validate_rejects_inverted_window() {
    let now = Utc::now();
    let input = NewQuestion::new("Backwards?", now, now - TimeDelta::seconds(1));
    assert!(matches!(input.validate(), Err(Error::InvalidWindow { .. })));
  }

  #[test]
  fn validate_accepts_zero_length_window() {
    let now = Utc::now();
    assert!(NewQuestion::new("Instant?", now, now).validate().is_ok());
  }

  #[test]
  fn validate_rejects_blank_and_long_text() {
    let now = Utc::now();
    let later = now + TimeDelta::days(1);
    assert!(matches!(
      NewQuestion::new("   ", now, later).validate(),
      Err(Error::QuestionText { .. })
    ));
    let long = "x".repeat(MAX_QUESTION_TEXT + 1);
    assert!(matches!(
      NewQuestion::new(long, now, later).validate(),
      Err(Error::QuestionText { .. })
    ));
  }
}
