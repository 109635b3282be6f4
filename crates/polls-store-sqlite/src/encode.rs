//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (nanosecond
//! precision, `Z` suffix) so that lexical order in SQL equals chronological
//! order. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use polls_core::{
  account::{User, UserCredentials, UserId},
  choice::{Choice, ChoiceId},
  question::{Question, QuestionId},
  vote::Vote,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_user_id(id: UserId) -> String { id.0.hyphenated().to_string() }

pub fn decode_user_id(s: &str) -> Result<UserId> { Ok(UserId(Uuid::parse_str(s)?)) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `questions` row.
pub struct RawQuestion {
  pub question_id: i64,
  pub text:        String,
  pub pub_date:    String,
  pub end_date:    String,
}

impl RawQuestion {
  pub const COLUMNS: &'static str = "question_id, text, pub_date, end_date";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      question_id: row.get(0)?,
      text:        row.get(1)?,
      pub_date:    row.get(2)?,
      end_date:    row.get(3)?,
    })
  }

  pub fn into_question(self) -> Result<Question> {
    Ok(Question {
      id:       QuestionId(self.question_id),
      text:     self.text,
      pub_date: decode_dt(&self.pub_date)?,
      end_date: decode_dt(&self.end_date)?,
    })
  }
}

/// Raw values from a `choices` row.
pub struct RawChoice {
  pub choice_id:   i64,
  pub question_id: i64,
  pub text:        String,
}

impl RawChoice {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      choice_id:   row.get(0)?,
      question_id: row.get(1)?,
      text:        row.get(2)?,
    })
  }

  pub fn into_choice(self) -> Choice {
    Choice {
      id:          ChoiceId(self.choice_id),
      question_id: QuestionId(self.question_id),
      text:        self.text,
    }
  }
}

/// Raw values from a `votes` row.
pub struct RawVote {
  pub user_id:     String,
  pub question_id: i64,
  pub choice_id:   i64,
  pub voted_at:    String,
}

impl RawVote {
  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      user_id:     decode_user_id(&self.user_id)?,
      question_id: QuestionId(self.question_id),
      choice_id:   ChoiceId(self.choice_id),
      voted_at:    decode_dt(&self.voted_at)?,
    })
  }
}

/// Raw values from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         decode_user_id(&self.user_id)?,
      username:   self.username,
      created_at: decode_dt(&self.created_at)?,
    })
  }

  pub fn into_credentials(self, password_hash: String) -> Result<UserCredentials> {
    Ok(UserCredentials { user: self.into_user()?, password_hash })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let whole = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let fractional = whole + TimeDelta::microseconds(1);
    let (a, b) = (encode_dt(whole), encode_dt(fractional));
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(a, "2024-01-01T00:00:00.000000000Z");
  }

  #[test]
  fn timestamp_round_trip_keeps_nanoseconds() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn bad_timestamp_is_a_date_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
