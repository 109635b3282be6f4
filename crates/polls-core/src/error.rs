//! Error types for `polls-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("question text must be between 1 and {max} characters")]
  QuestionText { max: usize },

  #[error("choice text must be between 1 and {max} characters")]
  ChoiceText { max: usize },

  #[error("poll closes ({end}) before it opens ({publish})")]
  InvalidWindow {
    publish: DateTime<Utc>,
    end:     DateTime<Utc>,
  },

  #[error("{0}")]
  InvalidUsername(String),

  #[error("{0}")]
  InvalidPassword(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
