//! Error type for `polls-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] polls_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to add a choice to a question that does not exist.
  #[error("question not found: {0}")]
  QuestionNotFound(polls_core::question::QuestionId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
