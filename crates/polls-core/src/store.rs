//! The repository traits.
//!
//! Implemented by storage backends (e.g. `polls-store-sqlite`). The web layer
//! and the voting operation depend on these abstractions, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  account::{NewUser, Session, User, UserCredentials, UserId},
  choice::{Choice, ChoiceId, QuestionResults},
  question::{NewQuestion, Question, QuestionId},
  vote::Vote,
};

// ─── Polls ───────────────────────────────────────────────────────────────────

/// Questions, choices and votes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PollStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Authoring ─────────────────────────────────────────────────────────

  /// Validate and persist a new question.
  fn add_question(
    &self,
    input: NewQuestion,
  ) -> impl Future<Output = Result<Question, Self::Error>> + Send + '_;

  /// Add a choice to an existing question. Errors if the question does not
  /// exist or the text is invalid.
  fn add_choice(
    &self,
    question_id: QuestionId,
    text: String,
  ) -> impl Future<Output = Result<Choice, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a question by id regardless of its publish state.
  fn get_question(
    &self,
    id: QuestionId,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  /// Every question, most recently published first.
  fn list_questions(
    &self,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + '_;

  /// Questions with `pub_date <= now`, most recently published first.
  fn list_published(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + '_;

  /// The choices of a question in creation order. Empty if the question
  /// does not exist.
  fn get_choices(
    &self,
    question_id: QuestionId,
  ) -> impl Future<Output = Result<Vec<Choice>, Self::Error>> + Send + '_;

  /// Aggregate vote counts per choice. Returns `None` if the question does
  /// not exist.
  fn results(
    &self,
    question_id: QuestionId,
  ) -> impl Future<Output = Result<Option<QuestionResults>, Self::Error>> + Send + '_;

  // ── Votes ─────────────────────────────────────────────────────────────

  /// Create or overwrite the single vote of `user_id` on `question_id`.
  ///
  /// Returns `None`, writing nothing, if `choice_id` does not belong to
  /// `question_id`. Implementations must make this atomic per
  /// `(user_id, question_id)`.
  fn record_vote(
    &self,
    user_id: UserId,
    question_id: QuestionId,
    choice_id: ChoiceId,
    voted_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Vote>, Self::Error>> + Send + '_;

  /// The current vote of `user_id` on `question_id`, if any.
  fn get_vote(
    &self,
    user_id: UserId,
    question_id: QuestionId,
  ) -> impl Future<Output = Result<Option<Vote>, Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Users and their sessions.
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new user. Returns `None` if the username is already taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user and their password hash by exact username.
  fn find_credentials(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<UserCredentials>, Self::Error>> + Send + '_;

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a session digest to its user. Sessions with
  /// `expires_at <= now` resolve to `None`.
  fn session_user(
    &self,
    token_digest: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Remove a session. Removing an unknown session is not an error.
  fn delete_session(
    &self,
    token_digest: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
