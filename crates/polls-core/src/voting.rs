//! The voting operation.
//!
//! [`cast_vote`] validates a submission against a question and records the
//! voter's single vote for it. The caller (the web layer) turns each
//! [`VoteError`] into a user-facing page.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
  account::UserId,
  choice::ChoiceId,
  question::QuestionId,
  store::PollStore,
  vote::Vote,
};

#[derive(Debug, Error)]
pub enum VoteError {
  /// The question does not exist or is not published yet.
  #[error("question {0} not found")]
  QuestionNotFound(QuestionId),

  /// The question is published but its end date has passed.
  #[error("question {0} is closed for voting")]
  Expired(QuestionId),

  /// Nothing was submitted in the `choice` field.
  #[error("no choice was selected")]
  NoChoice,

  /// The submitted value does not name a choice of this question.
  #[error("choice {0:?} does not belong to question {1}")]
  ChoiceNotFound(String, QuestionId),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl VoteError {
  fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// True for the errors that should re-render the ballot with a message.
  pub fn is_invalid_selection(&self) -> bool {
    matches!(self, Self::NoChoice | Self::ChoiceNotFound(..))
  }
}

/// Record `voter`'s vote on `question_id`.
///
/// `choice` is the raw form value. A previous vote by the same voter on the
/// same question is overwritten, so the last vote wins.
pub async fn cast_vote<S>(
  store: &S,
  voter: UserId,
  question_id: QuestionId,
  choice: Option<&str>,
  now: DateTime<Utc>,
) -> Result<Vote, VoteError>
where
  S: PollStore,
{
  let question = store
    .get_question(question_id)
    .await
    .map_err(VoteError::store)?
    .filter(|q| q.is_published(now))
    .ok_or(VoteError::QuestionNotFound(question_id))?;

  if !question.can_vote(now) {
    tracing::debug!(%question_id, end_date = %question.end_date, "vote after end date");
    return Err(VoteError::Expired(question_id));
  }

  let raw = choice
    .map(str::trim)
    .filter(|c| !c.is_empty())
    .ok_or(VoteError::NoChoice)?;

  let choice_id = raw
    .parse::<i64>()
    .map(ChoiceId)
    .map_err(|_| VoteError::ChoiceNotFound(raw.to_owned(), question_id))?;

  let vote = store
    .record_vote(voter, question_id, choice_id, now)
    .await
    .map_err(VoteError::store)?
    .ok_or_else(|| VoteError::ChoiceNotFound(raw.to_owned(), question_id))?;

  tracing::info!(%question_id, %choice_id, user_id = %voter, "vote recorded");
  Ok(vote)
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use chrono::TimeDelta;

  use super::*;
  use crate::{
    Error,
    choice::{Choice, ChoiceTally, QuestionResults},
    question::{NewQuestion, Question},
  };

  /// In-memory `PollStore` for exercising the operation without a database.
  #[derive(Default)]
  struct MemStore {
    questions: Mutex<Vec<Question>>,
    choices:   Mutex<Vec<Choice>>,
    votes:     Mutex<Vec<Vote>>,
  }

  impl PollStore for MemStore {
    type Error = Error;

    async fn add_question(&self, input: NewQuestion) -> Result<Question, Error> {
      input.validate()?;
      let mut questions = self.questions.lock().unwrap();
      let q = Question {
        id:       QuestionId(questions.len() as i64 + 1),
        text:     input.text,
        pub_date: input.pub_date,
        end_date: input.end_date,
      };
      questions.push(q.clone());
      Ok(q)
    }

    async fn add_choice(&self, question_id: QuestionId, text: String) -> Result<Choice, Error> {
      let mut choices = self.choices.lock().unwrap();
      let c = Choice { id: ChoiceId(choices.len() as i64 + 1), question_id, text };
      choices.push(c.clone());
      Ok(c)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, Error> {
      Ok(self.questions.lock().unwrap().iter().find(|q| q.id == id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, Error> {
      Ok(self.questions.lock().unwrap().clone())
    }

    async fn list_published(&self, now: DateTime<Utc>) -> Result<Vec<Question>, Error> {
      Ok(
        self
          .questions
          .lock()
          .unwrap()
          .iter()
          .filter(|q| q.is_published(now))
          .cloned()
          .collect(),
      )
    }

    async fn get_choices(&self, question_id: QuestionId) -> Result<Vec<Choice>, Error> {
      Ok(
        self
          .choices
          .lock()
          .unwrap()
          .iter()
          .filter(|c| c.question_id == question_id)
          .cloned()
          .collect(),
      )
    }

    async fn results(&self, question_id: QuestionId) -> Result<Option<QuestionResults>, Error> {
      let Some(question) = self.get_question(question_id).await? else {
        return Ok(None);
      };
      let choices = self.get_choices(question_id).await?;
      let votes = self.votes.lock().unwrap();
      let tallies = choices
        .into_iter()
        .map(|choice| {
          let n = votes.iter().filter(|v| v.choice_id == choice.id).count();
          ChoiceTally { choice, votes: n as u64 }
        })
        .collect();
      Ok(Some(QuestionResults { question, tallies }))
    }

    async fn record_vote(
      &self,
      user_id: UserId,
      question_id: QuestionId,
      choice_id: ChoiceId,
      voted_at: DateTime<Utc>,
    ) -> Result<Option<Vote>, Error> {
      let belongs = self
        .choices
        .lock()
        .unwrap()
        .iter()
        .any(|c| c.id == choice_id && c.question_id == question_id);
      if !belongs {
        return Ok(None);
      }
      let vote = Vote { user_id, question_id, choice_id, voted_at };
      let mut votes = self.votes.lock().unwrap();
      votes.retain(|v| !(v.user_id == user_id && v.question_id == question_id));
      votes.push(vote.clone());
      Ok(Some(vote))
    }

    async fn get_vote(&self, user_id: UserId, question_id: QuestionId) -> Result<Option<Vote>, Error> {
      Ok(
        self
          .votes
          .lock()
          .unwrap()
          .iter()
          .find(|v| v.user_id == user_id && v.question_id == question_id)
          .cloned(),
      )
    }
  }

  /// A store holding one question offset from `now` by whole days, with two
  /// choices.
  async fn fixture(
    pub_days: i64,
    end_days: i64,
  ) -> (MemStore, Question, Vec<Choice>, DateTime<Utc>) {
    let now = Utc::now();
    let store = MemStore::default();
    let q = store
      .add_question(NewQuestion::new(
        "1 or 2?",
        now + TimeDelta::days(pub_days),
        now + TimeDelta::days(end_days),
      ))
      .await
      .unwrap();
    let one = store.add_choice(q.id, "1".into()).await.unwrap();
    let two = store.add_choice(q.id, "2".into()).await.unwrap();
    (store, q, vec![one, two], now)
  }

  #[tokio::test]
  async fn records_a_vote() {
    let (store, q, choices, now) = fixture(-4, 5).await;
    let voter = UserId::new();
    let id = choices[0].id.to_string();

    let vote = cast_vote(&store, voter, q.id, Some(id.as_str()), now).await.unwrap();
    assert_eq!(vote.choice_id, choices[0].id);
    assert_eq!(store.get_vote(voter, q.id).await.unwrap(), Some(vote));
  }

  #[tokio::test]
  async fn second_vote_replaces_the_first() {
    let (store, q, choices, now) = fixture(-4, 5).await;
    let voter = UserId::new();

    for c in &choices {
      cast_vote(&store, voter, q.id, Some(c.id.to_string().as_str()), now)
        .await
        .unwrap();
    }

    let results = store.results(q.id).await.unwrap().unwrap();
    assert_eq!(results.total_votes(), 1);
    assert_eq!(results.tally(choices[0].id).unwrap().votes, 0);
    assert_eq!(results.tally(choices[1].id).unwrap().votes, 1);
  }

  #[tokio::test]
  async fn missing_question_is_not_found() {
    let (store, _, _, now) = fixture(-4, 5).await;
    let err = cast_vote(&store, UserId::new(), QuestionId(99), Some("1"), now)
      .await
      .unwrap_err();
    assert!(matches!(err, VoteError::QuestionNotFound(QuestionId(99))));
  }

  #[tokio::test]
  async fn unpublished_question_is_not_found() {
    let (store, q, choices, now) = fixture(30, 45).await;
    let id = choices[0].id.to_string();
    let err = cast_vote(&store, UserId::new(), q.id, Some(id.as_str()), now)
      .await
      .unwrap_err();
    assert!(matches!(err, VoteError::QuestionNotFound(_)));
  }

  #[tokio::test]
  async fn expired_question_rejects_votes() {
    let (store, q, choices, now) = fixture(-30, -15).await;
    let voter = UserId::new();
    let id = choices[0].id.to_string();
    let err = cast_vote(&store, voter, q.id, Some(id.as_str()), now)
      .await
      .unwrap_err();
    assert!(matches!(err, VoteError::Expired(_)));
    assert!(store.get_vote(voter, q.id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn blank_choice_is_a_validation_error() {
    let (store, q, _, now) = fixture(-1, 1).await;
    for raw in [None, Some(""), Some("  ")] {
      let err = cast_vote(&store, UserId::new(), q.id, raw, now)
        .await
        .unwrap_err();
      assert!(matches!(err, VoteError::NoChoice), "{raw:?}");
      assert!(err.is_invalid_selection());
    }
  }

  #[tokio::test]
  async fn foreign_or_garbage_choice_is_rejected() {
    let (store, q, _, now) = fixture(-1, 1).await;
    let other = store
      .add_question(NewQuestion::new("Other?", now - TimeDelta::days(1), now + TimeDelta::days(1)))
      .await
      .unwrap();
    let foreign = store.add_choice(other.id, "elsewhere".into()).await.unwrap();

    for raw in [foreign.id.to_string(), "abc".to_string(), "999".to_string()] {
      let err = cast_vote(&store, UserId::new(), q.id, Some(raw.as_str()), now)
        .await
        .unwrap_err();
      assert!(matches!(err, VoteError::ChoiceNotFound(..)), "{raw}");
    }
  }
}
