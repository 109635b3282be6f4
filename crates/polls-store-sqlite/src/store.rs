//! [`SqliteStore`], the SQLite implementation of [`PollStore`] and
//! [`AccountStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use polls_core::{
  account::{NewUser, Session, User, UserCredentials, UserId},
  choice::{Choice, ChoiceId, ChoiceTally, QuestionResults, validate_choice_text},
  question::{NewQuestion, Question, QuestionId},
  store::{AccountStore, PollStore},
  vote::Vote,
};

use crate::{
  encode::{
    RawChoice, RawQuestion, RawUser, RawVote, encode_dt, encode_user_id,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A polls store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of vote rows for a question, across all users and choices.
  pub async fn count_votes(&self, question_id: QuestionId) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM votes WHERE question_id = ?1",
          rusqlite::params![question_id.0],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(n as u64)
  }

  /// Insert a question and its choices in one transaction. Any invalid
  /// input leaves the database untouched.
  pub async fn add_poll(
    &self,
    input: NewQuestion,
    choices: Vec<String>,
  ) -> Result<(Question, Vec<Choice>)> {
    input.validate()?;
    for text in &choices {
      validate_choice_text(text)?;
    }

    let text         = input.text.clone();
    let pub_date_str = encode_dt(input.pub_date);
    let end_date_str = encode_dt(input.end_date);

    let (question_id, choices) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO questions (text, pub_date, end_date) VALUES (?1, ?2, ?3)",
          rusqlite::params![text, pub_date_str, end_date_str],
        )?;
        let question_id = QuestionId(tx.last_insert_rowid());

        let mut added = Vec::with_capacity(choices.len());
        for text in choices {
          tx.execute(
            "INSERT INTO choices (question_id, text) VALUES (?1, ?2)",
            rusqlite::params![question_id.0, text],
          )?;
          added.push(Choice { id: ChoiceId(tx.last_insert_rowid()), question_id, text });
        }
        tx.commit()?;
        Ok((question_id, added))
      })
      .await?;

    tracing::debug!(%question_id, choices = choices.len(), "poll added");
    let question = Question {
      id:       question_id,
      text:     input.text,
      pub_date: input.pub_date,
      end_date: input.end_date,
    };
    Ok((question, choices))
  }

  /// Delete a question; its choices and votes go with it.
  pub async fn delete_question(&self, question_id: QuestionId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM questions WHERE question_id = ?1",
          rusqlite::params![question_id.0],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }
}

// ─── PollStore impl ──────────────────────────────────────────────────────────

impl PollStore for SqliteStore {
  type Error = Error;

  // ── Authoring ─────────────────────────────────────────────────────────────

  async fn add_question(&self, input: NewQuestion) -> Result<Question> {
    input.validate()?;

    let text         = input.text.clone();
    let pub_date_str = encode_dt(input.pub_date);
    let end_date_str = encode_dt(input.end_date);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO questions (text, pub_date, end_date) VALUES (?1, ?2, ?3)",
          rusqlite::params![text, pub_date_str, end_date_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(question_id = id, "question added");
    Ok(Question {
      id:       QuestionId(id),
      text:     input.text,
      pub_date: input.pub_date,
      end_date: input.end_date,
    })
  }

  async fn add_choice(&self, question_id: QuestionId, text: String) -> Result<Choice> {
    validate_choice_text(&text)?;

    let text_col = text.clone();
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM questions WHERE question_id = ?1",
            rusqlite::params![question_id.0],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO choices (question_id, text) VALUES (?1, ?2)",
          rusqlite::params![question_id.0, text_col],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or(Error::QuestionNotFound(question_id))?;
    Ok(Choice { id: ChoiceId(id), question_id, text })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_question(&self, id: QuestionId) -> Result<Option<Question>> {
    let raw: Option<RawQuestion> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM questions WHERE question_id = ?1", RawQuestion::COLUMNS),
            rusqlite::params![id.0],
            RawQuestion::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawQuestion::into_question).transpose()
  }

  async fn list_questions(&self) -> Result<Vec<Question>> {
    let raws: Vec<RawQuestion> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM questions ORDER BY pub_date DESC, question_id DESC",
          RawQuestion::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawQuestion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn list_published(&self, now: DateTime<Utc>) -> Result<Vec<Question>> {
    let now_str = encode_dt(now);

    let raws: Vec<RawQuestion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}
           FROM questions
           WHERE pub_date <= ?1
           ORDER BY pub_date DESC, question_id DESC",
          RawQuestion::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![now_str], RawQuestion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn get_choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
    let raws: Vec<RawChoice> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT choice_id, question_id, text
           FROM choices
           WHERE question_id = ?1
           ORDER BY choice_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![question_id.0], RawChoice::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawChoice::into_choice).collect())
  }

  async fn results(&self, question_id: QuestionId) -> Result<Option<QuestionResults>> {
    let question = match self.get_question(question_id).await? {
      Some(q) => q,
      None    => return Ok(None),
    };

    let rows: Vec<(RawChoice, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.choice_id, c.question_id, c.text, COUNT(v.user_id) AS votes
           FROM choices c
           LEFT JOIN votes v ON v.choice_id = c.choice_id
           WHERE c.question_id = ?1
           GROUP BY c.choice_id
           ORDER BY c.choice_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![question_id.0], |row| {
            Ok((RawChoice::from_row(row)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let tallies = rows
      .into_iter()
      .map(|(raw, votes)| ChoiceTally { choice: raw.into_choice(), votes: votes as u64 })
      .collect();

    Ok(Some(QuestionResults { question, tallies }))
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  async fn record_vote(
    &self,
    user_id:     UserId,
    question_id: QuestionId,
    choice_id:   ChoiceId,
    voted_at:    DateTime<Utc>,
  ) -> Result<Option<Vote>> {
    let user_id_str  = encode_user_id(user_id);
    let voted_at_str = encode_dt(voted_at);

    // The SELECT yields no row unless the choice belongs to the question, so
    // a mismatched pair writes nothing. The primary key on
    // (user_id, question_id) turns a second vote into an update.
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let n = tx.execute(
          "INSERT INTO votes (user_id, question_id, choice_id, voted_at)
           SELECT ?1, question_id, choice_id, ?4
           FROM choices
           WHERE choice_id = ?3 AND question_id = ?2
           ON CONFLICT (user_id, question_id) DO UPDATE
             SET choice_id = excluded.choice_id,
                 voted_at  = excluded.voted_at",
          rusqlite::params![user_id_str, question_id.0, choice_id.0, voted_at_str],
        )?;
        tx.commit()?;
        Ok(n)
      })
      .await?;

    if written == 0 {
      return Ok(None);
    }
    Ok(Some(Vote { user_id, question_id, choice_id, voted_at }))
  }

  async fn get_vote(&self, user_id: UserId, question_id: QuestionId) -> Result<Option<Vote>> {
    let user_id_str = encode_user_id(user_id);

    let raw: Option<RawVote> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, question_id, choice_id, voted_at
             FROM votes
             WHERE user_id = ?1 AND question_id = ?2",
            rusqlite::params![user_id_str, question_id.0],
            |row| {
              Ok(RawVote {
                user_id:     row.get(0)?,
                question_id: row.get(1)?,
                choice_id:   row.get(2)?,
                voted_at:    row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawVote::into_vote).transpose()
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let user = User {
      id:         UserId::new(),
      username:   input.username,
      created_at: Utc::now(),
    };

    let id_str   = encode_user_id(user.id);
    let username = user.username.clone();
    let at_str   = encode_dt(user.created_at);
    let hash     = input.password_hash;

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO users (user_id, username, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (username) DO NOTHING",
          rusqlite::params![id_str, username, hash, at_str],
        )?)
      })
      .await?;

    Ok((inserted > 0).then_some(user))
  }

  async fn find_credentials(&self, username: String) -> Result<Option<UserCredentials>> {
    let raw: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, username, created_at, password_hash
             FROM users
             WHERE username = ?1",
            rusqlite::params![username],
            |row| Ok((RawUser::from_row(row)?, row.get(3)?)),
          )
          .optional()?)
      })
      .await?;

    raw.map(|(user, hash)| user.into_credentials(hash)).transpose()
  }

  async fn create_session(&self, session: Session) -> Result<()> {
    let digest      = session.token_digest;
    let user_id_str = encode_user_id(session.user_id);
    let expires_str = encode_dt(session.expires_at);
    let now_str     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?;
        tx.execute(
          "INSERT INTO sessions (token_digest, user_id, expires_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![digest, user_id_str, expires_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_user(
    &self,
    token_digest: String,
    now:          DateTime<Utc>,
  ) -> Result<Option<User>> {
    let now_str = encode_dt(now);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT u.user_id, u.username, u.created_at
             FROM sessions s
             JOIN users u ON u.user_id = s.user_id
             WHERE s.token_digest = ?1 AND s.expires_at > ?2",
            rusqlite::params![token_digest, now_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_session(&self, token_digest: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_digest = ?1",
          rusqlite::params![token_digest],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
