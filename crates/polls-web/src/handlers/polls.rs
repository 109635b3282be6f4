//! List, detail, results and vote views.

use axum::{
  Form,
  extract::{Path, Query, State, rejection::FormRejection},
  response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use polls_core::{
  account::User,
  question::Question,
  voting::{VoteError, cast_vote},
};
use serde::Deserialize;

use super::question_id;
use crate::{
  AppState, Backend,
  auth::{CurrentUser, MaybeUser},
  error::{Error, found},
  render::{self, Notice},
};

const NO_CHOICE_MESSAGE: &str = "You didn't select a choice.";

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
  notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteForm {
  choice: Option<String>,
}

/// `GET /`
pub async fn index<S: Backend>(
  State(state): State<AppState<S>>,
  MaybeUser(user): MaybeUser,
  Query(query): Query<IndexQuery>,
) -> Result<Html<String>, Error> {
  let now = Utc::now();
  let questions = state.store.list_published(now).await.map_err(Error::store)?;
  let notice = query.notice.as_deref().and_then(Notice::parse);
  Ok(Html(render::index(&questions, now, notice, user.as_ref())))
}

/// `GET /{id}/`
pub async fn detail<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  MaybeUser(user): MaybeUser,
) -> Result<Html<String>, Error> {
  let now = Utc::now();
  let question = published_question(&state, &id, now).await?;
  detail_page(&state, &question, user.as_ref(), None, now).await.map(Html)
}

/// `GET /{id}/results/`
///
/// Results are shown for any existing question, published or not.
pub async fn results<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  MaybeUser(user): MaybeUser,
) -> Result<Html<String>, Error> {
  let results = state
    .store
    .results(question_id(&id)?)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound)?;
  Ok(Html(render::results(&results, user.as_ref())))
}

/// `GET /{id}/vote/`
///
/// Only reached by following a link, e.g. the redirect back from login. It
/// never records anything; the ballot is shown again with the prompt.
pub async fn vote_form<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  CurrentUser(user): CurrentUser,
) -> Result<Html<String>, Error> {
  let now = Utc::now();
  let question = published_question(&state, &id, now).await?;
  detail_page(&state, &question, Some(&user), Some(NO_CHOICE_MESSAGE), now).await.map(Html)
}

/// `POST /{id}/vote/`
///
/// A body that is not a urlencoded form counts as no selection.
pub async fn vote<S: Backend>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  CurrentUser(user): CurrentUser,
  form: Result<Form<VoteForm>, FormRejection>,
) -> Result<Response, Error> {
  let question_id = question_id(&id)?;
  let now = Utc::now();

  let choice = match form {
    Ok(Form(form)) => form.choice,
    Err(rejection) => {
      tracing::debug!(%question_id, %rejection, "unreadable vote form");
      None
    }
  };

  match cast_vote(state.store.as_ref(), user.id, question_id, choice.as_deref(), now).await {
    Ok(_) => Ok(found(&format!("/{question_id}/results/"))),
    Err(VoteError::QuestionNotFound(_)) => Err(Error::NotFound),
    Err(VoteError::Expired(_)) => Ok(found("/?notice=expired")),
    Err(e) if e.is_invalid_selection() => {
      tracing::debug!(%question_id, error = %e, "invalid vote submission");
      let question = published_question(&state, &id, now).await?;
      let page = detail_page(&state, &question, Some(&user), Some(NO_CHOICE_MESSAGE), now).await?;
      Ok(Html(page).into_response())
    }
    Err(e) => Err(Error::store(e)),
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The question named by `id`, provided it exists and is published.
async fn published_question<S: Backend>(
  state: &AppState<S>,
  id: &str,
  now: DateTime<Utc>,
) -> Result<Question, Error> {
  state
    .store
    .get_question(question_id(id)?)
    .await
    .map_err(Error::store)?
    .filter(|q| q.is_published(now))
    .ok_or(Error::NotFound)
}

async fn detail_page<S: Backend>(
  state: &AppState<S>,
  question: &Question,
  user: Option<&User>,
  error: Option<&str>,
  now: DateTime<Utc>,
) -> Result<String, Error> {
  let choices = state.store.get_choices(question.id).await.map_err(Error::store)?;

  let vote = match user {
    Some(u) => state.store.get_vote(u.id, question.id).await.map_err(Error::store)?,
    None => None,
  };
  let previous = vote.and_then(|v| choices.iter().find(|c| c.id == v.choice_id));

  Ok(render::detail(question, &choices, previous, error, user, now))
}
