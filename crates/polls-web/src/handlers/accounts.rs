//! Signup, login and logout.

use axum::{
  Form,
  extract::{Query, State},
  http::{HeaderMap, header},
  response::{Html, IntoResponse, Response},
};
use polls_core::account::{NewUser, validate_password, validate_username};
use serde::Deserialize;

use crate::{
  AppState, Backend,
  auth::{self, safe_next},
  error::{Error, found},
  render,
};

#[derive(Debug, Deserialize)]
pub struct SignupForm {
  #[serde(default)]
  username:  String,
  #[serde(default)]
  password1: String,
  #[serde(default)]
  password2: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
  next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
  next:     Option<String>,
}

// ─── Signup ──────────────────────────────────────────────────────────────────

/// `GET /signup/`
pub async fn signup_form() -> Html<String> { Html(render::signup("", &[])) }

/// `POST /signup/`
///
/// On success the new user is signed in straight away.
pub async fn signup<S: Backend>(
  State(state): State<AppState<S>>,
  Form(form): Form<SignupForm>,
) -> Result<Response, Error> {
  let username = form.username.trim().to_owned();

  let mut errors = Vec::new();
  if let Err(e) = validate_username(&username) {
    errors.push(e.to_string());
  }
  if form.password1 != form.password2 {
    errors.push("The two password fields didn't match.".to_owned());
  } else if let Err(e) = validate_password(&form.password1) {
    errors.push(e.to_string());
  }
  if !errors.is_empty() {
    return Ok(Html(render::signup(&username, &errors)).into_response());
  }

  let password_hash = auth::hash_password_blocking(form.password1).await?;
  let created = state
    .store
    .create_user(NewUser { username: username.clone(), password_hash })
    .await
    .map_err(Error::store)?;

  let Some(user) = created else {
    let errors = ["A user with that username already exists.".to_owned()];
    return Ok(Html(render::signup(&username, &errors)).into_response());
  };

  tracing::info!(user_id = %user.id, username = %user.username, "user signed up");
  let cookie = auth::start_session(&state, user.id).await?;
  Ok(([(header::SET_COOKIE, cookie)], found("/")).into_response())
}

// ─── Login / logout ──────────────────────────────────────────────────────────

/// `GET /accounts/login/`
pub async fn login_form(Query(query): Query<LoginQuery>) -> Html<String> {
  Html(render::login("", safe_next(query.next.as_deref()), &[]))
}

/// `POST /accounts/login/`
pub async fn login<S: Backend>(
  State(state): State<AppState<S>>,
  Form(form): Form<LoginForm>,
) -> Result<Response, Error> {
  let next = safe_next(form.next.as_deref()).to_owned();
  let username = form.username.trim().to_owned();

  let creds = state
    .store
    .find_credentials(username.clone())
    .await
    .map_err(Error::store)?;

  let verified = match creds {
    Some(c) => auth::verify_password_blocking(form.password, c.password_hash)
      .await?
      .then_some(c.user),
    None => None,
  };

  let Some(user) = verified else {
    tracing::info!(%username, "failed login");
    let errors = ["Please enter a correct username and password.".to_owned()];
    return Ok(Html(render::login(&username, &next, &errors)).into_response());
  };

  tracing::info!(user_id = %user.id, "user logged in");
  let cookie = auth::start_session(&state, user.id).await?;
  Ok(([(header::SET_COOKIE, cookie)], found(&next)).into_response())
}

/// `POST /accounts/logout/`
pub async fn logout<S: Backend>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error> {
  if let Some(token) = auth::session_token(&headers) {
    state
      .store
      .delete_session(auth::token_digest(&token))
      .await
      .map_err(Error::store)?;
  }
  let cookie = auth::clear_cookie(state.config.secure_cookies)?;
  Ok(([(header::SET_COOKIE, cookie)], found("/")).into_response())
}
