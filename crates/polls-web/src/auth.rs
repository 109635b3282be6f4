//! Password hashing, session cookies, and the identity extractors.
//!
//! A session is an opaque random token held in the `polls_session` cookie.
//! The store only ever sees its SHA-256 digest.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, HeaderValue, header, request::Parts},
};
use chrono::Utc;
use polls_core::account::{Session, User, UserId};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{AppState, Backend, error::Error};

pub const SESSION_COOKIE: &str = "polls_session";

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

/// Run [`hash_password`] off the async runtime; argon2 is deliberately slow.
pub async fn hash_password_blocking(password: String) -> Result<String, Error> {
  tokio::task::spawn_blocking(move || hash_password(&password))
    .await
    .map_err(|e| Error::Internal(e.to_string()))?
}

pub async fn verify_password_blocking(password: String, phc: String) -> Result<bool, Error> {
  tokio::task::spawn_blocking(move || verify_password(&password, &phc))
    .await
    .map_err(|e| Error::Internal(e.to_string()))
}

// ─── Tokens and cookies ──────────────────────────────────────────────────────

/// 32 random bytes, hex-encoded.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The session token from the request's `Cookie` headers, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value.to_owned())
    .filter(|value| !value.is_empty())
}

fn cookie(value: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, Error> {
  let secure = if secure { "; Secure" } else { "" };
  HeaderValue::from_str(&format!(
    "{SESSION_COOKIE}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax{secure}"
  ))
  .map_err(|e| Error::Internal(e.to_string()))
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(secure: bool) -> Result<HeaderValue, Error> { cookie("", 0, secure) }

/// Create a session for `user_id` and return the `Set-Cookie` value that
/// hands it to the browser.
pub async fn start_session<S: Backend>(
  state: &AppState<S>,
  user_id: UserId,
) -> Result<HeaderValue, Error> {
  let ttl = state.config.session_ttl().ok_or_else(|| {
    Error::Internal(format!("invalid session_ttl_hours {}", state.config.session_ttl_hours))
  })?;
  let token = new_token();

  state
    .store
    .create_session(Session {
      token_digest: token_digest(&token),
      user_id,
      expires_at: Utc::now() + ttl,
    })
    .await
    .map_err(Error::store)?;

  cookie(&token, ttl.num_seconds(), state.config.secure_cookies)
}

async fn resolve_user<S: Backend>(
  headers: &HeaderMap,
  state: &AppState<S>,
) -> Result<Option<User>, Error> {
  let Some(token) = session_token(headers) else {
    return Ok(None);
  };
  state
    .store
    .session_user(token_digest(&token), Utc::now())
    .await
    .map_err(Error::store)
}

/// Only local absolute paths are accepted as a post-login destination.
pub fn safe_next(next: Option<&str>) -> &str {
  match next {
    Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
    _ => "/",
  }
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// A signed-in user. Anonymous requests are redirected to the login page.
pub struct CurrentUser(pub User);

/// The signed-in user, if any.
pub struct MaybeUser(pub Option<User>);

impl<S: Backend> FromRequestParts<AppState<S>> for CurrentUser {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve_user(&parts.headers, state)
      .await?
      .map(CurrentUser)
      .ok_or_else(|| Error::LoginRequired { next: parts.uri.path().to_owned() })
  }
}

impl<S: Backend> FromRequestParts<AppState<S>> for MaybeUser {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeUser(resolve_user(&parts.headers, state).await?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_round_trip() {
    let phc = hash_password("correct horse").unwrap();
    assert!(verify_password("correct horse", &phc));
    assert!(!verify_password("wrong horse", &phc));
    assert!(!verify_password("correct horse", "not-a-phc-string"));
  }

  #[test]
  fn tokens_are_unique_hex() {
    let (a, b) = (new_token(), new_token());
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
    assert_ne!(token_digest(&a), a);
    assert_eq!(token_digest(&a), token_digest(&a));
  }

  #[test]
  fn finds_session_among_other_cookies() {
    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; polls_session=abc123"));
    assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, HeaderValue::from_static("polls_session="));
    assert!(session_token(&headers).is_none());
    assert!(session_token(&HeaderMap::new()).is_none());
  }

  #[test]
  fn next_must_be_a_local_path() {
    assert_eq!(safe_next(Some("/3/vote/")), "/3/vote/");
    assert_eq!(safe_next(Some("//evil.example/")), "/");
    assert_eq!(safe_next(Some("https://evil.example/")), "/");
    assert_eq!(safe_next(None), "/");
  }
}
