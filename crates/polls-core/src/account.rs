//! User accounts and sessions.
//!
//! The voting core only needs an opaque [`UserId`]. Everything else here
//! supports the signup/login surface that produces one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const MAX_USERNAME: usize = 150;
pub const MIN_PASSWORD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for UserId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         UserId,
  pub username:   String,
  pub created_at: DateTime<Utc>,
}

/// A user together with their stored password hash. Never leaves the
/// login path.
#[derive(Debug, Clone)]
pub struct UserCredentials {
  pub user:          User,
  /// argon2 PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Input to [`crate::store::AccountStore::create_user`]. The password must
/// already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub password_hash: String,
}

/// A signed-in browser. Only the SHA-256 digest of the cookie token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub token_digest: String,
  pub user_id:      UserId,
  pub expires_at:   DateTime<Utc>,
}

/// Letters, digits and `@.+-_`, at most [`MAX_USERNAME`] characters.
pub fn validate_username(username: &str) -> Result<()> {
  if username.is_empty() {
    return Err(Error::InvalidUsername("Username is required.".into()));
  }
  if username.chars().count() > MAX_USERNAME {
    return Err(Error::InvalidUsername(format!(
      "Username must be at most {MAX_USERNAME} characters."
    )));
  }
  let allowed = |c: char| c.is_alphanumeric() || "@.+-_".contains(c);
  if !username.chars().all(allowed) {
    return Err(Error::InvalidUsername(
      "Username may contain only letters, numbers, and @/./+/-/_ characters."
        .into(),
    ));
  }
  Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
  if password.chars().count() < MIN_PASSWORD {
    return Err(Error::InvalidPassword(format!(
      "This password is too short. It must contain at least {MIN_PASSWORD} characters."
    )));
  }
  if password.chars().all(|c| c.is_ascii_digit()) {
    return Err(Error::InvalidPassword(
      "This password is entirely numeric.".into(),
    ));
  }
  Ok(())
}
