//! HTTP layer for the polls app.
//!
//! Exposes an axum [`Router`] serving the poll pages and account forms,
//! backed by any store implementing both [`PollStore`] and
//! [`AccountStore`].

pub mod auth;
pub mod error;
pub mod handlers;
pub mod render;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use chrono::TimeDelta;
use polls_core::store::{AccountStore, PollStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{accounts, polls};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `polls.toml` and
/// `POLLS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// Lifetime of a login session.
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
  /// Mark the session cookie `Secure`. Enable behind TLS.
  #[serde(default)]
  pub secure_cookies:    bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8000 }
fn default_store_path() -> PathBuf { PathBuf::from("polls.sqlite3") }
fn default_session_ttl_hours() -> i64 { 24 * 14 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              default_host(),
      port:              default_port(),
      store_path:        default_store_path(),
      session_ttl_hours: default_session_ttl_hours(),
      secure_cookies:    false,
    }
  }
}

/// Longest accepted `session_ttl_hours`: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

impl ServerConfig {
  /// The configured session lifetime, or `None` unless
  /// `0 < session_ttl_hours <= MAX_SESSION_TTL_HOURS`.
  pub fn session_ttl(&self) -> Option<TimeDelta> {
    if self.session_ttl_hours <= 0 || self.session_ttl_hours > MAX_SESSION_TTL_HOURS {
      return None;
    }
    TimeDelta::try_hours(self.session_ttl_hours)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the handlers need from a storage backend.
pub trait Backend: PollStore + AccountStore + Clone + 'static {}

impl<T> Backend for T where T: PollStore + AccountStore + Clone + 'static {}

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: Arc::clone(&self.config) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the whole site.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
  Router::new()
    .route("/",                 get(polls::index::<S>))
    .route("/{id}/",            get(polls::detail::<S>))
    .route("/{id}/results/",    get(polls::results::<S>))
    .route("/{id}/vote/",       get(polls::vote_form::<S>).post(polls::vote::<S>))
    .route("/signup/",          get(accounts::signup_form).post(accounts::signup::<S>))
    .route("/accounts/login/",  get(accounts::login_form).post(accounts::login::<S>))
    .route("/accounts/logout/", post(accounts::logout::<S>))
    .fallback(|| async { Error::NotFound })
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
