//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{StatusCode, header},
  response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::render;

#[derive(Debug, Error)]
pub enum Error {
  #[error("not found")]
  NotFound,
  /// The route needs a signed-in user; `next` is where to return after
  /// login.
  #[error("login required")]
  LoginRequired { next: String },
  #[error("internal error: {0}")]
  Internal(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::NotFound => {
        (StatusCode::NOT_FOUND, Html(render::not_found())).into_response()
      }
      Error::LoginRequired { next } => {
        found(&format!("/accounts/login/?next={}", encode_query(&next)))
      }
      Error::Internal(msg) => {
        tracing::error!(error = %msg, "internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, Html(render::server_error())).into_response()
      }
      Error::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, Html(render::server_error())).into_response()
      }
    }
  }
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
  (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

/// Percent-encode a query-string value, leaving unreserved characters and
/// `/` intact.
pub fn encode_query(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for b in value.bytes() {
    match b {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
        out.push(b as char)
      }
      _ => out.push_str(&format!("%{b:02X}")),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_encoding_keeps_paths_readable() {
    assert_eq!(encode_query("/1/vote/"), "/1/vote/");
    assert_eq!(encode_query("/a b?c=d&e"), "/a%20b%3Fc%3Dd%26e");
  }

  #[test]
  fn login_required_redirects_with_next() {
    let resp = Error::LoginRequired { next: "/3/vote/".into() }.into_response();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
      resp.headers().get(header::LOCATION).unwrap(),
      "/accounts/login/?next=/3/vote/"
    );
  }

  #[test]
  fn not_found_is_404() {
    assert_eq!(Error::NotFound.into_response().status(), StatusCode::NOT_FOUND);
  }
}
