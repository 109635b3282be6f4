//! Core types and trait definitions for the polls application.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::PollStore`] and
//! [`store::AccountStore`]; the web layer depends on those traits only.

// Native `async fn` in traits; the traits spell out `Send` futures explicitly.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod choice;
pub mod error;
pub mod question;
pub mod store;
pub mod vote;
pub mod voting;

pub use error::{Error, Result};
