//! Core types and trait definitions for the model diagnosis tool.
//!
//! This crate holds the questionnaire state machine, the local history log
//! and the label tables. It is deliberately free of HTTP and database
//! dependencies; storage backends and the recommender client live in other
//! crates and plug in through [`storage::Storage`] and
//! [`recommend::Recommender`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod error;
pub mod flow;
pub mod history;
pub mod labels;
pub mod recommend;
pub mod selection;
pub mod storage;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
