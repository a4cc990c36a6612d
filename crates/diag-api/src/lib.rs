//! JSON REST API over the local diagnosis history.
//!
//! Exposes an axum [`Router`] backed by a [`HistoryStore`] on any
//! [`Storage`] backend. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", diag_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod history;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use diag_core::{
  history::{DEFAULT_CAPACITY, DEFAULT_STORAGE_KEY, HistoryStore},
  storage::Storage,
};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DIAG_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:        String,
  #[serde(default = "default_port")]
  pub port:        u16,
  #[serde(default = "default_store_path")]
  pub store_path:  PathBuf,
  #[serde(default = "default_storage_key")]
  pub storage_key: String,
  #[serde(default = "default_capacity")]
  pub capacity:    usize,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8787 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/diag/history.db") }

fn default_storage_key() -> String { DEFAULT_STORAGE_KEY.to_string() }

fn default_capacity() -> usize { DEFAULT_CAPACITY }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<HistoryStore<S>>) -> Router<()>
where
  S: Storage + 'static,
{
  Router::new()
    .route(
      "/history",
      get(history::list::<S>).delete(history::clear::<S>),
    )
    .route(
      "/history/{id}",
      get(history::get_one::<S>).delete(history::delete_one::<S>),
    )
    .route("/history/{id}/feedback", post(history::feedback::<S>))
    .with_state(store)
}
