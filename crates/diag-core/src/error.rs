//! Error types for `diag-core`.

use thiserror::Error;

use crate::catalog::Q3Field;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot {action} while at step {step}")]
  InvalidTransition { step: &'static str, action: &'static str },

  #[error("option {option:?} is not offered for {question}")]
  UnknownOption { question: String, option: String },

  #[error("question 3 is incomplete: {0} is required")]
  IncompleteAnswer(Q3Field),

  #[error("a recommendation request is already in flight")]
  SubmissionInFlight,

  #[error("rating must be between 1 and 5, got {0}")]
  InvalidRating(i64),

  #[error("page and limit must both be at least 1 (page {page}, limit {limit})")]
  InvalidPagination { page: usize, limit: usize },

  #[error("malformed question catalog: {0}")]
  MalformedCatalog(String),

  #[error("recommendation failed: {0}")]
  Recommendation(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
