//! Handlers for `/history` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/history` | Optional `?page` (default 1) and `?limit` (default 15) |
//! | `GET`    | `/history/:id` | 404 if not found |
//! | `POST`   | `/history/:id/feedback` | Body: `{"feedback":1..5}` or `{"rating":1..5}` |
//! | `DELETE` | `/history/:id` | 204, also for unknown ids |
//! | `DELETE` | `/history` | 204; removes every record |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use diag_core::{
  history::{DiagnosisHistory, HistoryPage, HistoryStore, Rating},
  storage::Storage,
};
use serde::Deserialize;

use crate::error::ApiError;

/// Page size used when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 15;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// 1-based page number.
  pub page:  Option<usize>,
  pub limit: Option<usize>,
}

/// `GET /history[?page=<n>][&limit=<n>]`
pub async fn list<S>(
  State(store): State<Arc<HistoryStore<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<HistoryPage>, ApiError>
where
  S: Storage + 'static,
{
  let page = store
    .read_page(
      params.page.unwrap_or(1),
      params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .await?;
  Ok(Json(page))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /history/:id`
pub async fn get_one<S>(
  State(store): State<Arc<HistoryStore<S>>>,
  Path(id): Path<String>,
) -> Result<Json<DiagnosisHistory>, ApiError>
where
  S: Storage + 'static,
{
  let item = store
    .get(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("diagnosis {id} not found")))?;
  Ok(Json(item))
}

// ─── Feedback ─────────────────────────────────────────────────────────────────

/// Body of `POST /history/:id/feedback`. Either field name is accepted;
/// `feedback` wins when both are present.
#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
  pub feedback: Option<i64>,
  pub rating:   Option<i64>,
}

impl FeedbackBody {
  fn rating(&self) -> Result<Rating, ApiError> {
    let value = self
      .feedback
      .or(self.rating)
      .ok_or_else(|| ApiError::BadRequest("feedback or rating is required".into()))?;
    Ok(Rating::new(value)?)
  }
}

/// `POST /history/:id/feedback`. Returns the updated record.
pub async fn feedback<S>(
  State(store): State<Arc<HistoryStore<S>>>,
  Path(id): Path<String>,
  Json(body): Json<FeedbackBody>,
) -> Result<Json<DiagnosisHistory>, ApiError>
where
  S: Storage + 'static,
{
  let rating = body.rating()?;

  if !store.update_feedback(&id, rating).await? {
    return Err(ApiError::NotFound(format!("diagnosis {id} not found")));
  }
  tracing::info!(%id, %rating, "feedback recorded");

  let item = store
    .get(&id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("diagnosis {id} not found")))?;
  Ok(Json(item))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /history/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<HistoryStore<S>>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: Storage + 'static,
{
  store.remove(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /history`
pub async fn clear<S>(
  State(store): State<Arc<HistoryStore<S>>>,
) -> Result<StatusCode, ApiError>
where
  S: Storage + 'static,
{
  store.clear().await?;
  tracing::info!("history cleared");
  Ok(StatusCode::NO_CONTENT)
}
