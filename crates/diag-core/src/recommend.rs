//! Recommendation payloads and the [`Recommender`] trait.
//!
//! The recommender is an external service. The trait is implemented by the
//! HTTP client in `diag-cli`; the flow controller depends on this
//! abstraction only.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{catalog::ChartData, history::Rating, selection::Selections};

// ─── Model catalog entries ───────────────────────────────────────────────────

/// Relative performance scores of a model, as published by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPerformance {
  pub speed:                 f64,
  pub reasoning:             f64,
  pub coding:                f64,
  pub context_length:        f64,
  pub cost_efficiency:       f64,
  pub instruction_following: f64,
  pub creativity:            f64,
  pub long_output:           f64,
}

/// A recommendable model.
///
/// Only `id` is required. Everything else defaults and unknown fields are
/// kept in `extra`, so records written against a newer backend still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopilotModel {
  pub id:             String,
  #[serde(default)]
  pub name:           String,
  #[serde(default)]
  pub provider:       String,
  #[serde(default)]
  pub description:    String,
  #[serde(default)]
  pub context_window: u64,
  #[serde(default)]
  pub cost_tier:      String,
  #[serde(default)]
  pub performance:    ModelPerformance,
  #[serde(default)]
  pub strengths:      Vec<String>,
  #[serde(default)]
  pub cautions:       Vec<String>,
  #[serde(default)]
  pub best_for:       Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub available:      Option<bool>,
  #[serde(flatten)]
  pub extra:          serde_json::Map<String, serde_json::Value>,
}

impl CopilotModel {
  /// The name to show for this model.
  pub fn display_name(&self) -> String {
    if self.name.is_empty() {
      crate::labels::model_label(&self.id).into_owned()
    } else {
      self.name.clone()
    }
  }
}

// ─── Recommendation output ───────────────────────────────────────────────────

/// One ranked recommendation; `rank` starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResult {
  pub rank:    u32,
  pub model:   CopilotModel,
  pub score:   f64,
  pub reason:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub caution: Option<String>,
}

/// The body returned by `POST /api/v1/chart/recommend`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
  pub diagnosis_id:    String,
  pub recommendations: Vec<RecommendResult>,
  #[serde(default)]
  pub selections:      Selections,
}

impl RecommendResponse {
  pub fn top(&self) -> Option<&RecommendResult> {
    self.recommendations.iter().min_by_key(|r| r.rank)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the remote recommendation service.
///
/// All methods return `Send` futures so implementations can be driven from a
/// multi-threaded tokio runtime.
pub trait Recommender: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the three-question catalog.
  fn fetch_catalog(
    &self,
  ) -> impl Future<Output = Result<ChartData, Self::Error>> + Send + '_;

  /// Compute recommendations for a completed set of answers.
  fn recommend<'a>(
    &'a self,
    selections: &'a Selections,
  ) -> impl Future<Output = Result<RecommendResponse, Self::Error>> + Send + 'a;

  /// Report a rating for a past diagnosis. Callers treat this as
  /// fire-and-forget; local history is updated independently.
  fn submit_feedback<'a>(
    &'a self,
    diagnosis_id: &'a str,
    rating: Rating,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
