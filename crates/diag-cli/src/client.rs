//! Async HTTP client for the remote recommendation service.

use std::time::Duration;

use diag_core::{
  catalog::ChartData,
  history::Rating,
  recommend::{RecommendResponse, Recommender},
  selection::Selections,
};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;
use thiserror::Error;

/// Connection settings for the recommendation service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{path} returned {status}")]
  Status { path: String, status: StatusCode },

  #[error("invalid base URL {0:?}")]
  InvalidUrl(String),
}

/// Async HTTP client for the recommendation API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Serialize)]
struct RecommendRequest<'a> {
  selections: &'a Selections,
}

#[derive(Serialize)]
struct FeedbackRequest {
  feedback: u8,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api/v1{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// `/api/v1/history/{id}/feedback`, with `id` percent-encoded as a single
  /// path segment.
  fn feedback_url(&self, diagnosis_id: &str) -> Result<Url, ClientError> {
    let base = self.url("/history");
    let mut url = Url::parse(&base).map_err(|_| ClientError::InvalidUrl(base.clone()))?;
    url
      .path_segments_mut()
      .map_err(|()| ClientError::InvalidUrl(base))?
      .push(diagnosis_id)
      .push("feedback");
    Ok(url)
  }

  fn check(path: &str, resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
      Ok(resp)
    } else {
      Err(ClientError::Status { path: path.to_owned(), status })
    }
  }
}

impl Recommender for ApiClient {
  type Error = ClientError;

  /// `GET /api/v1/chart/questions`
  async fn fetch_catalog(&self) -> Result<ChartData, ClientError> {
    let path = "/chart/questions";
    let resp = self.client.get(self.url(path)).send().await?;
    Ok(Self::check(path, resp)?.json().await?)
  }

  /// `POST /api/v1/chart/recommend`
  async fn recommend(
    &self,
    selections: &Selections,
  ) -> Result<RecommendResponse, ClientError> {
    let path = "/chart/recommend";
    let resp = self
      .client
      .post(self.url(path))
      .json(&RecommendRequest { selections })
      .send()
      .await?;
    Ok(Self::check(path, resp)?.json().await?)
  }

  /// `POST /api/v1/history/{id}/feedback`
  async fn submit_feedback(
    &self,
    diagnosis_id: &str,
    rating: Rating,
  ) -> Result<(), ClientError> {
    let url = self.feedback_url(diagnosis_id)?;
    let path = url.path().to_owned();
    let resp = self
      .client
      .post(url)
      .json(&FeedbackRequest { feedback: rating.get() })
      .send()
      .await?;
    Self::check(&path, resp)?;
    Ok(())
  }
}
