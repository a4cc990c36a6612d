//! Shared fixtures for unit tests.

use std::sync::Mutex;

use serde_json::json;

use crate::{
  catalog::{Catalog, ChartData},
  history::Rating,
  recommend::{CopilotModel, RecommendResponse, RecommendResult, Recommender},
  selection::{Q3Answer, Selections},
};

/// A trimmed-down catalog in the shape the backend serves.
pub fn chart_json() -> serde_json::Value {
  json!({
    "version": "test",
    "questions": [
      {
        "id": "q1",
        "type": "single_select",
        "question": "What do you want to do?",
        "options": [
          { "id": "new_development", "label": "Build something new" },
          { "id": "bug_fixing", "label": "Fix a problem" },
          { "id": "testing", "label": "Write tests" }
        ]
      },
      {
        "id": "q2",
        "type": "single_select_by_category",
        "question": "More specifically?",
        "options_by_category": {
          "new_development": [
            { "id": "architecture_design", "label": "Architecture" }
          ],
          "bug_fixing": [
            { "id": "runtime_error", "label": "Runtime error" },
            { "id": "logic_error", "label": "Logic error" }
          ]
        }
      },
      {
        "id": "q3",
        "type": "multi_input",
        "questions": [
          {
            "id": "complexity",
            "question": "How complex is it?",
            "type": "single_select",
            "options": [
              { "id": "simple", "label": "Simple" },
              { "id": "moderate", "label": "Moderate" },
              { "id": "complex", "label": "Complex" }
            ]
          },
          {
            "id": "priority",
            "question": "What matters most?",
            "type": "multi_select",
            "options": [
              { "id": "speed", "label": "Speed" },
              { "id": "quality", "label": "Quality" },
              { "id": "cost", "label": "Cost" }
            ]
          },
          {
            "id": "context_amount",
            "question": "How much context?",
            "type": "single_select",
            "options": [
              { "id": "small", "label": "Small" },
              { "id": "medium", "label": "Medium" },
              { "id": "large", "label": "Large" }
            ]
          }
        ]
      }
    ]
  })
}

pub fn chart() -> ChartData {
  serde_json::from_value(chart_json()).expect("fixture chart parses")
}

pub fn catalog() -> Catalog { Catalog::try_from(chart()).expect("fixture catalog is valid") }

fn recommendations() -> Vec<RecommendResult> {
  vec![
    RecommendResult {
      rank:    1,
      model:   CopilotModel {
        id: "claude-sonnet-4.5".into(),
        name: "Claude Sonnet 4.5".into(),
        ..Default::default()
      },
      score:   0.92,
      reason:  "strong reasoning".into(),
      caution: None,
    },
    RecommendResult {
      rank:    2,
      model:   CopilotModel {
        id: "gpt-5-mini".into(),
        ..Default::default()
      },
      score:   0.81,
      reason:  "fast and cheap".into(),
      caution: Some("smaller context".into()),
    },
  ]
}

pub fn response(id: &str) -> RecommendResponse {
  response_with(id, "bug_fixing", "runtime_error", Q3Answer {
    complexity:     "simple".into(),
    priority:       vec!["speed".into()],
    context_amount: "small".into(),
  })
}

pub fn response_with(id: &str, q1: &str, q2: &str, q3: Q3Answer) -> RecommendResponse {
  RecommendResponse {
    diagnosis_id:    id.into(),
    recommendations: recommendations(),
    selections:      Selections {
      q1: Some(q1.into()),
      q2: Some(q2.into()),
      q3: Some(q3),
    },
  }
}

// ─── Fake recommender ────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("recommender unavailable")]
pub struct Unavailable;

/// A scripted [`Recommender`] that records every request.
#[derive(Default)]
pub struct FakeRecommender {
  pub fail:     bool,
  pub requests: Mutex<Vec<Selections>>,
  pub ratings:  Mutex<Vec<(String, Rating)>>,
}

impl FakeRecommender {
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Default::default()
    }
  }

  pub fn requests(&self) -> Vec<Selections> {
    self.requests.lock().expect("requests lock").clone()
  }
}

impl Recommender for FakeRecommender {
  type Error = Unavailable;

  async fn fetch_catalog(&self) -> Result<ChartData, Unavailable> {
    if self.fail { Err(Unavailable) } else { Ok(chart()) }
  }

  async fn recommend(&self, selections: &Selections) -> Result<RecommendResponse, Unavailable> {
    self
      .requests
      .lock()
      .expect("requests lock")
      .push(selections.clone());
    if self.fail {
      return Err(Unavailable);
    }
    Ok(RecommendResponse {
      diagnosis_id:    uuid::Uuid::new_v4().to_string(),
      recommendations: recommendations(),
      selections:      selections.clone(),
    })
  }

  async fn submit_feedback(&self, diagnosis_id: &str, rating: Rating) -> Result<(), Unavailable> {
    self
      .ratings
      .lock()
      .expect("ratings lock")
      .push((diagnosis_id.to_owned(), rating));
    Ok(())
  }
}
