//! The question catalog served by the recommender.
//!
//! [`ChartData`] is the wire shape. [`Catalog`] is the validated form the
//! flow controller works against: question 1 is a flat option list,
//! question 2 is keyed by the question-1 category and question 3 is a fixed
//! set of sub-questions.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Options ─────────────────────────────────────────────────────────────────

/// A single selectable answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOption {
  pub id:          String,
  pub label:       String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Scoring weights used by the recommender; opaque to the client.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub multiplier:  Option<BTreeMap<String, f64>>,
}

// ─── Question 3 sub-questions ────────────────────────────────────────────────

/// The closed set of question-3 fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Q3Field {
  Complexity,
  Priority,
  ContextAmount,
}

impl Q3Field {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Complexity => "complexity",
      Self::Priority => "priority",
      Self::ContextAmount => "context_amount",
    }
  }

  /// The selection kind each field must be declared with.
  pub fn expected_kind(self) -> SelectKind {
    match self {
      Self::Priority => SelectKind::MultiSelect,
      Self::Complexity | Self::ContextAmount => SelectKind::SingleSelect,
    }
  }
}

impl fmt::Display for Q3Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectKind {
  SingleSelect,
  MultiSelect,
}

/// One sub-question of question 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestion {
  pub id:       Q3Field,
  pub question: String,
  #[serde(rename = "type")]
  pub kind:     SelectKind,
  pub options:  Vec<ChartOption>,
}

impl SubQuestion {
  pub fn option(&self, id: &str) -> Option<&ChartOption> {
    self.options.iter().find(|o| o.id == id)
  }
}

// ─── Wire shape ──────────────────────────────────────────────────────────────

/// A question as served by `GET /api/v1/chart/questions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartQuestion {
  SingleSelect {
    id:       String,
    question: String,
    options:  Vec<ChartOption>,
  },
  SingleSelectByCategory {
    id:                  String,
    question:            String,
    options_by_category: BTreeMap<String, Vec<ChartOption>>,
  },
  MultiInput {
    id:        String,
    #[serde(default)]
    question:  Option<String>,
    questions: Vec<SubQuestion>,
  },
}

/// The full catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
  #[serde(default)]
  pub version:   String,
  pub questions: Vec<ChartQuestion>,
}

// ─── Validated catalog ───────────────────────────────────────────────────────

/// A catalog whose three questions have been checked for shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
  pub version:        String,
  pub q1_question:    String,
  pub q2_question:    String,
  categories:         Vec<ChartOption>,
  by_category:        BTreeMap<String, Vec<ChartOption>>,
  sub_questions:      Vec<SubQuestion>,
}

impl Catalog {
  /// Question-1 options.
  pub fn categories(&self) -> &[ChartOption] { &self.categories }

  /// Question-2 options registered under `category`; empty when the
  /// category has none.
  pub fn options_for(&self, category: &str) -> &[ChartOption] {
    self
      .by_category
      .get(category)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn sub_questions(&self) -> &[SubQuestion] { &self.sub_questions }

  pub fn sub_question(&self, field: Q3Field) -> Option<&SubQuestion> {
    self.sub_questions.iter().find(|q| q.id == field)
  }
}

impl TryFrom<ChartData> for Catalog {
  type Error = Error;

  fn try_from(data: ChartData) -> Result<Self> {
    let mut questions = data.questions.into_iter();

    let (q1_question, categories) = match questions.next() {
      Some(ChartQuestion::SingleSelect { question, options, .. }) => {
        (question, options)
      }
      other => return Err(malformed("question 1", "single_select", other)),
    };

    let (q2_question, by_category) = match questions.next() {
      Some(ChartQuestion::SingleSelectByCategory {
        question,
        options_by_category,
        ..
      }) => (question, options_by_category),
      other => {
        return Err(malformed("question 2", "single_select_by_category", other));
      }
    };

    let sub_questions = match questions.next() {
      Some(ChartQuestion::MultiInput { questions, .. }) => questions,
      other => return Err(malformed("question 3", "multi_input", other)),
    };

    for sub in &sub_questions {
      if sub.kind != sub.id.expected_kind() {
        return Err(Error::MalformedCatalog(format!(
          "sub-question {} must be {:?}, found {:?}",
          sub.id,
          sub.id.expected_kind(),
          sub.kind
        )));
      }
    }
    for field in [Q3Field::Complexity, Q3Field::ContextAmount] {
      if !sub_questions.iter().any(|q| q.id == field) {
        return Err(Error::MalformedCatalog(format!(
          "required sub-question {field} is missing"
        )));
      }
    }

    Ok(Self {
      version: data.version,
      q1_question,
      q2_question,
      categories,
      by_category,
      sub_questions,
    })
  }
}

fn malformed(
  which: &str,
  expected: &str,
  found: Option<ChartQuestion>,
) -> Error {
  let found = match found {
    None => "nothing".to_owned(),
    Some(ChartQuestion::SingleSelect { .. }) => "single_select".to_owned(),
    Some(ChartQuestion::SingleSelectByCategory { .. }) => {
      "single_select_by_category".to_owned()
    }
    Some(ChartQuestion::MultiInput { .. }) => "multi_input".to_owned(),
  };
  Error::MalformedCatalog(format!("{which} must be {expected}, found {found}"))
}
