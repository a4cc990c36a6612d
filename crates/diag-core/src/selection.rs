//! The answer payload accumulated by the questionnaire.
//!
//! Serialised as a JSON object with unset questions omitted, which is the
//! shape the recommender expects in `{"selections": ...}` and the shape
//! stored in history records.

use serde::{Deserialize, Deserializer, Serialize};

// ─── Q3Answer ────────────────────────────────────────────────────────────────

/// The composite answer to question 3.
///
/// `priority` is treated as a set: [`Q3Answer::toggle_priority`] never
/// introduces duplicates. Insertion order is kept because it is the order the
/// labels are rendered in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Q3Answer {
  #[serde(default)]
  pub complexity:     String,
  #[serde(default)]
  pub priority:       Vec<String>,
  #[serde(default)]
  pub context_amount: String,
}

impl Q3Answer {
  /// Add `code` if absent, remove it if present.
  pub fn toggle_priority(&mut self, code: &str) {
    if let Some(pos) = self.priority.iter().position(|p| p == code) {
      self.priority.remove(pos);
    } else {
      self.priority.push(code.to_owned());
    }
  }

  /// Both single-valued fields are filled in; `priority` may be empty.
  pub fn is_complete(&self) -> bool {
    !self.complexity.is_empty() && !self.context_amount.is_empty()
  }
}

// ─── Selections ──────────────────────────────────────────────────────────────

/// The in-progress or completed set of answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub q1: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub q2: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub q3: Option<Q3Answer>,
}

impl Selections {
  pub fn is_empty(&self) -> bool {
    self.q1.is_none() && self.q2.is_none() && self.q3.is_none()
  }

  /// Human-readable `(question key, label)` pairs for every set answer, in
  /// question order.
  pub fn labels(&self) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    if let Some(q1) = &self.q1 {
      out.push(("q1", crate::labels::category_label(q1).into_owned()));
    }
    if let Some(q2) = &self.q2 {
      out.push(("q2", crate::labels::task_label(q2).into_owned()));
    }
    if let Some(q3) = &self.q3 {
      out.push(("q3", crate::labels::q3_summary(q3)));
    }
    out
  }
}

/// Deserialise selections stored either as an object or as a JSON string
/// holding the serialised object. A string that does not parse yields empty
/// selections rather than failing the whole record.
pub(crate) fn deserialize_lenient<'de, D>(
  deserializer: D,
) -> Result<Selections, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Stored {
    Object(Selections),
    Encoded(String),
  }

  Ok(match Stored::deserialize(deserializer)? {
    Stored::Object(s) => s,
    Stored::Encoded(raw) => serde_json::from_str(&raw).unwrap_or_default(),
  })
}
