//! Code → label tables for rendering answers and model ids.
//!
//! Every lookup falls back to the raw code, so codes introduced by a newer
//! backend still render as something readable.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use crate::selection::Q3Answer;

// ─── Tables ──────────────────────────────────────────────────────────────────

const CATEGORY_LABELS: &[(&str, &str)] = &[
  ("new_development", "🆕 Build something new"),
  ("bug_fixing", "🐛 Fix a problem"),
  ("code_understanding", "📖 Understand some code"),
  ("refactoring", "🔧 Improve existing code"),
  ("testing", "🧪 Write tests"),
  ("documentation", "📝 Write docs or review"),
  ("learning", "📚 Learn or get advice"),
  ("code_generation", "⚡ Generate code or automate"),
  ("devops", "🏗️ Infrastructure and DevOps"),
  ("security", "🔒 Security work"),
];

const TASK_LABELS: &[(&str, &str)] = &[
  // new_development
  ("idea_brainstorm", "💡 Brainstorm ideas and plans"),
  ("architecture_design", "🏛️ Architecture and tech choices"),
  ("prototype_mvp", "🚀 Ship a prototype or MVP fast"),
  ("new_feature", "✨ Design and build a new feature"),
  ("data_model", "🗃️ Design a data model or DB schema"),
  ("ui_implementation", "🖼️ Turn a UI design into code"),
  ("spec_writing", "📋 Write a spec or requirements"),
  ("poc", "🔬 Try a technical proof of concept"),
  // bug_fixing
  ("runtime_error", "💥 Fix a runtime error"),
  ("logic_error", "🧩 Fix a logic error"),
  ("performance_issue", "🐢 Diagnose a performance problem"),
  ("memory_leak", "💾 Track down a memory leak"),
  ("hard_to_reproduce", "🔍 Investigate a hard-to-reproduce bug"),
  ("concurrency_bug", "🔄 Fix a concurrency bug"),
  ("env_issue", "🖥️ Fix an environment or build problem"),
  // code_understanding
  ("overall_structure", "🗺️ Grasp the overall structure"),
  ("legacy_code", "📜 Decode legacy code"),
  ("others_code", "👥 Understand someone else's code"),
  ("complex_algorithm", "🧮 Understand a complex algorithm"),
  ("dependency_analysis", "🔗 Map dependencies and impact"),
  ("data_flow", "📊 Follow the data flow"),
  // refactoring
  ("code_quality", "✨ Improve readability and naming"),
  ("performance_optimization", "⚡ Optimise performance (N+1 etc.)"),
  ("design_pattern", "🏗️ Apply a design pattern"),
  ("tech_debt", "🧹 Pay down technical debt"),
  ("dry", "♻️ Remove duplication (DRY)"),
  ("arch_change", "🔄 Large-scale architecture change"),
  // testing
  ("unit_test", "🧪 Write unit tests"),
  ("integration_test", "🔗 Write integration tests"),
  ("e2e_test", "🌐 Write end-to-end tests"),
  ("test_strategy", "📋 Plan a test strategy"),
  ("test_refactor", "🔧 Refactor existing tests"),
  // documentation
  ("api_doc", "📡 Write an API reference"),
  ("readme", "📖 Write a README"),
  ("code_review", "👀 Review code"),
  ("design_doc", "🏛️ Write a design document"),
  ("comments", "💬 Tidy up code comments"),
  // learning
  ("new_tech", "🌱 Learn a new technology"),
  ("concept", "💡 Understand a concept"),
  ("best_practice", "⭐ Learn best practices"),
  ("arch_consult", "🏛️ Discuss architecture and design"),
  ("comparison", "⚖️ Compare and choose technologies"),
  // code_generation
  ("boilerplate", "🏗️ Generate boilerplate"),
  ("crud", "🗃️ Generate CRUD code"),
  ("script", "📜 Write scripts or automation"),
  ("type_definition", "📝 Generate types or schemas"),
  ("migration", "🔄 Generate migrations"),
  // devops
  ("docker", "🐳 Docker and container setup"),
  ("cicd", "🔄 Build a CI/CD pipeline"),
  ("iac", "🏗️ Write IaC (Terraform/CloudFormation)"),
  ("monitoring", "📊 Set up monitoring and alerts"),
  ("deploy", "🚀 Deployment config and scripts"),
  // security
  ("vulnerability", "🔍 Investigate vulnerabilities"),
  ("auth", "🔐 Implement authentication/authorisation"),
  ("audit", "🔎 Run a security audit"),
  ("secret_management", "🔑 Improve secret management"),
];

const COMPLEXITY_LABELS: &[(&str, &str)] = &[
  ("simple", "Simple (about one file)"),
  ("moderate", "Moderate (several files)"),
  ("complex", "Complex (needs design decisions)"),
];

const PRIORITY_LABELS: &[(&str, &str)] = &[
  ("speed", "Speed"),
  ("quality", "Quality"),
  ("cost", "Cost"),
  ("creativity", "Creativity"),
];

const CONTEXT_LABELS: &[(&str, &str)] = &[
  ("small", "Small (a short snippet)"),
  ("medium", "Medium (a few files)"),
  ("large", "Large (the whole project)"),
];

const MODEL_LABELS: &[(&str, &str)] = &[
  ("gpt-4.1", "GPT-4.1"),
  ("gpt-5-mini", "GPT-5 mini"),
  ("gpt-5.1", "GPT-5.1"),
  ("gpt-5.1-codex", "GPT-5.1-Codex"),
  ("gpt-5.1-codex-mini", "GPT-5.1-Codex-Mini"),
  ("gpt-5.1-codex-max", "GPT-5.1-Codex-Max"),
  ("gpt-5.2", "GPT-5.2"),
  ("gpt-5.2-codex", "GPT-5.2-Codex"),
  ("gpt-5.3-codex", "GPT-5.3-Codex"),
  ("claude-haiku-4.5", "Claude Haiku 4.5"),
  ("claude-opus-4.5", "Claude Opus 4.5"),
  ("claude-opus-4.6", "Claude Opus 4.6"),
  ("claude-opus-4.6-fast", "Claude Opus 4.6 (fast)"),
  ("claude-sonnet-4", "Claude Sonnet 4"),
  ("claude-sonnet-4.5", "Claude Sonnet 4.5"),
  ("claude-sonnet-4.6", "Claude Sonnet 4.6"),
  ("gemini-2.5-pro", "Gemini 2.5 Pro"),
  ("gemini-3-flash", "Gemini 3 Flash"),
  ("gemini-3-pro", "Gemini 3 Pro"),
  ("gemini-3.1-pro", "Gemini 3.1 Pro"),
  ("grok-code-fast-1", "Grok Code Fast 1"),
  ("raptor-mini", "Raptor mini"),
  ("goldeneye", "Goldeneye"),
];

fn lookup<'a>(table: &[(&str, &'static str)], code: &'a str) -> Cow<'a, str> {
  table
    .iter()
    .find(|(k, _)| *k == code)
    .map(|(_, label)| Cow::Borrowed(*label))
    .unwrap_or(Cow::Borrowed(code))
}

// ─── Typed lookups ───────────────────────────────────────────────────────────

/// Label for a question-1 category code.
pub fn category_label(code: &str) -> Cow<'_, str> { lookup(CATEGORY_LABELS, code) }

/// Label for a question-2 task code.
pub fn task_label(code: &str) -> Cow<'_, str> { lookup(TASK_LABELS, code) }

/// Display name for a model id.
pub fn model_label(id: &str) -> Cow<'_, str> { lookup(MODEL_LABELS, id) }

/// One-line summary of a question-3 answer.
pub fn q3_summary(q3: &Q3Answer) -> String {
  summarize(
    Some(q3.complexity.as_str()),
    &q3.priority,
    Some(q3.context_amount.as_str()),
  )
}

/// Clauses appear as complexity, priority, context; an empty value omits its
/// clause entirely.
fn summarize(
  complexity: Option<&str>,
  priority: &[String],
  context_amount: Option<&str>,
) -> String {
  let mut parts = Vec::with_capacity(3);

  if let Some(c) = complexity.filter(|c| !c.is_empty()) {
    parts.push(format!("Complexity: {}", lookup(COMPLEXITY_LABELS, c)));
  }
  if !priority.is_empty() {
    let labels: Vec<Cow<'_, str>> = priority
      .iter()
      .map(|p| lookup(PRIORITY_LABELS, p))
      .collect();
    parts.push(format!("Priority: {}", labels.join("/")));
  }
  if let Some(c) = context_amount.filter(|c| !c.is_empty()) {
    parts.push(format!("Context: {}", lookup(CONTEXT_LABELS, c)));
  }

  parts.join(" / ")
}

// ─── Untyped lookup ──────────────────────────────────────────────────────────

/// Loose view of a question-3 value that may be missing fields.
#[derive(Deserialize)]
struct LooseQ3 {
  #[serde(default)]
  complexity:     Option<String>,
  #[serde(default)]
  priority:       Vec<String>,
  #[serde(default)]
  context_amount: Option<String>,
}

/// Label any stored answer by question key.
///
/// Used for history records whose selections may carry keys or shapes this
/// build does not know about.
pub fn label(key: &str, value: &Value) -> String {
  match (key, value) {
    ("q1", Value::String(code)) => category_label(code).into_owned(),
    ("q2", Value::String(code)) => task_label(code).into_owned(),
    ("q3", Value::Object(_)) => {
      match LooseQ3::deserialize(value) {
        Ok(q3) => summarize(
          q3.complexity.as_deref(),
          &q3.priority,
          q3.context_amount.as_deref(),
        ),
        Err(_) => value.to_string(),
      }
    }
    (_, Value::String(s)) => s.clone(),
    _ => value.to_string(),
  }
}
