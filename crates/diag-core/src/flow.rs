//! The diagnostic flow controller, a three-step question state machine.
//!
//! ```text
//! Q1 ──select──▶ Q2 ──select──▶ Q3 ──submit──▶ Submitting ──▶ Done
//!  ▲              │  ▲           │                 │
//!  └─────back─────┘  └───back────┘                 ▼
//!                    └────────────back────────── Failed ──submit──▶ …
//! ```
//!
//! The controller is driven by a validated [`Catalog`]; option sets are never
//! hard-coded. Answers accumulate in [`Selections`]. The question-3 answer is
//! edited as a draft and only copied into `selections.q3` when a submission
//! starts.

use crate::{
  Error, Result,
  catalog::{Catalog, ChartOption, Q3Field, SubQuestion},
  history::HistoryStore,
  recommend::{RecommendResponse, Recommender},
  selection::{Q3Answer, Selections},
  storage::Storage,
};

// ─── Step ────────────────────────────────────────────────────────────────────

/// Where the flow currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
  Q1,
  Q2,
  Q3,
  /// A recommendation request is in flight.
  Submitting,
  /// The last request succeeded; carries the response for the results view.
  Done { response: RecommendResponse },
  /// The last request failed. Question-3 answers are kept and the user may
  /// edit and resubmit.
  Failed { message: String },
}

impl Step {
  /// 1-based question number for progress display.
  pub fn number(&self) -> u8 {
    match self {
      Self::Q1 => 1,
      Self::Q2 => 2,
      _ => 3,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::Q1 => "q1",
      Self::Q2 => "q2",
      Self::Q3 => "q3",
      Self::Submitting => "submitting",
      Self::Done { .. } => "done",
      Self::Failed { .. } => "failed",
    }
  }

  /// Question-3 answers can be edited and submitted.
  fn accepts_q3_input(&self) -> bool { matches!(self, Self::Q3 | Self::Failed { .. }) }
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// State for one run through the questionnaire.
#[derive(Debug, Clone)]
pub struct DiagnosticFlow {
  catalog:    Catalog,
  step:       Step,
  selections: Selections,
  draft:      Q3Answer,
}

impl DiagnosticFlow {
  pub fn new(catalog: Catalog) -> Self {
    Self {
      catalog,
      step: Step::Q1,
      selections: Selections::default(),
      draft: Q3Answer::default(),
    }
  }

  // ── Accessors ─────────────────────────────────────────────────────────────

  pub fn catalog(&self) -> &Catalog { &self.catalog }

  pub fn step(&self) -> &Step { &self.step }

  pub fn selections(&self) -> &Selections { &self.selections }

  /// The question-3 answer being edited.
  pub fn draft(&self) -> &Q3Answer { &self.draft }

  /// Options offered at the current step: categories at `Q1`, the
  /// category-scoped set at `Q2`, nothing otherwise.
  pub fn current_options(&self) -> &[ChartOption] {
    match self.step {
      Step::Q1 => self.catalog.categories(),
      Step::Q2 => self.q2_options(),
      _ => &[],
    }
  }

  /// The question-2 options legal for the chosen category.
  pub fn q2_options(&self) -> &[ChartOption] {
    self
      .selections
      .q1
      .as_deref()
      .map(|q1| self.catalog.options_for(q1))
      .unwrap_or_default()
  }

  /// Whether option `id` of sub-question `field` is currently chosen.
  pub fn is_chosen(&self, field: Q3Field, id: &str) -> bool {
    match field {
      Q3Field::Complexity => self.draft.complexity == id,
      Q3Field::ContextAmount => self.draft.context_amount == id,
      Q3Field::Priority => self.draft.priority.iter().any(|p| p == id),
    }
  }

  /// True when a submission would pass the guard.
  pub fn can_submit(&self) -> bool {
    self.step.accepts_q3_input() && self.draft.is_complete()
  }

  // ── Questions 1 and 2 ─────────────────────────────────────────────────────

  /// Answer question 1 and advance to question 2.
  pub fn select_q1(&mut self, option_id: &str) -> Result<()> {
    self.expect_step(Step::Q1, "answer question 1")?;
    if !self.catalog.categories().iter().any(|o| o.id == option_id) {
      return Err(unknown_option("question 1", option_id));
    }

    self.selections = Selections {
      q1: Some(option_id.to_owned()),
      ..Default::default()
    };
    self.draft = Q3Answer::default();
    self.step = Step::Q2;
    Ok(())
  }

  /// Answer question 2 and advance to question 3.
  pub fn select_q2(&mut self, option_id: &str) -> Result<()> {
    self.expect_step(Step::Q2, "answer question 2")?;
    if !self.q2_options().iter().any(|o| o.id == option_id) {
      return Err(unknown_option("question 2", option_id));
    }

    self.selections.q2 = Some(option_id.to_owned());
    self.selections.q3 = None;
    self.draft = Q3Answer::default();
    self.step = Step::Q3;
    Ok(())
  }

  /// Step back one question, discarding the answers that depended on it.
  pub fn back(&mut self) -> Result<()> {
    match self.step {
      Step::Q2 => {
        self.selections = Selections::default();
        self.step = Step::Q1;
      }
      Step::Q3 | Step::Failed { .. } => {
        self.selections.q2 = None;
        self.selections.q3 = None;
        self.draft = Q3Answer::default();
        self.step = Step::Q2;
      }
      _ => {
        return Err(Error::InvalidTransition {
          step:   self.step.name(),
          action: "go back",
        });
      }
    }
    Ok(())
  }

  // ── Question 3 ────────────────────────────────────────────────────────────

  /// Apply option `option_id` to sub-question `field`: single-select fields
  /// are overwritten, the multi-select field is toggled.
  pub fn choose(&mut self, field: Q3Field, option_id: &str) -> Result<()> {
    if !self.step.accepts_q3_input() {
      return Err(Error::InvalidTransition {
        step:   self.step.name(),
        action: "edit question 3",
      });
    }

    let sub = self.sub_question(field)?;
    if sub.option(option_id).is_none() {
      return Err(unknown_option(&format!("question 3 {field}"), option_id));
    }

    match field {
      Q3Field::Priority => self.draft.toggle_priority(option_id),
      Q3Field::Complexity => self.draft.complexity = option_id.to_owned(),
      Q3Field::ContextAmount => {
        self.draft.context_amount = option_id.to_owned()
      }
    }
    Ok(())
  }

  pub fn set_complexity(&mut self, option_id: &str) -> Result<()> {
    self.choose(Q3Field::Complexity, option_id)
  }

  pub fn set_context_amount(&mut self, option_id: &str) -> Result<()> {
    self.choose(Q3Field::ContextAmount, option_id)
  }

  pub fn toggle_priority(&mut self, option_id: &str) -> Result<()> {
    self.choose(Q3Field::Priority, option_id)
  }

  // ── Submission ────────────────────────────────────────────────────────────

  /// Start a submission: checks the guard, commits the question-3 draft and
  /// moves to `Submitting`. Returns the payload to send.
  pub fn begin_submit(&mut self) -> Result<Selections> {
    match self.step {
      Step::Submitting => return Err(Error::SubmissionInFlight),
      ref step if !step.accepts_q3_input() => {
        return Err(Error::InvalidTransition {
          step:   step.name(),
          action: "submit",
        });
      }
      _ => {}
    }
    if self.draft.complexity.is_empty() {
      return Err(Error::IncompleteAnswer(Q3Field::Complexity));
    }
    if self.draft.context_amount.is_empty() {
      return Err(Error::IncompleteAnswer(Q3Field::ContextAmount));
    }

    self.selections.q3 = Some(self.draft.clone());
    self.step = Step::Submitting;
    Ok(self.selections.clone())
  }

  /// Resolve an in-flight submission.
  pub fn finish(
    &mut self,
    outcome: std::result::Result<RecommendResponse, String>,
  ) -> Result<()> {
    self.expect_step(Step::Submitting, "finish a submission")?;
    self.step = match outcome {
      Ok(response) => Step::Done { response },
      Err(message) => Step::Failed { message },
    };
    Ok(())
  }

  /// Submit the answers to `recommender` and, on success, record the result
  /// in `history`.
  ///
  /// Exactly one recommendation call is made. A failure to write history is
  /// logged and does not turn a successful recommendation into an error.
  pub async fn submit<R, S>(
    &mut self,
    recommender: &R,
    history: &HistoryStore<S>,
  ) -> Result<RecommendResponse>
  where
    R: Recommender,
    S: Storage,
  {
    let selections = self.begin_submit()?;
    tracing::debug!(?selections, "requesting recommendation");

    match recommender.recommend(&selections).await {
      Ok(response) => {
        if let Err(e) = history.append(response.clone()).await {
          tracing::warn!(
            diagnosis_id = %response.diagnosis_id,
            error = %e,
            "failed to record diagnosis history"
          );
        }
        self.finish(Ok(response.clone()))?;
        Ok(response)
      }
      Err(e) => {
        tracing::warn!(error = %e, "recommendation request failed");
        self.finish(Err(e.to_string()))?;
        Err(Error::Recommendation(Box::new(e)))
      }
    }
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  fn sub_question(&self, field: Q3Field) -> Result<&SubQuestion> {
    self
      .catalog
      .sub_question(field)
      .ok_or_else(|| unknown_option("question 3", field.as_str()))
  }

  fn expect_step(&self, expected: Step, action: &'static str) -> Result<()> {
    if self.step == expected {
      Ok(())
    } else {
      Err(Error::InvalidTransition {
        step: self.step.name(),
        action,
      })
    }
  }
}

fn unknown_option(question: &str, option: &str) -> Error {
  Error::UnknownOption {
    question: question.to_owned(),
    option:   option.to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    history::HistoryStore,
    storage::MemoryStorage,
    testing::{FakeRecommender, catalog},
  };

  fn flow() -> DiagnosticFlow { DiagnosticFlow::new(catalog()) }

  fn at_q3() -> DiagnosticFlow {
    let mut f = flow();
    f.select_q1("bug_fixing").unwrap();
    f.select_q2("runtime_error").unwrap();
    f
  }

  // ─── Navigation ─────────────────────────────────────────────────────────────

  #[test]
  fn starts_at_q1_with_nothing_selected() {
    let f = flow();
    assert_eq!(f.step(), &Step::Q1);
    assert!(f.selections().is_empty());
    assert_eq!(f.current_options().len(), 3);
  }

  #[test]
  fn q2_options_are_scoped_to_the_category() {
    let mut f = flow();
    f.select_q1("bug_fixing").unwrap();

    let ids: Vec<_> = f.current_options().iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["runtime_error", "logic_error"]);
    assert!(matches!(
      f.select_q2("architecture_design"),
      Err(Error::UnknownOption { .. })
    ));
    assert_eq!(f.step(), &Step::Q2);
  }

  #[test]
  fn category_without_options_offers_nothing() {
    let mut f = flow();
    f.select_q1("testing").unwrap();

    assert!(f.q2_options().is_empty());
    assert!(f.select_q2("unit_test").is_err());
  }

  #[test]
  fn unknown_q1_option_is_rejected() {
    let mut f = flow();
    assert!(matches!(f.select_q1("nope"), Err(Error::UnknownOption { .. })));
    assert_eq!(f.step(), &Step::Q1);
  }

  #[test]
  fn back_from_q3_keeps_q1_and_clears_the_rest() {
    let mut f = at_q3();
    f.set_complexity("simple").unwrap();

    f.back().unwrap();
    assert_eq!(f.step(), &Step::Q2);
    assert_eq!(f.selections().q1.as_deref(), Some("bug_fixing"));
    assert_eq!(f.selections().q2, None);
    assert_eq!(f.selections().q3, None);
    assert_eq!(f.draft(), &Q3Answer::default());
  }

  #[test]
  fn back_from_q2_clears_q1() {
    let mut f = flow();
    f.select_q1("bug_fixing").unwrap();

    f.back().unwrap();
    assert_eq!(f.step(), &Step::Q1);
    assert!(f.selections().is_empty());
  }

  #[test]
  fn back_from_q1_is_invalid() {
    let mut f = flow();
    assert!(matches!(f.back(), Err(Error::InvalidTransition { .. })));
  }

  #[test]
  fn answering_q1_out_of_turn_is_invalid() {
    let mut f = at_q3();
    assert!(matches!(
      f.select_q1("testing"),
      Err(Error::InvalidTransition { .. })
    ));
  }

  // ─── Question 3 ─────────────────────────────────────────────────────────────

  #[test]
  fn single_selects_overwrite_and_priority_toggles() {
    let mut f = at_q3();
    f.set_complexity("simple").unwrap();
    f.set_complexity("complex").unwrap();
    f.toggle_priority("speed").unwrap();
    f.toggle_priority("quality").unwrap();
    f.toggle_priority("speed").unwrap();
    f.set_context_amount("large").unwrap();

    assert_eq!(f.draft(), &Q3Answer {
      complexity:     "complex".into(),
      priority:       vec!["quality".into()],
      context_amount: "large".into(),
    });
    assert!(f.is_chosen(Q3Field::Priority, "quality"));
    assert!(!f.is_chosen(Q3Field::Priority, "speed"));
  }

  #[test]
  fn q3_options_come_from_the_catalog() {
    let mut f = at_q3();
    assert!(matches!(
      f.set_complexity("galactic"),
      Err(Error::UnknownOption { .. })
    ));
  }

  #[test]
  fn editing_q3_before_reaching_it_is_invalid() {
    let mut f = flow();
    assert!(matches!(
      f.set_complexity("simple"),
      Err(Error::InvalidTransition { .. })
    ));
  }

  #[test]
  fn submit_guard_requires_complexity_and_context() {
    let mut f = at_q3();
    assert!(!f.can_submit());
    assert!(matches!(
      f.begin_submit(),
      Err(Error::IncompleteAnswer(Q3Field::Complexity))
    ));

    f.set_complexity("simple").unwrap();
    assert!(matches!(
      f.begin_submit(),
      Err(Error::IncompleteAnswer(Q3Field::ContextAmount))
    ));

    f.set_context_amount("small").unwrap();
    assert!(f.can_submit());
    assert_eq!(f.step(), &Step::Q3);
  }

  #[test]
  fn second_submission_is_rejected_while_in_flight() {
    let mut f = at_q3();
    f.set_complexity("simple").unwrap();
    f.set_context_amount("small").unwrap();

    f.begin_submit().unwrap();
    assert_eq!(f.step(), &Step::Submitting);
    assert!(!f.can_submit());
    assert!(matches!(f.begin_submit(), Err(Error::SubmissionInFlight)));
  }

  // ─── Submission ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn submit_sends_one_request_with_the_full_payload() {
    let recommender = FakeRecommender::default();
    let history = HistoryStore::new(MemoryStorage::new());

    let mut f = flow();
    f.select_q1("bug_fixing").unwrap();
    f.select_q2("runtime_error").unwrap();
    f.set_complexity("simple").unwrap();
    f.toggle_priority("speed").unwrap();
    f.set_context_amount("small").unwrap();

    let response = f.submit(&recommender, &history).await.unwrap();

    let expected: Selections = serde_json::from_value(serde_json::json!({
      "q1": "bug_fixing",
      "q2": "runtime_error",
      "q3": { "complexity": "simple", "priority": ["speed"], "context_amount": "small" }
    }))
    .unwrap();
    assert_eq!(recommender.requests(), vec![expected]);

    assert_eq!(f.step(), &Step::Done { response: response.clone() });

    let stored = history.read_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, response.diagnosis_id);
    assert_eq!(stored[0].feedback, None);
  }

  #[tokio::test]
  async fn failed_submit_keeps_answers_and_allows_retry() {
    let history = HistoryStore::new(MemoryStorage::new());
    let mut f = at_q3();
    f.set_complexity("moderate").unwrap();
    f.set_context_amount("medium").unwrap();

    let err = f
      .submit(&FakeRecommender::failing(), &history)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Recommendation(_)));
    assert!(matches!(f.step(), Step::Failed { .. }));
    assert_eq!(f.draft().complexity, "moderate");
    assert!(f.can_submit());
    assert!(history.read_all().await.unwrap().is_empty());

    let ok = FakeRecommender::default();
    f.submit(&ok, &history).await.unwrap();
    assert!(matches!(f.step(), Step::Done { .. }));
    assert_eq!(ok.requests().len(), 1);
    assert_eq!(history.read_all().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn back_from_failed_returns_to_q2() {
    let history = HistoryStore::new(MemoryStorage::new());
    let mut f = at_q3();
    f.set_complexity("simple").unwrap();
    f.set_context_amount("small").unwrap();
    let _ = f.submit(&FakeRecommender::failing(), &history).await;

    f.back().unwrap();
    assert_eq!(f.step(), &Step::Q2);
    assert_eq!(f.selections().q1.as_deref(), Some("bug_fixing"));
    assert_eq!(f.selections().q3, None);
  }
}
