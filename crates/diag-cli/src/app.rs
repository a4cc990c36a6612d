//! Application state machine and event dispatcher.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use diag_core::{
  catalog::{Catalog, ChartOption, Q3Field},
  flow::{DiagnosticFlow, Step},
  history::{DiagnosisHistory, HistoryStore, Rating},
  recommend::{RecommendResponse, Recommender},
  storage::Storage,
};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

/// History entries shown per page.
pub const PAGE_SIZE: usize = 15;

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// The three-question wizard.
  Diagnose,
  /// Ranked recommendations for one diagnosis.
  Result,
  /// Paged list of past diagnoses.
  History,
}

/// The diagnosis shown on the result screen.
#[derive(Debug, Clone)]
pub struct ResultView {
  pub response: RecommendResponse,
  pub feedback: Option<Rating>,
  /// Screen that `Esc` returns to.
  pub origin:   Screen,
}

/// Every selectable question-3 option, in catalog order.
pub fn q3_rows(flow: &DiagnosticFlow) -> Vec<(Q3Field, &ChartOption)> {
  flow
    .catalog()
    .sub_questions()
    .iter()
    .flat_map(|sub| sub.options.iter().map(move |o| (sub.id, o)))
    .collect()
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<R, S> {
  pub screen: Screen,

  /// `None` until the question catalog has been fetched.
  pub flow: Option<DiagnosticFlow>,

  /// Cursor within the wizard's current option list.
  pub cursor: usize,

  pub result: Option<ResultView>,

  /// Highlighted recommendation on the result screen.
  pub result_cursor: usize,

  /// 1-based history page.
  pub page: usize,

  /// Entries on the current history page (after filtering).
  pub entries: Vec<DiagnosisHistory>,

  /// Number of entries across all pages (after filtering).
  pub total: usize,

  pub history_cursor: usize,

  /// Current fuzzy-filter string.
  pub filter: String,

  /// Whether the user is typing a filter query.
  pub filter_active: bool,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  pub recommender: Arc<R>,
  pub history: HistoryStore<S>,
}

impl<R, S> App<R, S>
where
  R: Recommender,
  S: Storage,
{
  pub fn new(recommender: R, history: HistoryStore<S>) -> Self {
    Self {
      screen: Screen::Diagnose,
      flow: None,
      cursor: 0,
      result: None,
      result_cursor: 0,
      page: 1,
      entries: Vec::new(),
      total: 0,
      history_cursor: 0,
      filter: String::new(),
      filter_active: false,
      status_msg: String::new(),
      recommender: Arc::new(recommender),
      history,
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Fetch and validate the question catalog, starting a fresh run on
  /// success. Failure leaves the wizard unavailable and says why.
  pub async fn load_catalog(&mut self) {
    self.status_msg = "Loading questions…".into();
    let loaded = match self.recommender.fetch_catalog().await {
      Ok(data) => Catalog::try_from(data).map_err(|e| e.to_string()),
      Err(e) => Err(e.to_string()),
    };
    match loaded {
      Ok(catalog) => {
        tracing::info!(version = %catalog.version, "loaded question catalog");
        self.flow = Some(DiagnosticFlow::new(catalog));
        self.cursor = 0;
        self.status_msg.clear();
      }
      Err(msg) => {
        tracing::error!(error = %msg, "failed to load question catalog");
        self.status_msg = format!("Could not load questions: {msg}");
      }
    }
  }

  /// Reload the visible history page. With a filter set, the whole history
  /// is matched and the matches are paged instead.
  pub async fn refresh_history(&mut self) {
    if let Err(e) = self.load_history_page().await {
      self.status_msg = format!("Error: {e}");
    }
  }

  async fn load_history_page(&mut self) -> diag_core::Result<()> {
    if self.filter.is_empty() {
      let mut page = self.history.read_page(self.page, PAGE_SIZE).await?;
      // Deleting the last entry on a page can leave it empty.
      if page.items.is_empty() && self.page > 1 {
        self.page = page.total.div_ceil(PAGE_SIZE).max(1);
        page = self.history.read_page(self.page, PAGE_SIZE).await?;
      }
      self.entries = page.items;
      self.total = page.total;
    } else {
      let matcher = SkimMatcherV2::default();
      let matches: Vec<_> = self
        .history
        .read_all()
        .await?
        .into_iter()
        .filter(|h| matcher.fuzzy_match(&search_text(h), &self.filter).is_some())
        .collect();
      self.total = matches.len();
      self.page = self.page.min(self.page_count());
      self.entries = matches
        .into_iter()
        .skip((self.page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();
    }

    self.history_cursor = self
      .history_cursor
      .min(self.entries.len().saturating_sub(1));
    Ok(())
  }

  pub fn page_count(&self) -> usize { self.total.div_ceil(PAGE_SIZE).max(1) }

  /// Number of rows the wizard cursor can move over.
  pub fn option_count(&self) -> usize {
    match &self.flow {
      Some(flow) => match flow.step() {
        Step::Q1 | Step::Q2 => flow.current_options().len(),
        Step::Q3 | Step::Failed { .. } => q3_rows(flow).len(),
        _ => 0,
      },
      None => 0,
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if self.filter_active {
      self.handle_filter_key(key).await;
      return Ok(true);
    }

    match key.code {
      KeyCode::Char('q') => return Ok(false),
      KeyCode::Char('H') => {
        self.open_history().await;
        return Ok(true);
      }
      KeyCode::Char('n') => {
        self.new_diagnosis().await;
        return Ok(true);
      }
      _ => {}
    }

    match self.screen {
      Screen::Diagnose => self.handle_diagnose_key(key).await,
      Screen::Result => self.handle_result_key(key).await,
      Screen::History => self.handle_history_key(key).await,
    }
    Ok(true)
  }

  async fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
      }
      KeyCode::Enter => {
        self.filter_active = false;
        return;
      }
      KeyCode::Backspace => {
        self.filter.pop();
      }
      KeyCode::Char(c) => self.filter.push(c),
      _ => return,
    }
    self.page = 1;
    self.history_cursor = 0;
    self.refresh_history().await;
  }

  async fn handle_diagnose_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => {
        if self.cursor + 1 < self.option_count() {
          self.cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.cursor = self.cursor.saturating_sub(1);
      }
      KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Right | KeyCode::Char('l') => {
        self.activate();
      }
      KeyCode::Char('s') => self.submit().await,
      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        if let Some(flow) = self.flow.as_mut()
          && flow.back().is_ok()
        {
          self.cursor = 0;
          self.status_msg.clear();
        }
      }
      _ => {}
    }
  }

  async fn handle_result_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self
          .result
          .as_ref()
          .map_or(0, |r| r.response.recommendations.len());
        if self.result_cursor + 1 < len {
          self.result_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.result_cursor = self.result_cursor.saturating_sub(1);
      }
      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        match self.result.as_ref().map(|r| r.origin) {
          Some(Screen::History) => self.open_history().await,
          _ => self.new_diagnosis().await,
        }
      }
      KeyCode::Char(c @ '1'..='5') => {
        if let Some(id) = self.result.as_ref().map(|r| r.response.diagnosis_id.clone()) {
          self.rate(&id, c).await;
        }
      }
      _ => {}
    }
  }

  async fn handle_history_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Down | KeyCode::Char('j') => {
        if self.history_cursor + 1 < self.entries.len() {
          self.history_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.history_cursor = self.history_cursor.saturating_sub(1);
      }
      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(entry) = self.entries.get(self.history_cursor) {
          let view = ResultView {
            response: entry.to_response(),
            feedback: entry.feedback,
            origin:   Screen::History,
          };
          self.show_result(view);
        }
      }
      KeyCode::Char(']') | KeyCode::PageDown => {
        if self.page < self.page_count() {
          self.page += 1;
          self.history_cursor = 0;
          self.refresh_history().await;
        }
      }
      KeyCode::Char('[') | KeyCode::PageUp => {
        if self.page > 1 {
          self.page -= 1;
          self.history_cursor = 0;
          self.refresh_history().await;
        }
      }
      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
      }
      KeyCode::Char('d') => {
        if let Some(id) = self.cursor_entry_id() {
          match self.history.remove(&id).await {
            Ok(()) => self.status_msg = format!("Deleted {id}"),
            Err(e) => self.status_msg = format!("Error: {e}"),
          }
          self.refresh_history().await;
        }
      }
      KeyCode::Char('D') => {
        match self.history.clear().await {
          Ok(()) => self.status_msg = "History cleared".into(),
          Err(e) => self.status_msg = format!("Error: {e}"),
        }
        self.page = 1;
        self.history_cursor = 0;
        self.refresh_history().await;
      }
      KeyCode::Char(c @ '1'..='5') => {
        if let Some(id) = self.cursor_entry_id() {
          self.rate(&id, c).await;
        }
      }
      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        if self.filter.is_empty() {
          self.screen = Screen::Diagnose;
        } else {
          self.filter.clear();
          self.page = 1;
          self.history_cursor = 0;
          self.refresh_history().await;
        }
      }
      _ => {}
    }
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  /// Answer the option under the cursor.
  fn activate(&mut self) {
    let Some(flow) = self.flow.as_mut() else {
      return;
    };

    let outcome = match flow.step() {
      Step::Q1 | Step::Q2 => {
        let Some(id) = flow.current_options().get(self.cursor).map(|o| o.id.clone())
        else {
          self.status_msg = "No options for this category; press Esc to go back".into();
          return;
        };
        let res = if *flow.step() == Step::Q1 {
          flow.select_q1(&id)
        } else {
          flow.select_q2(&id)
        };
        if res.is_ok() {
          self.cursor = 0;
        }
        res
      }
      Step::Q3 | Step::Failed { .. } => {
        let Some((field, id)) = q3_rows(flow)
          .get(self.cursor)
          .map(|(field, o)| (*field, o.id.clone()))
        else {
          return;
        };
        flow.choose(field, &id)
      }
      Step::Submitting | Step::Done { .. } => return,
    };

    match outcome {
      Ok(()) => self.status_msg.clear(),
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn submit(&mut self) {
    let Some(flow) = self.flow.as_mut() else {
      return;
    };
    if !flow.can_submit() {
      self.status_msg = "Choose a complexity and a context amount first".into();
      return;
    }

    match flow.submit(self.recommender.as_ref(), &self.history).await {
      Ok(response) => {
        self.status_msg.clear();
        self.show_result(ResultView {
          response,
          feedback: None,
          origin: Screen::Diagnose,
        });
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  /// Record a rating locally, then report it to the recommender. A remote
  /// failure only changes the status message.
  async fn rate(&mut self, id: &str, digit: char) {
    let Some(rating) = digit
      .to_digit(10)
      .and_then(|d| Rating::new(i64::from(d)).ok())
    else {
      return;
    };

    match self.history.update_feedback(id, rating).await {
      Ok(true) => {}
      Ok(false) => tracing::debug!(%id, "rated diagnosis is not in local history"),
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        return;
      }
    }
    if let Some(view) = self
      .result
      .as_mut()
      .filter(|v| v.response.diagnosis_id == id)
    {
      view.feedback = Some(rating);
    }

    self.status_msg = match self.recommender.submit_feedback(id, rating).await {
      Ok(()) => format!("Rated {rating}/5"),
      Err(e) => {
        tracing::warn!(%id, error = %e, "failed to send feedback");
        format!("Rated {rating}/5 locally; sending feedback failed: {e}")
      }
    };

    if self.screen == Screen::History {
      self.refresh_history().await;
    }
  }

  async fn open_history(&mut self) {
    self.screen = Screen::History;
    self.refresh_history().await;
  }

  /// Start a new run, fetching the catalog again if it never loaded.
  async fn new_diagnosis(&mut self) {
    self.screen = Screen::Diagnose;
    self.result = None;
    self.cursor = 0;
    match self.flow.as_ref().map(|f| f.catalog().clone()) {
      Some(catalog) => {
        self.flow = Some(DiagnosticFlow::new(catalog));
        self.status_msg.clear();
      }
      None => self.load_catalog().await,
    }
  }

  fn show_result(&mut self, view: ResultView) {
    self.result = Some(view);
    self.result_cursor = 0;
    self.screen = Screen::Result;
  }

  fn cursor_entry_id(&self) -> Option<String> {
    self.entries.get(self.history_cursor).map(|e| e.id.clone())
  }
}

/// Text a history entry is fuzzy-matched against.
fn search_text(entry: &DiagnosisHistory) -> String {
  let mut parts: Vec<String> = entry
    .selections
    .labels()
    .into_iter()
    .map(|(_, label)| label)
    .collect();
  if let Some(top) = entry.top() {
    parts.push(top.model.display_name());
  }
  parts.push(entry.id.clone());
  parts.join(" ")
}
