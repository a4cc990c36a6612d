//! `diag`: terminal client for the model recommendation service.
//!
//! # Usage
//!
//! ```
//! diag --url http://localhost:8000
//! diag --config ~/.config/diag/config.toml --log /tmp/diag.log
//! ```

mod app;
mod client;
mod ui;

use std::{
  fs::File,
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use diag_core::{
  history::{DEFAULT_STORAGE_KEY, HistoryStore},
  recommend::Recommender,
  storage::Storage,
};
use diag_store_sqlite::SqliteStorage;
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8000";
const DEFAULT_HISTORY: &str = "~/.local/share/diag/history.db";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "diag", about = "Find the right coding model for a task")]
struct Args {
  /// Path to a TOML config file (url, history, capacity).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the recommendation service (default: http://localhost:8000).
  #[arg(long, env = "DIAG_URL")]
  url: Option<String>,

  /// Local history database (default: ~/.local/share/diag/history.db).
  #[arg(long, env = "DIAG_HISTORY", value_name = "FILE")]
  history: Option<PathBuf>,

  /// Write logs to this file. Nothing is logged otherwise.
  #[arg(long, value_name = "FILE")]
  log: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  history:  Option<PathBuf>,
  #[serde(default)]
  capacity: Option<usize>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(path) = &args.log {
    let file = File::create(path)
      .with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(
        EnvFilter::builder()
          .with_default_directive(LevelFilter::INFO.into())
          .from_env_lossy(),
      )
      .with_ansi(false)
      .with_writer(Mutex::new(file))
      .init();
  }

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
  };
  let history_path = expand_tilde(
    &args
      .history
      .or(file_cfg.history)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY)),
  );
  let capacity = file_cfg
    .capacity
    .unwrap_or(diag_core::history::DEFAULT_CAPACITY);

  let client = ApiClient::new(api_config).context("building HTTP client")?;
  let storage = SqliteStorage::open(&history_path)
    .await
    .with_context(|| format!("opening history at {}", history_path.display()))?;
  let history = HistoryStore::with_options(storage, DEFAULT_STORAGE_KEY, capacity);
  tracing::info!(history = %history_path.display(), "starting");

  let mut app = App::new(client, history);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // A catalog failure is shown in the status bar rather than aborting.
  app.load_catalog().await;

  // Run the event loop; restore terminal even on error.
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop<R: Recommender, S: Storage>(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<R, S>,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await?
    {
      break;
    }
  }

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
