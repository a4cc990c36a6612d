//! TUI rendering for all screens.

pub mod history;
pub mod result;
pub mod wizard;

use chrono::Local;
use diag_core::{recommend::Recommender, storage::Storage};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::{App, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<R: Recommender, S: Storage>(f: &mut Frame, app: &App<R, S>) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0]);
  match app.screen {
    Screen::Diagnose => wizard::draw(f, rows[1], app),
    Screen::Result => result::draw(f, rows[1], app),
    Screen::History => history::draw(f, rows[1], app),
  }
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect) {
  let date = Local::now().format("%Y-%m-%d").to_string();

  let left = Span::styled(
    " diag  [n] new  [H] history  [q] quit",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{date} "),
    Style::default().fg(Color::DarkGray),
  );

  let pad = area
    .width
    .saturating_sub(left.width() as u16)
    .saturating_sub(right.width() as u16);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<R: Recommender, S: Storage>(f: &mut Frame, area: Rect, app: &App<R, S>) {
  let (mode_label, hints) = match app.screen {
    Screen::History if app.filter_active => (
      "SEARCH",
      "Type to filter  Esc cancel  Enter keep",
    ),
    Screen::Diagnose => (
      "DIAGNOSE",
      "↑↓/jk move  Enter select  Space toggle  s submit  Esc back",
    ),
    Screen::Result => (
      "RESULT",
      "↑↓/jk move  1-5 rate  Esc back",
    ),
    Screen::History => (
      "HISTORY",
      "↑↓/jk move  Enter open  [ ] page  / filter  1-5 rate  d delete  D clear",
    ),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}

/// A star bar for a 1–5 rating.
pub(crate) fn stars(rating: Option<diag_core::history::Rating>) -> String {
  match rating {
    Some(r) => {
      let n = usize::from(r.get());
      format!("{}{}", "★".repeat(n), "☆".repeat(5 - n))
    }
    None => "unrated".to_string(),
  }
}
