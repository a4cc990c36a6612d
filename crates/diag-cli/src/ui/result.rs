//! Recommendation screen: ranked list on the left, detail of the
//! highlighted model on the right.

use diag_core::{
  recommend::{RecommendResult, Recommender},
  storage::Storage,
};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::{app::App, ui::stars};

/// Render the result screen into `area`.
pub fn draw<R: Recommender, S: Storage>(f: &mut Frame, area: Rect, app: &App<R, S>) {
  let Some(view) = &app.result else {
    return;
  };
  let response = &view.response;

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(5), Constraint::Min(0)])
    .split(area);

  // Answers and rating.
  let mut summary: Vec<Line> = response
    .selections
    .labels()
    .into_iter()
    .map(|(key, label)| {
      Line::from(vec![
        Span::styled(format!("{:<4}", key.to_uppercase()), Style::default().fg(Color::Cyan)),
        Span::raw(label),
      ])
    })
    .collect();
  summary.push(Line::from(vec![
    Span::styled("Rating ", Style::default().fg(Color::Cyan)),
    Span::styled(stars(view.feedback), Style::default().fg(Color::Yellow)),
  ]));
  let block = Block::default()
    .title(format!(" Diagnosis {} ", response.diagnosis_id))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(rows[0]);
  f.render_widget(block, rows[0]);
  f.render_widget(Paragraph::new(summary), inner);

  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
    .split(rows[1]);

  let mut ranked: Vec<&RecommendResult> = response.recommendations.iter().collect();
  ranked.sort_by_key(|r| r.rank);

  let items: Vec<ListItem> = ranked
    .iter()
    .map(|r| {
      ListItem::new(Line::from(vec![
        Span::styled(
          format!("#{:<2} ", r.rank),
          Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(r.model.display_name()),
        Span::styled(
          format!("  {:.0}%", r.score * 100.0),
          Style::default().fg(Color::DarkGray),
        ),
      ]))
    })
    .collect();

  let mut state = ListState::default();
  state.select((!ranked.is_empty()).then_some(app.result_cursor));
  f.render_stateful_widget(
    List::new(items)
      .block(
        Block::default()
          .title(" Recommended models ")
          .borders(Borders::ALL)
          .border_style(Style::default().fg(Color::DarkGray)),
      )
      .highlight_style(
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD),
      ),
    cols[0],
    &mut state,
  );

  let detail = Block::default()
    .title(" Why ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = detail.inner(cols[1]);
  f.render_widget(detail, cols[1]);

  if let Some(r) = ranked.get(app.result_cursor) {
    f.render_widget(
      Paragraph::new(detail_lines(r)).wrap(Wrap { trim: true }),
      inner,
    );
  }
}

fn detail_lines(r: &RecommendResult) -> Vec<Line<'static>> {
  let model = &r.model;
  let mut lines = vec![
    Line::from(Span::styled(
      model.display_name(),
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(r.reason.clone()),
  ];

  if let Some(caution) = &r.caution {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      format!("⚠ {caution}"),
      Style::default().fg(Color::Yellow),
    )));
  }

  let facts = [
    ("provider", model.provider.clone()),
    ("cost", model.cost_tier.clone()),
    (
      "context",
      if model.context_window > 0 {
        format!("{} tokens", model.context_window)
      } else {
        String::new()
      },
    ),
    ("strengths", model.strengths.join(", ")),
    ("best for", model.best_for.join(", ")),
  ];
  let facts: Vec<_> = facts.into_iter().filter(|(_, v)| !v.is_empty()).collect();
  if !facts.is_empty() {
    lines.push(Line::from(""));
  }
  for (label, value) in facts {
    lines.push(Line::from(vec![
      Span::styled(format!("{label:<10}"), Style::default().fg(Color::Cyan)),
      Span::raw(value),
    ]));
  }

  lines
}
