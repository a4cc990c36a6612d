//! History screen: paged list on the left, the cursor entry on the right.

use diag_core::{recommend::Recommender, storage::Storage};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::{app::App, ui::stars};

/// Render the history screen into `area`.
pub fn draw<R: Recommender, S: Storage>(f: &mut Frame, area: Rect, app: &App<R, S>) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
    .split(area);

  draw_list(f, cols[0], app);
  draw_detail(f, cols[1], app);
}

fn draw_list<R: Recommender, S: Storage>(f: &mut Frame, area: Rect, app: &App<R, S>) {
  let title = format!(
    " History ({}) · page {}/{} ",
    app.total,
    app.page,
    app.page_count()
  );
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let mut inner = block.inner(area);
  f.render_widget(block, area);

  if (app.filter_active || !app.filter.is_empty()) && inner.height > 2 {
    let filter_area = Rect {
      y: inner.y + inner.height - 1,
      height: 1,
      ..inner
    };
    inner.height -= 1;

    let filter_text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(
      Paragraph::new(filter_text).style(Style::default().fg(Color::Yellow)),
      filter_area,
    );
  }

  if app.entries.is_empty() {
    f.render_widget(
      Paragraph::new("No diagnoses yet.").style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let items: Vec<ListItem> = app
    .entries
    .iter()
    .map(|entry| {
      let when = entry
        .created_at
        .with_timezone(&chrono::Local)
        .format("%m-%d %H:%M")
        .to_string();
      let model = entry
        .top()
        .map(|r| r.model.display_name())
        .unwrap_or_else(|| "—".to_string());
      let rated = entry
        .feedback
        .map(|r| format!("  {r}★"))
        .unwrap_or_default();

      ListItem::new(Line::from(vec![
        Span::styled(format!("{when}  "), Style::default().fg(Color::DarkGray)),
        Span::raw(model),
        Span::styled(rated, Style::default().fg(Color::Yellow)),
      ]))
    })
    .collect();

  let mut state = ListState::default();
  state.select(Some(app.history_cursor));

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner,
    &mut state,
  );
}

fn draw_detail<R: Recommender, S: Storage>(f: &mut Frame, area: Rect, app: &App<R, S>) {
  let block = Block::default()
    .title(" Detail ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let Some(entry) = app.entries.get(app.history_cursor) else {
    return;
  };

  let mut lines = vec![
    Line::from(vec![
      Span::styled("id      ", Style::default().fg(Color::Cyan)),
      Span::raw(entry.id.clone()),
    ]),
    Line::from(vec![
      Span::styled("created ", Style::default().fg(Color::Cyan)),
      Span::raw(
        entry
          .created_at
          .with_timezone(&chrono::Local)
          .format("%Y-%m-%d %H:%M:%S")
          .to_string(),
      ),
    ]),
    Line::from(vec![
      Span::styled("rating  ", Style::default().fg(Color::Cyan)),
      Span::styled(stars(entry.feedback), Style::default().fg(Color::Yellow)),
    ]),
    Line::from(""),
  ];

  for (key, label) in entry.selections.labels() {
    lines.push(Line::from(vec![
      Span::styled(format!("{:<8}", key.to_uppercase()), Style::default().fg(Color::Cyan)),
      Span::raw(label),
    ]));
  }

  if let Some(result) = &entry.result {
    lines.push(Line::from(""));
    let mut ranked: Vec<_> = result.recommendations.iter().collect();
    ranked.sort_by_key(|r| r.rank);
    for r in ranked {
      lines.push(Line::from(vec![
        Span::styled(format!("#{:<2} ", r.rank), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(r.model.display_name()),
        Span::styled(format!("  {}", r.reason), Style::default().fg(Color::DarkGray)),
      ]));
    }
  }

  f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}
