//! Questionnaire screen.

use diag_core::{
  catalog::Q3Field,
  flow::{DiagnosticFlow, Step},
  recommend::Recommender,
  storage::Storage,
};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, q3_rows};

/// Render the wizard into `area`.
pub fn draw<R: Recommender, S: Storage>(f: &mut Frame, area: Rect, app: &App<R, S>) {
  let Some(flow) = &app.flow else {
    let block = Block::default()
      .title(" Diagnose ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
      Paragraph::new("Questions are not available. Press n to retry or H for history.")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true }),
      inner,
    );
    return;
  };

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(4), Constraint::Min(0)])
    .split(area);

  draw_progress(f, rows[0], flow);

  let block = Block::default()
    .title(format!(" Question {} of 3 ", flow.step().number()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(rows[1]);
  f.render_widget(block, rows[1]);

  match flow.step() {
    Step::Q1 | Step::Q2 => draw_single(f, inner, flow, app.cursor),
    Step::Q3 | Step::Failed { .. } => draw_q3(f, inner, flow, app.cursor),
    Step::Submitting => f.render_widget(Paragraph::new("Requesting recommendations…"), inner),
    Step::Done { .. } => f.render_widget(
      Paragraph::new("Diagnosis complete. Press n for a new one.")
        .style(Style::default().fg(Color::DarkGray)),
      inner,
    ),
  }
}

/// Answers given so far.
fn draw_progress(f: &mut Frame, area: Rect, flow: &DiagnosticFlow) {
  let mut lines: Vec<Line> = flow
    .selections()
    .labels()
    .into_iter()
    .map(|(key, label)| {
      Line::from(vec![
        Span::styled(
          format!("{:<4}", key.to_uppercase()),
          Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(label),
      ])
    })
    .collect();

  if let Step::Failed { message } = flow.step() {
    lines.push(Line::from(Span::styled(
      format!("Request failed: {message}. Press s to retry."),
      Style::default().fg(Color::Red),
    )));
  }

  f.render_widget(Paragraph::new(lines), area);
}

fn draw_single(f: &mut Frame, area: Rect, flow: &DiagnosticFlow, cursor: usize) {
  let question = match flow.step() {
    Step::Q1 => &flow.catalog().q1_question,
    _ => &flow.catalog().q2_question,
  };
  let options = flow.current_options();

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(2), Constraint::Min(0)])
    .split(area);

  f.render_widget(
    Paragraph::new(question.as_str()).style(Style::default().add_modifier(Modifier::BOLD)),
    rows[0],
  );

  if options.is_empty() {
    f.render_widget(
      Paragraph::new("No options for this category.")
        .style(Style::default().fg(Color::DarkGray)),
      rows[1],
    );
    return;
  }

  let items: Vec<ListItem> = options
    .iter()
    .map(|o| {
      let mut spans = vec![Span::raw(o.label.clone())];
      if let Some(desc) = &o.description {
        spans.push(Span::styled(
          format!("  {desc}"),
          Style::default().fg(Color::DarkGray),
        ));
      }
      ListItem::new(Line::from(spans))
    })
    .collect();

  render_list(f, rows[1], items, cursor);
}

fn draw_q3(f: &mut Frame, area: Rect, flow: &DiagnosticFlow, cursor: usize) {
  let mut items = Vec::new();
  let mut last_field: Option<Q3Field> = None;
  // Header lines are not selectable, so track the list row of the cursor.
  let mut selected = 0;

  for (i, (field, option)) in q3_rows(flow).into_iter().enumerate() {
    if last_field != Some(field) {
      let heading = flow
        .catalog()
        .sub_question(field)
        .map_or_else(|| field.to_string(), |q| q.question.clone());
      items.push(ListItem::new(Line::from(Span::styled(
        heading,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
      ))));
      last_field = Some(field);
    }

    let mark = match (field, flow.is_chosen(field, &option.id)) {
      (Q3Field::Priority, true) => "[x] ",
      (Q3Field::Priority, false) => "[ ] ",
      (_, true) => "(•) ",
      (_, false) => "( ) ",
    };
    if i == cursor {
      selected = items.len();
    }
    items.push(ListItem::new(Line::from(vec![
      Span::raw("  "),
      Span::raw(mark),
      Span::raw(option.label.clone()),
    ])));
  }

  let submit_hint = if flow.can_submit() {
    Span::styled("Press s to submit", Style::default().fg(Color::Green))
  } else {
    Span::styled(
      "Complexity and context amount are required",
      Style::default().fg(Color::DarkGray),
    )
  };
  items.push(ListItem::new(Line::from("")));
  items.push(ListItem::new(Line::from(submit_hint)));

  render_list(f, area, items, selected);
}

fn render_list(f: &mut Frame, area: Rect, items: Vec<ListItem>, selected: usize) {
  let mut state = ListState::default();
  state.select(Some(selected));

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    area,
    &mut state,
  );
}
