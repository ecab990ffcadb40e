//! In-session screen: question, lock, answer box and event log.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};

use crate::app::PlayerApp;
use crate::session::SessionSnapshot;

pub fn render(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Status
        Constraint::Length(5), // Question
        Constraint::Length(3), // Lock / answer
        Constraint::Min(5),    // Log
        Constraint::Length(2), // Controls
    ])
    .margin(1)
    .split(area);

    render_status(frame, chunks[0], &app.snapshot);
    render_question(frame, chunks[1], &app.snapshot);
    render_lock(frame, chunks[2], app);
    render_log(frame, chunks[3], &app.snapshot.log);
    render_controls(frame, chunks[4], app);
}

fn render_status(frame: &mut Frame, area: Rect, snap: &SessionSnapshot) {
    let role = if snap.is_host { "HOST" } else { "CLIENT" };
    let round = match snap.round_index {
        0 => "no round yet".to_string(),
        n => format!("Round {n}"),
    };

    let mut spans = vec![
        Span::styled(role, Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("  ·  {round}"), Style::default().fg(Color::White)),
    ];
    if snap.ended {
        spans.push(Span::styled(
            "  ·  SESSION ENDED",
            Style::default().fg(Color::Red).bold(),
        ));
    }

    let widget = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(widget, area);
}

fn render_question(frame: &mut Frame, area: Rect, snap: &SessionSnapshot) {
    let text = snap.question.as_deref().unwrap_or("Waiting for question...");
    let title = if snap.think_ms > 0 {
        format!(" Question ({:.1}s to think) ", snap.think_ms as f64 / 1000.0)
    } else {
        " Question ".to_string()
    };

    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title)
                .title_style(Style::default().fg(Color::Cyan))
                .padding(Padding::horizontal(1)),
        );

    frame.render_widget(widget, area);
}

fn render_lock(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let line = if app.is_answering() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow).bold()),
            Span::styled(app.answer_input().to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("_", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        match &app.snapshot.lock_holder {
            Some(holder) => Line::from(Span::styled(
                format!("{holder} is answering"),
                Style::default().fg(Color::Magenta),
            )),
            None => Line::from(Span::styled(
                "Lock is open",
                Style::default().fg(Color::Green),
            )),
        }
    };

    let title = if app.is_answering() { " Your answer " } else { " Lock " };
    let widget = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(title)
            .title_style(Style::default().fg(Color::Cyan))
            .padding(Padding::horizontal(1)),
    );

    frame.render_widget(widget, area);
}

fn render_log(frame: &mut Frame, area: Rect, log: &[String]) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = log
        .iter()
        .skip(log.len().saturating_sub(visible))
        .map(|entry| Line::from(entry.as_str()).fg(Color::Gray))
        .collect();

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Log ")
            .title_style(Style::default().fg(Color::Cyan))
            .padding(Padding::horizontal(1)),
    );

    frame.render_widget(widget, area);
}

fn render_controls(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let help = if app.is_answering() {
        "type your answer  ·  Enter submit  ·  Esc clear"
    } else if app.snapshot.is_host {
        "Space/b buzz  ·  s next round  ·  q quit"
    } else {
        "Space/b buzz  ·  q quit"
    };

    let widget = Paragraph::new(help)
        .alignment(Alignment::Center)
        .fg(Color::DarkGray);

    frame.render_widget(widget, area);
}
