//! Waiting screen shown until an opponent connects.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::PlayerApp;
use crate::session::MatchStatus;

pub fn render(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(11),
        Constraint::Fill(1),
    ])
    .split(area);

    let status = &app.snapshot.match_status;
    let status_style = match status {
        MatchStatus::Searching => Style::default().fg(Color::Yellow),
        MatchStatus::Matched => Style::default().fg(Color::Green),
        MatchStatus::Idle => Style::default().fg(Color::White),
        _ => Style::default().fg(Color::Red),
    };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "BUZZ QUIZ",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("You are ", Style::default().fg(Color::White)),
            Span::styled(
                app.snapshot.local_id.to_string(),
                Style::default().fg(Color::Green).bold(),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Matchmaking: ", Style::default().fg(Color::DarkGray)),
            Span::styled(status.label().to_string(), status_style),
        ]),
        Line::from(""),
        Line::from(""),
        Line::from("[M] find opponent  ·  [C] cancel  ·  [Q] quit".fg(Color::DarkGray)),
        Line::from(""),
    ];

    let widget = Paragraph::new(content).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Color::DarkGray),
    );

    frame.render_widget(widget, chunks[1]);
}
