//! Player TUI rendering.

mod lobby;
mod round;

use ratatui::{prelude::*, widgets::Block};

use crate::app::PlayerApp;

pub fn render(frame: &mut Frame, app: &PlayerApp) {
    let area = frame.area();
    frame.render_widget(Block::default().bg(Color::Reset), area);

    if app.snapshot.remotes.is_empty() && !app.snapshot.ended {
        lobby::render(frame, area, app);
    } else {
        round::render(frame, area, app);
    }
}
