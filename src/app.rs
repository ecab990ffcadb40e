//! Terminal player front end.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::session::{SessionHandle, SessionSnapshot};
use crate::{terminal, ui, QuizError};

const MAX_ANSWER_LEN: usize = 64;

/// Presentation state layered over the latest session snapshot.
pub struct PlayerApp {
    pub snapshot: SessionSnapshot,
    answer_input: String,
    pub should_quit: bool,
}

impl PlayerApp {
    pub fn new(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot,
            answer_input: String::new(),
            should_quit: false,
        }
    }

    /// Take a newer snapshot; drops a half-typed answer once the lock is gone.
    pub fn refresh(&mut self, snapshot: SessionSnapshot) {
        if !snapshot.holds_lock() {
            self.answer_input.clear();
        }
        self.snapshot = snapshot;
    }

    pub fn answer_input(&self) -> &str {
        &self.answer_input
    }

    /// Whether keystrokes currently go into the answer box.
    pub fn is_answering(&self) -> bool {
        self.snapshot.holds_lock() && !self.snapshot.ended
    }

    /// Returns true if the app should exit.
    pub fn handle_key(&mut self, key: KeyCode, session: &SessionHandle) -> bool {
        if self.is_answering() {
            self.handle_answer_key(key, session);
        } else {
            self.handle_command_key(key, session);
        }
        self.should_quit
    }

    fn handle_answer_key(&mut self, key: KeyCode, session: &SessionHandle) {
        match key {
            KeyCode::Char(c) => {
                if self.answer_input.chars().count() < MAX_ANSWER_LEN {
                    self.answer_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.answer_input.pop();
            }
            KeyCode::Enter => {
                if !self.answer_input.is_empty() {
                    session.submit_answer(std::mem::take(&mut self.answer_input));
                }
            }
            KeyCode::Esc if self.answer_input.is_empty() => self.should_quit = true,
            KeyCode::Esc => self.answer_input.clear(),
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyCode, session: &SessionHandle) {
        match key {
            KeyCode::Char('b') | KeyCode::Char('B') | KeyCode::Char(' ') => {
                session.buzz();
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                session.request_round_start();
            }
            KeyCode::Char('m') | KeyCode::Char('M') => {
                session.request_matchmaking();
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                session.cancel_matchmaking();
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }
}

/// Run the player TUI until the user quits.
pub async fn run(session: SessionHandle) -> Result<(), QuizError> {
    let mut updates = session.subscribe();
    let mut app = PlayerApp::new(updates.borrow_and_update().clone());
    let mut term = terminal::init()?;

    let result = run_event_loop(&mut term, &mut app, &session, &mut updates);

    terminal::restore()?;
    result
}

fn run_event_loop(
    term: &mut terminal::SessionTerminal,
    app: &mut PlayerApp,
    session: &SessionHandle,
    updates: &mut tokio::sync::watch::Receiver<SessionSnapshot>,
) -> Result<(), QuizError> {
    loop {
        if updates.has_changed().unwrap_or(false) {
            app.refresh(updates.borrow_and_update().clone());
        }

        term.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key.code, session) {
                    break;
                }
            }
        }
    }

    Ok(())
}
