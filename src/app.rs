//! HUD frame-loop state
//!
//! Holds the per-frame snapshot, the list selection, and the quit flag. All
//! session data is read-only here; the only mutation the HUD performs is the
//! bomb affordance, which goes back through the registry.

use crate::config::Theme;
use crate::registry::{Registry, Session};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct App {
    registry: Registry,
    /// Snapshot refreshed at the top of every frame
    pub sessions: Vec<Session>,
    pub selected: usize,
    pub show_help: bool,
    pub should_quit: bool,
    pub theme: Theme,
}

impl App {
    pub fn new(registry: Registry, theme: Theme) -> Self {
        Self {
            registry,
            sessions: Vec::new(),
            selected: 0,
            show_help: false,
            should_quit: false,
            theme,
        }
    }

    /// Take a fresh registry snapshot and keep the selection in bounds
    pub fn refresh(&mut self) {
        self.sessions = self.registry.snapshot();
        if self.selected >= self.sessions.len() {
            self.selected = self.sessions.len().saturating_sub(1);
        }
    }

    /// Wall-clock milliseconds driving the subtitle cycling
    pub fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.sessions.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char('x') => {
                if let Some(session) = self.sessions.get(self.selected) {
                    self.registry.remove(&session.session_id);
                }
            }
            KeyCode::Char('?') => self.show_help = !self.show_help,
            _ => {}
        }
    }
}
