pub mod app;
pub mod screens;
pub mod theme;

use crossterm::event::KeyEvent;
use ratatui::Frame;

/// Actions emitted by UI components, dispatched by App.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Rescan,

    // No-op
    None,
}

/// Trait implemented by all UI components.
pub trait Component {
    fn handle_key(&mut self, key: KeyEvent) -> Action;
    fn render(&self, frame: &mut Frame, area: ratatui::layout::Rect);
}
