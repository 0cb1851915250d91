use ratatui::style::{Color, Modifier, Style};

use crate::core::models::{Argb, ScanOutcome};

// Card palette
pub const CARD_FRAME: Color = Color::LightBlue;
pub const SWATCH_FRAME: Color = Color::Gray;
pub const FIELD_LABEL: Color = Color::LightBlue;
pub const FIELD_VALUE: Color = Color::White;
pub const HINT: Color = Color::DarkGray;
pub const STATUS: Color = Color::LightCyan;

pub const READ_OK: Color = Color::LightGreen;
pub const AUTH_FAILED: Color = Color::LightYellow;
pub const READ_ERROR: Color = Color::LightRed;

pub fn style_card_frame() -> Style {
    Style::default().fg(CARD_FRAME)
}

pub fn style_swatch_frame() -> Style {
    Style::default().fg(SWATCH_FRAME)
}

pub fn style_label() -> Style {
    Style::default().fg(FIELD_LABEL).add_modifier(Modifier::BOLD)
}

pub fn style_value() -> Style {
    Style::default().fg(FIELD_VALUE)
}

pub fn style_hint() -> Style {
    Style::default().fg(HINT)
}

pub fn style_status() -> Style {
    Style::default().fg(STATUS).add_modifier(Modifier::ITALIC)
}

/// Color of the outcome line under the swatch.
pub fn style_outcome(outcome: &ScanOutcome) -> Style {
    match outcome {
        ScanOutcome::Decoded(_) => Style::default().fg(READ_OK),
        ScanOutcome::AuthenticationFailed => Style::default().fg(AUTH_FAILED),
        ScanOutcome::ReadError(_) => Style::default().fg(READ_ERROR).add_modifier(Modifier::BOLD),
    }
}

/// Terminal color for a filament swatch. Terminals have no alpha channel.
pub fn swatch(color: Argb) -> Color {
    Color::Rgb(color.red(), color.green(), color.blue())
}
