use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::core::models::ScanOutcome;
use crate::core::scan_service::ScanReport;
use crate::ui::theme;
use crate::ui::{Action, Component};

const STATUS_DISPLAY_SECS: u64 = 3;

/// Shows the last scanned spool: UID, filament name and a color swatch.
pub struct SpoolCard {
    report: Option<ScanReport>,
    status_message: Option<(String, Instant)>,
}

impl Default for SpoolCard {
    fn default() -> Self {
        Self::new()
    }
}

impl SpoolCard {
    pub fn new() -> Self {
        Self {
            report: None,
            status_message: None,
        }
    }

    pub fn set_report(&mut self, report: ScanReport) {
        self.report = Some(report);
    }

    pub fn report(&self) -> Option<&ScanReport> {
        self.report.as_ref()
    }

    pub fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has expired.
    pub fn tick(&mut self) {
        if let Some((_, set_at)) = &self.status_message {
            if set_at.elapsed().as_secs() >= STATUS_DISPLAY_SECS {
                self.status_message = None;
            }
        }
    }

    fn outcome_line(outcome: &ScanOutcome) -> Line<'static> {
        let text = match outcome {
            ScanOutcome::Decoded(_) => "Read OK".to_string(),
            ScanOutcome::AuthenticationFailed => "No derived key opened the spool sector".to_string(),
            ScanOutcome::ReadError(reason) => format!("Read error: {reason}"),
        };
        Line::from(Span::styled(text, theme::style_outcome(outcome)))
    }
}

impl Component for SpoolCard {
    fn handle_key(&mut self, key: KeyEvent) -> Action {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Action::Quit,
            (KeyCode::Char('r'), _) | (KeyCode::Enter, _) => Action::Rescan,
            _ => Action::None,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Clear, area);

        let box_width = 48u16.min(area.width.saturating_sub(2));
        let box_height = 13u16.min(area.height);

        let vertical = Layout::vertical([Constraint::Length(box_height)]).flex(Flex::Center);
        let horizontal = Layout::horizontal([Constraint::Length(box_width)]).flex(Flex::Center);
        let [vert_area] = vertical.areas(area);
        let [center_area] = horizontal.areas(vert_area);

        let block = Block::default()
            .title(" Spool ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(theme::style_card_frame());

        let inner = block.inner(center_area);
        frame.render_widget(block, center_area);

        let chunks = Layout::vertical([
            Constraint::Length(1), // UID
            Constraint::Length(1), // Name
            Constraint::Length(1), // Color value
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Swatch
            Constraint::Length(1), // Outcome / status
            Constraint::Min(0),    // Hint
        ])
        .split(inner);

        let Some(report) = &self.report else {
            let waiting = Paragraph::new("Ready to scan an NFC tag.")
                .alignment(Alignment::Center)
                .style(theme::style_hint());
            frame.render_widget(waiting, chunks[1]);
            return;
        };

        let record = report.outcome.display_record();
        let field = |label: &'static str, value: String| {
            Paragraph::new(Line::from(vec![
                Span::styled(label, theme::style_label()),
                Span::styled(value, theme::style_value()),
            ]))
        };
        frame.render_widget(field("Tag UID: ", report.uid.to_string()), chunks[0]);
        frame.render_widget(field("Filament Name: ", record.name.clone()), chunks[1]);
        frame.render_widget(field("Filament Color: ", record.color.to_string()), chunks[2]);

        let swatch_width = 10u16.min(chunks[4].width);
        let [swatch_area] = Layout::horizontal([Constraint::Length(swatch_width)])
            .flex(Flex::Start)
            .areas(chunks[4]);
        let swatch = Block::default()
            .borders(Borders::ALL)
            .border_style(theme::style_swatch_frame())
            .style(Style::default().bg(theme::swatch(record.color)));
        frame.render_widget(swatch, swatch_area);

        let status = match &self.status_message {
            Some((msg, _)) => Line::from(Span::styled(msg.clone(), theme::style_status())),
            None => Self::outcome_line(&report.outcome),
        };
        frame.render_widget(Paragraph::new(status), chunks[5]);

        let hint = Paragraph::new("r rescan  |  q/Esc quit")
            .alignment(Alignment::Center)
            .style(theme::style_hint());
        frame.render_widget(hint, chunks[6]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Argb, SpoolRecord, TagUid};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn rendered(card: &SpoolCard) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                card.render(frame, area);
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_waiting_message_before_first_scan() {
        let card = SpoolCard::new();
        assert!(rendered(&card).contains("Ready to scan an NFC tag."));
    }

    #[test]
    fn test_renders_decoded_record() {
        let mut card = SpoolCard::new();
        card.set_report(ScanReport {
            uid: TagUid::new(vec![0x04, 0xa1, 0xb2, 0xc3]),
            outcome: ScanOutcome::Decoded(SpoolRecord::new("PLA", Argb(0xFFFF_0000))),
        });

        let screen = rendered(&card);
        assert!(screen.contains("Tag UID: 04A1B2C3"));
        assert!(screen.contains("Filament Name: PLA"));
        assert!(screen.contains("#FFFF0000"));
        assert!(screen.contains("Read OK"));
    }

    #[test]
    fn test_renders_authentication_failure() {
        let mut card = SpoolCard::new();
        card.set_report(ScanReport {
            uid: TagUid::new(vec![0x01, 0x02, 0x03, 0x04]),
            outcome: ScanOutcome::AuthenticationFailed,
        });

        let screen = rendered(&card);
        assert!(screen.contains("Authentication Failed"));
        assert!(screen.contains("#FF000000"));
    }

    #[test]
    fn test_key_bindings() {
        let mut card = SpoolCard::new();
        assert_eq!(card.handle_key(key(KeyCode::Char('r'))), Action::Rescan);
        assert_eq!(card.handle_key(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(card.handle_key(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(card.handle_key(key(KeyCode::Char('x'))), Action::None);
    }
}
