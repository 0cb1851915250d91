use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Frame;

use crate::core::scan_service::ScanReport;
use crate::error::Result;
use crate::ui::screens::spool_card::SpoolCard;
use crate::ui::{Action, Component};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Produces a fresh scan each time the user asks for one.
pub type Scanner = Box<dyn FnMut() -> Result<ScanReport>>;

pub struct App {
    scanner: Scanner,
    card: SpoolCard,
    running: bool,
}

impl App {
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            card: SpoolCard::new(),
            running: true,
        }
    }

    /// Start with a report that was already taken.
    pub fn with_report(scanner: Scanner, report: ScanReport) -> Self {
        let mut app = Self::new(scanner);
        app.card.set_report(report);
        app
    }

    pub fn run(&mut self, terminal: &mut ratatui::DefaultTerminal) -> io::Result<()> {
        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            // Expire status messages
            self.card.tick();

            if event::poll(TICK_RATE)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        let action = self.card.handle_key(key);
                        self.handle_action(action);
                    }
                }
            }
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        self.card.render(frame, area);
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Quit => self.running = false,
            Action::Rescan => match (self.scanner)() {
                Ok(report) => {
                    let headline = report.outcome.display_record().name;
                    self.card.set_report(report);
                    self.card.set_status(format!("Rescanned: {headline}"));
                }
                Err(e) => self.card.set_status(format!("Scan failed: {e}")),
            },
        }
    }
}
