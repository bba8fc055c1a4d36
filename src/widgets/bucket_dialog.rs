use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget},
};

use crate::config::Theme;
use crate::render::layout::centered_rect_fixed;
use crate::widgets::text_input::{TextInput, TextInputEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketDialogEvent {
    None,
    /// Enter with a valid entry; `None` when the field was left empty.
    Submit(Option<usize>),
    Cancel,
}

/// Prompt for a new X bucket count.
#[derive(Default)]
pub struct BucketDialog {
    pub active: bool,
    current: usize,
    max: usize,
    input: TextInput,
    error: Option<String>,
}

impl BucketDialog {
    pub fn new(theme: &Theme) -> Self {
        Self {
            input: TextInput::new().with_theme(theme),
            ..Default::default()
        }
    }

    pub fn open(&mut self, current: usize, max: usize) {
        self.active = true;
        self.current = current;
        self.max = max;
        self.error = None;
        self.input.set_value(current.to_string());
        self.input.set_focused(true);
    }

    pub fn close(&mut self) {
        self.active = false;
        self.error = None;
        self.input.set_focused(false);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Parses the field: empty means no change, otherwise a count in `1..=max`.
    pub fn bucket_count(&self) -> Result<Option<usize>, String> {
        let text = self.input.value().trim();
        if text.is_empty() {
            return Ok(None);
        }
        match text.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.max => Ok(Some(n)),
            _ => Err(format!("Enter a number between 1 and {}", self.max)),
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> BucketDialogEvent {
        match self.input.handle_key(event) {
            TextInputEvent::Cancel => {
                self.close();
                BucketDialogEvent::Cancel
            }
            TextInputEvent::Submit => match self.bucket_count() {
                Ok(count) => {
                    self.close();
                    BucketDialogEvent::Submit(count)
                }
                Err(message) => {
                    self.error = Some(message);
                    BucketDialogEvent::None
                }
            },
            TextInputEvent::None => {
                self.error = None;
                BucketDialogEvent::None
            }
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let popup = centered_rect_fixed(area, 44, 7);
        Clear.render(popup, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title("Buckets")
            .border_style(Style::default().fg(theme.get("modal_border_active")));
        let inner = block.inner(popup);
        block.render(popup, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);
        Paragraph::new(format!("Bucket count (now {}, max {}):", self.current, self.max))
            .style(Style::default().fg(theme.get("text_primary")))
            .render(rows[0], buf);
        (&self.input).render(rows[1], buf);
        let (text, color) = match &self.error {
            Some(message) => (message.as_str(), theme.get("error")),
            None => ("Enter apply  Esc cancel", theme.get("text_secondary")),
        };
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .render(rows[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn dialog() -> BucketDialog {
        let mut d = BucketDialog::new(&Theme::default());
        d.open(20, 100);
        d
    }

    #[test]
    fn submit_new_count() {
        let mut d = dialog();
        d.handle_key(&key(KeyCode::Backspace));
        d.handle_key(&key(KeyCode::Backspace));
        d.handle_key(&key(KeyCode::Char('7')));
        assert_eq!(d.handle_key(&key(KeyCode::Enter)), BucketDialogEvent::Submit(Some(7)));
        assert!(!d.active);
    }

    #[test]
    fn empty_field_submits_none() {
        let mut d = dialog();
        d.handle_key(&key(KeyCode::Backspace));
        d.handle_key(&key(KeyCode::Backspace));
        assert_eq!(d.handle_key(&key(KeyCode::Enter)), BucketDialogEvent::Submit(None));
    }

    #[test]
    fn out_of_range_keeps_dialog_open() {
        let mut d = dialog();
        d.handle_key(&key(KeyCode::Char('0')));
        assert_eq!(d.handle_key(&key(KeyCode::Enter)), BucketDialogEvent::None);
        assert!(d.active);
        assert!(d.error().is_some());
        assert_eq!(d.handle_key(&key(KeyCode::Esc)), BucketDialogEvent::Cancel);
        assert!(!d.active);
    }
}
