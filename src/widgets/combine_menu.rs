use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget},
};

use crate::backend::CombineOperation;
use crate::config::Theme;
use crate::render::layout::centered_rect_fixed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMenuEvent {
    None,
    Select(CombineOperation),
    Cancel,
}

/// Set operation picker, combining the current page with the marked one.
#[derive(Debug, Default)]
pub struct CombineMenu {
    pub active: bool,
    selected: usize,
    /// Title of the marked page, shown in the menu title.
    other: String,
}

impl CombineMenu {
    pub fn open(&mut self, other: impl Into<String>) {
        self.active = true;
        self.selected = 0;
        self.other = other.into();
    }

    pub fn selected(&self) -> CombineOperation {
        CombineOperation::ALL[self.selected]
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> CombineMenuEvent {
        let count = CombineOperation::ALL.len();
        match event.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = (self.selected + count - 1) % count;
                CombineMenuEvent::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1) % count;
                CombineMenuEvent::None
            }
            KeyCode::Enter => {
                self.active = false;
                CombineMenuEvent::Select(self.selected())
            }
            KeyCode::Esc => {
                self.active = false;
                CombineMenuEvent::Cancel
            }
            _ => CombineMenuEvent::None,
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let popup = centered_rect_fixed(area, 40, CombineOperation::ALL.len() as u16 + 2);
        Clear.render(popup, buf);
        let text_style = Style::default().fg(theme.get("text_primary"));
        let lines: Vec<Line> = CombineOperation::ALL
            .iter()
            .enumerate()
            .map(|(i, op)| {
                if i == self.selected {
                    Line::styled(
                        format!("> {}", op.as_str()),
                        text_style.fg(theme.get("secondary")).add_modifier(Modifier::BOLD),
                    )
                } else {
                    Line::styled(format!("  {}", op.as_str()), text_style)
                }
            })
            .collect();
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(format!("Combine with {}", self.other))
                    .border_style(Style::default().fg(theme.get("modal_border_active"))),
            )
            .render(popup, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn navigate_and_select() {
        let mut menu = CombineMenu::default();
        menu.open("data.csv");
        menu.handle_key(&KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(menu.selected(), CombineOperation::Replace);
        menu.handle_key(&KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        menu.handle_key(&KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(
            menu.handle_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            CombineMenuEvent::Select(CombineOperation::Intersection)
        );
        assert!(!menu.active);
    }
}
