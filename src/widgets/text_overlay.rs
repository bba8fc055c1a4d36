use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget},
};

use crate::config::Theme;
use crate::format::truncate;

/// Tooltip of label/value rows that follows the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    labels: Vec<String>,
    values: Vec<String>,
    width: u16,
    anchor: Option<(u16, u16)>,
}

impl TextOverlay {
    pub fn new(labels: &[&str], width: u16) -> Self {
        Self::from_labels(labels.iter().map(|l| l.to_string()).collect(), width)
    }

    pub fn from_labels(labels: Vec<String>, width: u16) -> Self {
        let values = vec![String::new(); labels.len()];
        Self {
            labels,
            values,
            width,
            anchor: None,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_visible(&self) -> bool {
        self.anchor.is_some()
    }

    /// Sets the values and moves the overlay next to `(column, row)`.
    pub fn update(&mut self, values: Vec<String>, column: u16, row: u16) {
        self.values = values;
        self.values.resize(self.labels.len(), String::new());
        self.anchor = Some((column, row));
    }

    pub fn hide(&mut self) {
        self.anchor = None;
    }

    /// Overlay rectangle inside `bounds`, below and right of the anchor when it fits.
    pub fn area(&self, bounds: Rect) -> Option<Rect> {
        let (column, row) = self.anchor?;
        let width = self.width.min(bounds.width);
        let height = (self.labels.len() as u16 + 2).min(bounds.height);
        if width < 4 || height < 3 {
            return None;
        }
        let mut x = column.saturating_add(2);
        if x + width > bounds.right() {
            x = column.saturating_sub(width + 1).max(bounds.x);
        }
        let mut y = row.saturating_add(1);
        if y + height > bounds.bottom() {
            y = bounds.bottom().saturating_sub(height).max(bounds.y);
        }
        Some(Rect::new(x, y, width, height))
    }

    pub fn render(&self, bounds: Rect, buf: &mut Buffer, theme: &Theme) {
        let Some(area) = self.area(bounds) else {
            return;
        };
        let label_width = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let value_width = (area.width as usize).saturating_sub(label_width + 3);
        let label_style = Style::default().fg(theme.get("text_secondary"));
        let value_style = Style::default().fg(theme.get("text_primary"));
        let lines: Vec<Line> = self
            .labels
            .iter()
            .zip(self.values.iter())
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{:<width$} ", label, width = label_width), label_style),
                    Span::styled(truncate(value, value_width), value_style),
                ])
            })
            .collect();
        Clear.render(area, buf);
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(theme.get("tooltip_border"))),
            )
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_until_updated() {
        let mut overlay = TextOverlay::new(&["x", "bucket"], 20);
        assert!(overlay.area(Rect::new(0, 0, 80, 24)).is_none());
        overlay.update(vec!["1".into()], 10, 5);
        assert_eq!(overlay.values(), &["1".to_string(), String::new()]);
        assert_eq!(overlay.area(Rect::new(0, 0, 80, 24)), Some(Rect::new(12, 6, 20, 4)));
        overlay.hide();
        assert!(!overlay.is_visible());
    }

    #[test]
    fn flips_left_near_the_right_edge() {
        let mut overlay = TextOverlay::new(&["a", "b", "c"], 20);
        overlay.update(vec![], 75, 22);
        let area = overlay.area(Rect::new(0, 0, 80, 24)).unwrap();
        assert_eq!(area.x, 54);
        assert_eq!(area.bottom(), 24);
    }
}
