use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Paragraph, Widget},
};

use crate::config::Theme;
use crate::format::format_number_with_commas;

/// Key hints shown on a quartile page.
pub const QUARTILE_CONTROLS: [(&str, &str); 12] = [
    ("b", "Buckets"),
    ("e", "CSV"),
    ("p", "PNG"),
    ("1", "Hist"),
    ("2", "2D"),
    ("h", "Heatmap"),
    ("t", "Table"),
    ("r", "Refresh"),
    ("s", "Snapshot"),
    ("m", "Mark"),
    ("c", "Combine"),
    ("q", "Quit"),
];

/// Key hints shown on every other page.
pub const PAGE_CONTROLS: [(&str, &str); 3] = [("Tab", "Next"), ("w", "Close"), ("q", "Quit")];

/// Bottom row: key hints on the left, row count and a busy spinner on the right.
pub struct Controls {
    pub row_count: Option<u64>,
    pub dimmed: bool,
    pub controls: Vec<(&'static str, &'static str)>,
    pub bg_color: Color,
    pub key_color: Color,
    pub label_color: Color,
    pub throbber_color: Color,
    pub busy: bool,
    pub throbber_frame: u8,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            row_count: None,
            dimmed: false,
            controls: PAGE_CONTROLS.to_vec(),
            bg_color: Color::Indexed(236),
            key_color: Color::Cyan,
            label_color: Color::White,
            throbber_color: Color::Cyan,
            busy: false,
            throbber_frame: 0,
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_count(mut self, row_count: Option<u64>) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn with_busy(mut self, busy: bool, throbber_frame: u8) -> Self {
        self.busy = busy;
        self.throbber_frame = throbber_frame;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_controls(mut self, controls: &[(&'static str, &'static str)]) -> Self {
        self.controls = controls.to_vec();
        self
    }

    pub fn with_theme(mut self, theme: &Theme) -> Self {
        self.bg_color = theme.get("controls_bg");
        self.key_color = theme.get("keybind_hints");
        self.label_color = theme.get("keybind_labels");
        self.throbber_color = theme.get("primary");
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let no_bg = self.bg_color == Color::Reset;
        if !no_bg {
            Block::default()
                .style(Style::default().bg(self.bg_color))
                .render(area, buf);
        }

        // Key plus one space, label plus one space.
        let pair_width = |(key, action): &(&str, &str)| -> u16 {
            (key.chars().count() as u16 + 1) + (action.chars().count() as u16 + 1)
        };

        const THROBBER_WIDTH: u16 = 3;
        let right_reserved = (if self.row_count.is_some() { 21 } else { 1 }) + THROBBER_WIDTH;
        let mut available = area.width.saturating_sub(right_reserved);

        let mut n_show = 0;
        for pair in self.controls.iter() {
            let need = pair_width(pair);
            if available < need {
                break;
            }
            available -= need;
            n_show += 1;
        }

        let mut constraints: Vec<Constraint> = self
            .controls
            .iter()
            .take(n_show)
            .flat_map(|(key, action)| {
                [
                    Constraint::Length(key.chars().count() as u16 + 1),
                    Constraint::Length(action.chars().count() as u16 + 1),
                ]
            })
            .collect();
        constraints.push(Constraint::Fill(1));
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(20));
        }
        constraints.push(Constraint::Length(THROBBER_WIDTH));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let base = if no_bg {
            Style::default()
        } else {
            Style::default().bg(self.bg_color)
        };
        let (key_color, label_color) = if self.dimmed {
            (Color::DarkGray, Color::DarkGray)
        } else {
            (self.key_color, self.label_color)
        };
        let key_style = base.fg(key_color);
        let label_style = base.fg(label_color);

        for (i, (key, action)) in self.controls.iter().take(n_show).enumerate() {
            let j = i * 2;
            Paragraph::new(*key).style(key_style).render(layout[j], buf);
            Paragraph::new(*action)
                .style(label_style)
                .render(layout[j + 1], buf);
        }

        let fill_idx = n_show * 2;
        Paragraph::new("").style(base).render(layout[fill_idx], buf);
        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", format_number_with_commas(count)))
                .style(label_style)
                .right_aligned()
                .render(layout[fill_idx + 1], buf);
        }

        const THROBBER: [char; 4] = ['|', '/', '-', '\\'];
        let throbber_idx = fill_idx + if self.row_count.is_some() { 2 } else { 1 };
        let throbber = if self.busy {
            THROBBER[self.throbber_frame as usize % 4].to_string()
        } else {
            " ".to_string()
        };
        Paragraph::new(throbber)
            .style(base.fg(self.throbber_color))
            .centered()
            .render(layout[throbber_idx], buf);
    }
}
