//! Modal overlays: error and notice boxes.

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::Widget;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use crate::config::Theme;
use crate::render::layout::centered_rect;

fn render_message_modal(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    message: &str,
    border: Color,
    text: Color,
    theme: &Theme,
) {
    let popup_area = centered_rect(area, 70, 40);
    Clear.render(popup_area, buf);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .border_style(Style::default().fg(border));
    let inner_area = block.inner(popup_area);
    block.render(popup_area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(inner_area);

    Paragraph::new(message)
        .style(Style::default().fg(text))
        .wrap(Wrap { trim: true })
        .render(chunks[0], buf);

    Paragraph::new("OK")
        .centered()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.get("modal_border_active"))),
        )
        .render(chunks[1], buf);
}

pub fn render_error_modal(area: Rect, buf: &mut Buffer, modal: &crate::ErrorModal, theme: &Theme) {
    render_message_modal(
        area,
        buf,
        "Error",
        &modal.message,
        theme.get("modal_border_error"),
        theme.get("error"),
        theme,
    );
}

pub fn render_success_modal(area: Rect, buf: &mut Buffer, modal: &crate::SuccessModal, theme: &Theme) {
    render_message_modal(
        area,
        buf,
        "Done",
        &modal.message,
        theme.get("modal_border"),
        theme.get("text_primary"),
        theme,
    );
}
