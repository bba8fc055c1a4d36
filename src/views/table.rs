use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::backend::{RecordOrder, RemoteObjectId};
use crate::config::Theme;
use crate::format::format_number_with_commas;
use crate::quantiles::NextKList;
use crate::schema::TableSchema;

const CELL_PADDING: u16 = 2;

/// One page of rows in a requested order.
pub struct TableView {
    title: String,
    remote_object_id: RemoteObjectId,
    schema: TableSchema,
    order: RecordOrder,
    rows: Option<NextKList>,
    state: TableState,
}

impl TableView {
    pub fn new(
        remote_object_id: impl Into<RemoteObjectId>,
        schema: TableSchema,
        order: RecordOrder,
        title: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            remote_object_id: remote_object_id.into(),
            schema,
            order,
            rows: None,
            state: TableState::default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn remote_object_id(&self) -> &RemoteObjectId {
        &self.remote_object_id
    }

    pub fn order(&self) -> &RecordOrder {
        &self.order
    }

    pub fn rows(&self) -> Option<&NextKList> {
        self.rows.as_ref()
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    pub fn update(&mut self, rows: NextKList) {
        self.state.select(if rows.rows.is_empty() { None } else { Some(0) });
        self.rows = Some(rows);
    }

    pub fn scroll(&mut self, delta: i32) {
        let len = self.rows.as_ref().map(|r| r.rows.len()).unwrap_or(0);
        if len == 0 {
            return;
        }
        let current = self.state.selected().unwrap_or(0) as i32;
        let next = (current + delta).clamp(0, len as i32 - 1);
        self.state.select(Some(next as usize));
    }

    pub fn summary(&self) -> String {
        match &self.rows {
            Some(list) if !list.rows.is_empty() => format!(
                "rows {}-{} of {}",
                format_number_with_commas(list.start_position + 1),
                format_number_with_commas(list.start_position + list.rows.len() as u64),
                format_number_with_commas(list.row_count)
            ),
            Some(list) => format!("0 of {} rows", format_number_with_commas(list.row_count)),
            None => "loading".to_string(),
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Fill(1)])
            .split(area);
        let sorted_by: Vec<String> = self
            .order
            .columns
            .iter()
            .map(|(cd, _)| self.schema.display_name(&cd.name))
            .collect();
        Paragraph::new(Span::styled(
            format!("Sorted by {}  {}", sorted_by.join(", "), self.summary()),
            Style::default().fg(theme.get("text_primary")),
        ))
        .render(layout[0], buf);

        let Some(list) = &self.rows else {
            Paragraph::new("Waiting for data")
                .centered()
                .render(layout[1], buf);
            return;
        };

        // Each column is as wide as its longest cell, until the page runs out of width.
        let names: Vec<String> = self
            .schema
            .columns()
            .iter()
            .map(|cd| self.schema.display_name(&cd.name))
            .collect();
        let mut widths = Vec::new();
        let mut used = 0u16;
        for (i, name) in names.iter().enumerate() {
            let longest = list
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|v| v.chars().count())
                .max()
                .unwrap_or(0)
                .max(name.chars().count()) as u16;
            if used + longest > layout[1].width {
                let rest = layout[1].width.saturating_sub(used);
                if rest > 0 {
                    widths.push(rest);
                }
                break;
            }
            widths.push(longest);
            used += longest + CELL_PADDING;
        }
        let visible = widths.len();

        let alternate = theme.get("controls_bg");
        let rows: Vec<Row> = list
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells: Vec<Cell> = row
                    .iter()
                    .take(visible)
                    .map(|v| Cell::from(Line::from(v.as_str())))
                    .collect();
                let style = if i % 2 == 1 && alternate != Color::Reset {
                    Style::default().bg(alternate)
                } else {
                    Style::default()
                };
                Row::new(cells).style(style)
            })
            .collect();
        let headers: Vec<Span> = names
            .iter()
            .take(visible)
            .map(|n| Span::raw(n.clone()))
            .collect();
        let header_style = Style::default()
            .fg(theme.get("keybind_labels"))
            .add_modifier(Modifier::BOLD);

        StatefulWidget::render(
            Table::new(rows, widths)
                .column_spacing(CELL_PADDING)
                .header(Row::new(headers).style(header_style))
                .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
            layout[1],
            buf,
            &mut self.state,
        );
    }
}
