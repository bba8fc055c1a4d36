use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Span,
    widgets::{Bar, BarChart, BarGroup, Block, Paragraph, Widget},
};
use std::time::Duration;

use crate::axis::AxisData;
use crate::backend::RemoteObjectId;
use crate::config::Theme;
use crate::format::{format_number_with_commas, truncate};
use crate::quantiles::Histogram;
use crate::schema::TableSchema;

/// Bar chart of one column's bucket counts.
pub struct HistogramView {
    title: String,
    remote_object_id: RemoteObjectId,
    schema: TableSchema,
    axis: AxisData,
    data: Option<Histogram>,
    elapsed: Option<Duration>,
}

impl HistogramView {
    pub fn new(
        remote_object_id: impl Into<RemoteObjectId>,
        schema: TableSchema,
        axis: AxisData,
        title: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            remote_object_id: remote_object_id.into(),
            schema,
            axis,
            data: None,
            elapsed: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn remote_object_id(&self) -> &RemoteObjectId {
        &self.remote_object_id
    }

    pub fn axis(&self) -> &AxisData {
        &self.axis
    }

    pub fn data(&self) -> Option<&Histogram> {
        self.data.as_ref()
    }

    pub fn update(&mut self, data: Histogram) {
        self.data = Some(data);
    }

    pub fn update_completed(&mut self, elapsed: Duration) {
        self.elapsed = Some(elapsed);
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("{} buckets", self.axis.bucket_count);
        if let Some(data) = &self.data {
            summary.push_str(&format!(
                ", {} rows, {} missing",
                format_number_with_commas(data.total()),
                format_number_with_commas(data.missing)
            ));
        }
        if let Some(elapsed) = self.elapsed {
            summary.push_str(&format!(", {} ms", elapsed.as_millis()));
        }
        summary
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Fill(1)])
            .split(area);

        let heading = format!(
            "Histogram of {}  {}",
            self.axis.display_name(&self.schema),
            self.summary()
        );
        Paragraph::new(Span::styled(
            heading,
            Style::default().fg(theme.get("text_primary")),
        ))
        .render(layout[0], buf);

        let Some(data) = &self.data else {
            Paragraph::new("Waiting for data")
                .centered()
                .render(layout[1], buf);
            return;
        };
        let count = data.buckets.len();
        if count == 0 {
            Paragraph::new("No buckets").centered().render(layout[1], buf);
            return;
        }

        // Spread the width over the buckets, one cell of gap between bars.
        let bar_gap = 1u16;
        let available = layout[1].width.saturating_sub(bar_gap * (count as u16).saturating_sub(1));
        let bar_width = (available / count as u16).max(1);
        let label_len = bar_width as usize;

        let bars: Vec<Bar> = data
            .buckets
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::default()
                    .value(c)
                    .label(truncate(&self.axis.bucket_description(i, 0), label_len).into())
                    .text_value(if bar_width >= 4 {
                        format_number_with_commas(c)
                    } else {
                        String::new()
                    })
                    .style(Style::default().fg(theme.get("chart_box")))
            })
            .collect();

        BarChart::default()
            .block(Block::default())
            .data(BarGroup::default().bars(&bars))
            .bar_width(bar_width)
            .bar_gap(bar_gap)
            .max(data.max_count().max(1))
            .render(layout[1], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::DataRange;
    use crate::schema::{ColumnDescription, ContentsKind};

    fn view() -> HistogramView {
        let axis = AxisData::new(
            ColumnDescription::new("x", ContentsKind::Double),
            Some(DataRange::numeric(0.0, 4.0, 10, 1)),
            2,
        );
        HistogramView::new("file:a.csv", TableSchema::default(), axis, "a.csv")
    }

    #[test]
    fn summary_counts_rows() {
        let mut v = view();
        assert_eq!(v.summary(), "2 buckets");
        v.update(Histogram {
            buckets: vec![1200, 3],
            missing: 1,
        });
        v.update_completed(Duration::from_millis(12));
        assert_eq!(v.summary(), "2 buckets, 1,203 rows, 1 missing, 12 ms");
    }

    #[test]
    fn renders_waiting_then_bars() {
        let mut v = view();
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        v.render(area, &mut buf, &Theme::default());
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Waiting for data"));

        v.update(Histogram {
            buckets: vec![5, 10],
            missing: 0,
        });
        let mut buf = Buffer::empty(area);
        v.render(area, &mut buf, &Theme::default());
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Histogram of x"));
        assert!(!text.contains("Waiting"));
    }
}
