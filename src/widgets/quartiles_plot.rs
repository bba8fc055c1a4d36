//! Box-and-whisker rendering of a [`QuantilesVector`], one box per X bucket.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Rectangle},
        Paragraph, Widget,
    },
};

use crate::axis::{AxisData, DataRange};
use crate::config::Theme;
use crate::format::{format_axis_label, truncate};
use crate::quantiles::QuantilesVector;
use crate::schema::TableSchema;
use crate::widgets::surface::PlottingSurface;

const BOX_LEFT: f64 = 0.2;
const BOX_RIGHT: f64 = 0.8;
const CAP_HALF: f64 = 0.15;
/// Narrowest bucket span that still gets its own label.
const MIN_LABEL_SPAN: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct QuartilesPlot {
    data: Option<QuantilesVector>,
    axis: Option<AxisData>,
    schema: TableSchema,
    row_count: u64,
    sampling_rate: f64,
    chart_width: u16,
    chart_height: u16,
}

impl QuartilesPlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_data(
        &mut self,
        data: QuantilesVector,
        sampling_rate: f64,
        schema: &TableSchema,
        row_count: u64,
        axis: &AxisData,
    ) {
        self.data = Some(data);
        self.sampling_rate = sampling_rate;
        self.schema = schema.clone();
        self.row_count = row_count;
        self.axis = Some(axis.clone());
    }

    pub fn data(&self) -> Option<&QuantilesVector> {
        self.data.as_ref()
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Records the chart size used by [`Self::get_bucket_index`].
    pub fn layout(&mut self, surface: &PlottingSurface) {
        self.chart_width = surface.chart_width();
        self.chart_height = surface.chart_height();
    }

    pub fn chart_width(&self) -> u16 {
        self.chart_width
    }

    pub fn chart_height(&self) -> u16 {
        self.chart_height
    }

    fn bucket_count(&self) -> usize {
        self.data.as_ref().map(|d| d.len()).unwrap_or(0)
    }

    /// Bucket drawn under chart column `x`, or `None` outside the chart.
    pub fn get_bucket_index(&self, x: i32) -> Option<usize> {
        let count = self.bucket_count();
        let width = self.chart_width as i32;
        if count == 0 || x < 0 || x >= width {
            return None;
        }
        Some((x as usize * count / width as usize).min(count - 1))
    }

    /// From the smallest bucket minimum to the largest bucket maximum; `0..1` with no data.
    pub fn y_data_range(&self) -> DataRange {
        let entries = self.data.as_ref().map(|d| d.data.as_slice()).unwrap_or_default();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut missing = 0;
        for entry in entries {
            missing += entry.missing;
            if entry.empty {
                continue;
            }
            min = min.min(entry.min);
            max = max.max(entry.max);
        }
        if min > max {
            return DataRange::numeric(0.0, 1.0, 0, missing);
        }
        DataRange::numeric(min, max, self.row_count.saturating_sub(missing), missing)
    }

    /// The range the canvas spans: the data range, widened by 0.5 each way when it is a single value.
    pub fn y_display_range(&self) -> DataRange {
        let mut range = self.y_data_range();
        if range.max <= range.min {
            range.min -= 0.5;
            range.max += 0.5;
        }
        range
    }

    fn y_bounds(&self) -> [f64; 2] {
        let range = self.y_display_range();
        [range.min, range.max]
    }

    pub fn draw(&mut self, surface: &PlottingSurface, buf: &mut Buffer, theme: &Theme) {
        self.layout(surface);
        let chart = surface.chart_area();
        if chart.width == 0 || chart.height == 0 {
            return;
        }
        let (Some(data), Some(axis)) = (self.data.as_ref(), self.axis.as_ref()) else {
            Paragraph::new("Waiting for data")
                .style(Style::default().fg(theme.get("text_secondary")))
                .centered()
                .render(surface.area(), buf);
            return;
        };
        if data.is_empty() {
            Paragraph::new("No buckets")
                .style(Style::default().fg(theme.get("text_secondary")))
                .centered()
                .render(surface.area(), buf);
            return;
        }

        let [y_lo, y_hi] = self.y_bounds();
        let box_color = theme.get("chart_box");
        let median_color = theme.get("chart_median");
        let whisker_color = theme.get("chart_whisker");
        let empty_style = Style::default().fg(theme.get("chart_empty"));
        let y_mid = (y_lo + y_hi) / 2.0;

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, data.len() as f64])
            .y_bounds([y_lo, y_hi])
            .paint(|ctx| {
                for (i, entry) in data.data.iter().enumerate() {
                    let left = i as f64 + BOX_LEFT;
                    let right = i as f64 + BOX_RIGHT;
                    let centre = i as f64 + 0.5;
                    if entry.empty {
                        ctx.print(centre, y_mid, Span::styled("∅", empty_style));
                        continue;
                    }
                    ctx.draw(&CanvasLine::new(centre - CAP_HALF, entry.min, centre + CAP_HALF, entry.min, whisker_color));
                    ctx.draw(&CanvasLine::new(centre - CAP_HALF, entry.max, centre + CAP_HALF, entry.max, whisker_color));
                    let (Some(q1), Some(median), Some(q3)) = (entry.q1(), entry.median(), entry.q3()) else {
                        // Fewer than two values: only the extremes are known.
                        ctx.draw(&CanvasLine::new(centre, entry.min, centre, entry.max, whisker_color));
                        continue;
                    };
                    ctx.draw(&CanvasLine::new(centre, entry.min, centre, q1, whisker_color));
                    ctx.draw(&CanvasLine::new(centre, q3, centre, entry.max, whisker_color));
                    ctx.draw(&Rectangle {
                        x: left,
                        y: q1,
                        width: right - left,
                        height: q3 - q1,
                        color: box_color,
                    });
                    ctx.layer();
                    ctx.draw(&CanvasLine::new(left, median, right, median, median_color));
                }
            })
            .render(chart, buf);

        let label_style = Style::default().fg(theme.get("text_primary"));
        self.draw_axes(surface, buf, label_style, [y_lo, y_hi]);
        self.draw_x_labels(chart, axis, buf, label_style);
    }

    fn draw_axes(&self, surface: &PlottingSurface, buf: &mut Buffer, style: Style, bounds: [f64; 2]) {
        let chart = surface.chart_area();
        let area = surface.area();
        let margin = chart.x.saturating_sub(area.x);
        if margin < 2 {
            return;
        }
        let axis_x = chart.x - 1;
        for y in chart.y..chart.bottom() {
            buf[(axis_x, y)].set_symbol("│").set_style(style);
        }
        if chart.bottom() < area.bottom() {
            buf[(axis_x, chart.bottom())].set_symbol("└").set_style(style);
            for x in chart.x..chart.right() {
                buf[(x, chart.bottom())].set_symbol("─").set_style(style);
            }
        }

        let labels = [
            (chart.y, format_axis_label(bounds[1])),
            (chart.y + chart.height / 2, format_axis_label((bounds[0] + bounds[1]) / 2.0)),
            (chart.bottom().saturating_sub(1), format_axis_label(bounds[0])),
        ];
        let width = (margin - 1) as usize;
        for (row, text) in labels {
            let text = truncate(&text, width);
            let len = text.chars().count() as u16;
            let x = axis_x.saturating_sub(len).max(area.x);
            buf.set_stringn(x, row, text, width, style);
        }
    }

    fn draw_x_labels(&self, chart: Rect, axis: &AxisData, buf: &mut Buffer, style: Style) {
        let row = chart.bottom() + 1;
        if row >= buf.area.bottom() || chart.width == 0 {
            return;
        }
        let count = self.bucket_count();
        let width = chart.width as usize;
        let span = width / count.max(1);
        if span >= MIN_LABEL_SPAN {
            for bucket in 0..count {
                let start = bucket * width / count;
                let text = axis.bucket_description(bucket, span - 1);
                buf.set_stringn(chart.x + start as u16, row, text, span - 1, style);
            }
            return;
        }
        let max_len = (width / 2).saturating_sub(1).min(16);
        let first = axis.bucket_description(0, max_len);
        buf.set_stringn(chart.x, row, &first, max_len, style);
        if count > 1 {
            let last = axis.bucket_description(count - 1, max_len);
            let len = last.chars().count() as u16;
            buf.set_stringn(chart.right().saturating_sub(len), row, last, max_len, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantiles::QuantilesEntry;
    use crate::schema::{ColumnDescription, ContentsKind};

    fn entry(min: f64, samples: Vec<f64>, max: f64) -> QuantilesEntry {
        QuantilesEntry {
            empty: false,
            min,
            max,
            missing: 1,
            samples,
        }
    }

    fn plot_with(data: Vec<QuantilesEntry>) -> QuartilesPlot {
        let axis = AxisData::new(
            ColumnDescription::new("x", ContentsKind::Double),
            Some(DataRange::numeric(0.0, 10.0, 10, 0)),
            data.len(),
        );
        let mut plot = QuartilesPlot::new();
        plot.set_data(QuantilesVector { data }, 1.0, &TableSchema::default(), 20, &axis);
        plot
    }

    #[test]
    fn y_range_skips_empty_buckets() {
        let plot = plot_with(vec![
            entry(2.0, vec![3.0, 4.0, 5.0], 6.0),
            QuantilesEntry::empty(3),
            entry(-1.0, vec![0.0], 1.0),
        ]);
        let range = plot.y_data_range();
        assert_eq!((range.min, range.max), (-1.0, 6.0));
        assert_eq!(range.missing_count, 5);
    }

    #[test]
    fn y_range_when_everything_is_empty() {
        let plot = plot_with(vec![QuantilesEntry::empty(0), QuantilesEntry::empty(2)]);
        let range = plot.y_data_range();
        assert_eq!((range.min, range.max), (0.0, 1.0));
    }

    #[test]
    fn display_range_pads_a_single_value() {
        let plot = plot_with(vec![entry(2.0, vec![2.0], 2.0)]);
        let range = plot.y_display_range();
        assert_eq!((range.min, range.max), (1.5, 2.5));
        assert_eq!(plot.y_bounds(), [1.5, 2.5]);

        let plot = plot_with(vec![entry(2.0, vec![3.0], 6.0)]);
        assert_eq!(plot.y_bounds(), [2.0, 6.0]);
    }

    #[test]
    fn bucket_index_follows_chart_width() {
        let mut plot = plot_with(vec![QuantilesEntry::empty(0); 4]);
        assert_eq!(plot.get_bucket_index(0), None, "before layout");
        plot.layout(&PlottingSurface::new(Rect::new(0, 0, 51, 10)));
        assert_eq!(plot.chart_width(), 40);
        assert_eq!(plot.get_bucket_index(0), Some(0));
        assert_eq!(plot.get_bucket_index(10), Some(1));
        assert_eq!(plot.get_bucket_index(39), Some(3));
        assert_eq!(plot.get_bucket_index(40), None);
        assert_eq!(plot.get_bucket_index(-1), None);
    }

    #[test]
    fn draw_marks_empty_bucket_and_labels() {
        let mut plot = plot_with(vec![
            entry(1.0, vec![2.0, 3.0, 4.0], 5.0),
            QuantilesEntry::empty(0),
        ]);
        let area = Rect::new(0, 0, 51, 12);
        let mut buf = Buffer::empty(area);
        plot.draw(&PlottingSurface::new(area), &mut buf, &Theme::default());
        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|(x, y)| buf[(x, y)].symbol().to_string())
            .collect();
        assert!(text.contains('∅'));
        assert!(text.contains("[0, 5)"));
        assert!(text.contains('5'));
    }

    #[test]
    fn draw_is_idempotent() {
        let mut plot = plot_with(vec![entry(1.0, vec![2.0], 5.0), entry(0.0, vec![], 2.0)]);
        let area = Rect::new(0, 0, 40, 10);
        let mut first = Buffer::empty(area);
        let mut second = Buffer::empty(area);
        let surface = PlottingSurface::new(area);
        plot.draw(&surface, &mut first, &Theme::default());
        plot.draw(&surface, &mut second, &Theme::default());
        assert_eq!(first, second);
    }
}
