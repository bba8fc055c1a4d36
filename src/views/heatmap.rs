//! Two-column counts, drawn either as a heatmap or as stacked bars.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Paragraph, Widget},
};
use std::time::Duration;

use crate::axis::AxisData;
use crate::backend::RemoteObjectId;
use crate::config::Theme;
use crate::format::{format_number_with_commas, truncate};
use crate::quantiles::Histogram2D;
use crate::schema::TableSchema;

/// Shades from lightest to densest.
const SHADES: [&str; 5] = [" ", "░", "▒", "▓", "█"];
const LEFT_MARGIN: u16 = 12;

/// Shade for `count` relative to `max`; any non-zero count gets at least the lightest mark.
pub fn shade(count: u64, max: u64) -> &'static str {
    if count == 0 || max == 0 {
        return SHADES[0];
    }
    let steps = (SHADES.len() - 1) as u64;
    let level = (count * steps).div_ceil(max).clamp(1, steps);
    SHADES[level as usize]
}

pub struct HeatmapView {
    title: String,
    remote_object_id: RemoteObjectId,
    schema: TableSchema,
    x: AxisData,
    y: AxisData,
    /// Heatmap when set, otherwise a stacked histogram of X split by Y.
    heatmap: bool,
    data: Option<Histogram2D>,
    elapsed: Option<Duration>,
}

impl HeatmapView {
    pub fn new(
        remote_object_id: impl Into<RemoteObjectId>,
        schema: TableSchema,
        x: AxisData,
        y: AxisData,
        heatmap: bool,
        title: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            remote_object_id: remote_object_id.into(),
            schema,
            x,
            y,
            heatmap,
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

    pub fn is_heatmap(&self) -> bool {
        self.heatmap
    }

    pub fn data(&self) -> Option<&Histogram2D> {
        self.data.as_ref()
    }

    pub fn update(&mut self, data: Histogram2D) {
        self.data = Some(data);
    }

    pub fn update_completed(&mut self, elapsed: Duration) {
        self.elapsed = Some(elapsed);
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("{}x{} buckets", self.x.bucket_count, self.y.bucket_count);
        if let Some(data) = &self.data {
            summary.push_str(&format!(
                ", {} missing",
                format_number_with_commas(data.x_missing + data.y_missing)
            ));
        }
        if let Some(elapsed) = self.elapsed {
            summary.push_str(&format!(", {} ms", elapsed.as_millis()));
        }
        summary
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        if area.height < 3 || area.width <= LEFT_MARGIN {
            return;
        }
        let kind = if self.heatmap { "Heatmap" } else { "2D histogram" };
        let heading = format!(
            "{} of {} and {}  {}",
            kind,
            self.x.display_name(&self.schema),
            self.y.display_name(&self.schema),
            self.summary()
        );
        buf.set_stringn(
            area.x,
            area.y,
            heading,
            area.width as usize,
            Style::default().fg(theme.get("text_primary")),
        );

        let chart = Rect::new(
            area.x + LEFT_MARGIN,
            area.y + 1,
            area.width - LEFT_MARGIN,
            area.height - 2,
        );
        let Some(data) = &self.data else {
            Paragraph::new("Waiting for data").centered().render(chart, buf);
            return;
        };
        if data.x_count() == 0 || data.y_count() == 0 || chart.width == 0 || chart.height == 0 {
            Paragraph::new("No buckets").centered().render(chart, buf);
            return;
        }

        let style = Style::default().fg(theme.get("chart_box"));
        if self.heatmap {
            draw_heatmap(data, chart, buf, style);
        } else {
            draw_stacked(data, chart, buf, style);
        }

        let label_style = Style::default()
            .fg(theme.get("text_secondary"))
            .add_modifier(Modifier::DIM);
        let x_first = self.x.bucket_description(0, chart.width as usize / 2);
        let x_last = self
            .x
            .bucket_description(data.x_count() - 1, chart.width as usize / 2);
        let label_row = chart.y + chart.height;
        buf.set_stringn(chart.x, label_row, &x_first, chart.width as usize, label_style);
        let last_x = (chart.x + chart.width).saturating_sub(x_last.chars().count() as u16);
        if last_x > chart.x + x_first.chars().count() as u16 {
            buf.set_string(last_x, label_row, &x_last, label_style);
        }

        if self.heatmap {
            let max_len = LEFT_MARGIN as usize - 1;
            let top = truncate(&self.y.bucket_description(data.y_count() - 1, 0), max_len);
            let bottom = truncate(&self.y.bucket_description(0, 0), max_len);
            buf.set_string(area.x, chart.y, top, label_style);
            buf.set_string(area.x, chart.y + chart.height - 1, bottom, label_style);
        } else {
            let max = (0..data.x_count()).map(|x| data.column_total(x)).max().unwrap_or(0);
            buf.set_stringn(
                area.x,
                chart.y,
                format_number_with_commas(max),
                LEFT_MARGIN as usize - 1,
                label_style,
            );
            buf.set_string(area.x, chart.y + chart.height - 1, "0", label_style);
        }
    }
}

/// Cell range `[start, end)` covered by bucket `i` of `count` along `cells`.
fn span(i: usize, count: usize, cells: u16) -> (u16, u16) {
    let cells = cells as usize;
    let start = i * cells / count;
    let end = ((i + 1) * cells / count).max(start + 1).min(cells);
    (start as u16, end as u16)
}

fn draw_heatmap(data: &Histogram2D, chart: Rect, buf: &mut Buffer, style: Style) {
    let max = data.max_count();
    let (xs, ys) = (data.x_count(), data.y_count());
    for x in 0..xs {
        let (x0, x1) = span(x, xs, chart.width);
        for y in 0..ys {
            // Larger Y values sit higher.
            let (r0, r1) = span(ys - 1 - y, ys, chart.height);
            let symbol = shade(data.counts[x][y], max);
            for col in x0..x1 {
                for row in r0..r1 {
                    buf[(chart.x + col, chart.y + row)]
                        .set_symbol(symbol)
                        .set_style(style);
                }
            }
        }
    }
}

fn draw_stacked(data: &Histogram2D, chart: Rect, buf: &mut Buffer, style: Style) {
    let max = (0..data.x_count())
        .map(|x| data.column_total(x))
        .max()
        .unwrap_or(0)
        .max(1);
    let xs = data.x_count();
    let height = chart.height as u64;
    for x in 0..xs {
        let (x0, x1) = span(x, xs, chart.width);
        let mut filled = 0u64;
        let mut acc = 0u64;
        for (y, &count) in data.counts[x].iter().enumerate() {
            acc += count;
            let top = acc * height / max;
            // Alternate shades so neighbouring Y buckets stay distinguishable.
            let symbol = SHADES[4 - (y % 3)];
            for level in filled..top {
                let row = chart.height - 1 - level as u16;
                for col in x0..x1.saturating_sub(1).max(x0 + 1) {
                    buf[(chart.x + col, chart.y + row)]
                        .set_symbol(symbol)
                        .set_style(style);
                }
            }
            filled = filled.max(top);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::DataRange;
    use crate::schema::{ColumnDescription, ContentsKind};

    fn view(heatmap: bool) -> HeatmapView {
        let axis = |name: &str| {
            AxisData::new(
                ColumnDescription::new(name, ContentsKind::Double),
                Some(DataRange::numeric(0.0, 1.0, 4, 0)),
                2,
            )
        };
        HeatmapView::new("t", TableSchema::default(), axis("x"), axis("y"), heatmap, "t")
    }

    #[test]
    fn shade_levels() {
        assert_eq!(shade(0, 10), " ");
        assert_eq!(shade(1, 10), "░");
        assert_eq!(shade(10, 10), "█");
        assert_eq!(shade(3, 0), " ");
    }

    #[test]
    fn span_covers_all_cells() {
        assert_eq!(span(0, 2, 10), (0, 5));
        assert_eq!(span(1, 2, 10), (5, 10));
        assert_eq!(span(2, 3, 2), (1, 2));
    }

    #[test]
    fn heatmap_draws_densest_cell() {
        let mut v = view(true);
        v.update(Histogram2D {
            counts: vec![vec![0, 8], vec![2, 0]],
            x_missing: 1,
            y_missing: 0,
        });
        assert_eq!(v.summary(), "2x2 buckets, 1 missing");
        let area = Rect::new(0, 0, 32, 12);
        let mut buf = Buffer::empty(area);
        v.render(area, &mut buf, &Theme::default());
        // Top-left quadrant of the chart: x bucket 0, y bucket 1.
        assert_eq!(buf[(LEFT_MARGIN, 1)].symbol(), "█");
        // Bottom-right quadrant: x bucket 1, y bucket 0.
        assert_eq!(buf[(31, 9)].symbol(), "░");
    }

    #[test]
    fn stacked_bars_fill_from_bottom() {
        let mut v = view(false);
        v.update(Histogram2D {
            counts: vec![vec![5, 5], vec![0, 0]],
            x_missing: 0,
            y_missing: 0,
        });
        let area = Rect::new(0, 0, 32, 12);
        let mut buf = Buffer::empty(area);
        v.render(area, &mut buf, &Theme::default());
        assert_ne!(buf[(LEFT_MARGIN, 10 - 1)].symbol(), " ");
        assert_eq!(buf[(31, 9)].symbol(), " ");
    }
}
