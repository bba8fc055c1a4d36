//! Interactive quartile chart: one box per X bucket, a hover tooltip and drag-to-filter.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::{buffer::Buffer, layout::Rect, style::Style};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::axis::{AxisData, AxisKind};
use crate::backend::{RangeFilter, RangeFilterPair, RecordOrder, RemoteObjectId};
use crate::chart_export::{write_quartiles_png, QuartilesExportBounds, PNG_FILE_NAME, PNG_SIZE};
use crate::config::Theme;
use crate::dispatch::{ChartKind, ChartOptions, DispatchContext};
use crate::export::{quartiles_csv, FileSaver, CSV_FILE_NAME};
use crate::format::significant_digits;
use crate::quantiles::QuantilesVector;
use crate::schema::{ColumnDescription, TableSchema};
use crate::snapshot::QuantileVectorSerialization;
use crate::views::ViewAction;
use crate::widgets::quartiles_plot::QuartilesPlot;
use crate::widgets::surface::PlottingSurface;
use crate::widgets::text_overlay::TextOverlay;

pub const DEFAULT_TOOLTIP_WIDTH: u16 = 40;
/// Longest bucket label shown in the tooltip.
const TOOLTIP_BUCKET_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// No quartiles received yet.
    Empty,
    Rendered,
    /// Drag in progress; corners are chart-relative cells.
    Selecting {
        origin: (i32, i32),
        current: (i32, i32),
    },
    /// Superseded by another view on the same page.
    Replaced,
}

pub struct QuartilesView {
    title: String,
    remote_object_id: RemoteObjectId,
    row_count: u64,
    schema: TableSchema,
    x_axis: AxisData,
    q_column: ColumnDescription,
    y_axis: Option<AxisData>,
    plot: QuartilesPlot,
    surface: PlottingSurface,
    data: Option<QuantilesVector>,
    tooltip: Option<TextOverlay>,
    tooltip_width: u16,
    summary: String,
    elapsed: Option<Duration>,
    state: ViewState,
}

impl QuartilesView {
    pub fn new(
        remote_object_id: impl Into<RemoteObjectId>,
        row_count: u64,
        schema: TableSchema,
        x_axis: AxisData,
        q_column: ColumnDescription,
        title: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            remote_object_id: remote_object_id.into(),
            row_count,
            schema,
            x_axis,
            q_column,
            y_axis: None,
            plot: QuartilesPlot::new(),
            surface: PlottingSurface::new(Rect::default()),
            data: None,
            tooltip: None,
            tooltip_width: DEFAULT_TOOLTIP_WIDTH,
            summary: String::new(),
            elapsed: None,
            state: ViewState::Empty,
        }
    }

    pub fn with_tooltip_width(mut self, width: u16) -> Self {
        self.tooltip_width = width;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn remote_object_id(&self) -> &RemoteObjectId {
        &self.remote_object_id
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn x_axis(&self) -> &AxisData {
        &self.x_axis
    }

    pub fn y_axis(&self) -> Option<&AxisData> {
        self.y_axis.as_ref()
    }

    pub fn q_column(&self) -> &ColumnDescription {
        &self.q_column
    }

    pub fn data(&self) -> Option<&QuantilesVector> {
        self.data.as_ref()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn tooltip(&self) -> Option<&TextOverlay> {
        self.tooltip.as_ref()
    }

    pub fn surface(&self) -> &PlottingSurface {
        &self.surface
    }

    fn chart_columns(&self) -> Vec<ColumnDescription> {
        vec![self.x_axis.description.clone(), self.q_column.clone()]
    }

    /// Lays the chart out in `area` and redraws the current data, if any.
    pub fn resize(&mut self, area: Rect) {
        self.surface = PlottingSurface::new(area);
        if let Some(data) = self.data.clone() {
            self.update_view(data);
        }
    }

    /// Replaces the rendered vector wholesale.
    pub fn update_view(&mut self, data: QuantilesVector) {
        self.surface = PlottingSurface::new(self.surface.area());
        self.plot = QuartilesPlot::new();
        self.plot
            .set_data(data.clone(), 1.0, &self.schema, self.row_count, &self.x_axis);
        self.plot.layout(&self.surface);
        self.x_axis
            .set_resolution(self.plot.chart_width(), AxisKind::Bottom);

        let mut y_axis = AxisData::new(self.q_column.clone(), Some(self.plot.y_display_range()), 0);
        y_axis.set_resolution(self.plot.chart_height(), AxisKind::Left);
        self.y_axis = Some(y_axis);

        let x_name = self.x_axis.display_name(&self.schema);
        let labels = [
            x_name.as_str(),
            "bucket",
            "max",
            "q3",
            "median",
            "q1",
            "min",
            "missing",
        ];
        self.tooltip = Some(TextOverlay::new(&labels, self.tooltip_width));

        self.summary = format!("{} buckets", self.x_axis.bucket_count);
        self.data = Some(data);
        if matches!(self.state, ViewState::Empty) {
            self.state = ViewState::Rendered;
        }
    }

    pub fn update_completed(&mut self, elapsed: Duration) {
        self.elapsed = Some(elapsed);
        self.summary = format!(
            "{} buckets, {} ms",
            self.x_axis.bucket_count,
            elapsed.as_millis()
        );
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Pointer moved to screen cell `(column, row)`.
    pub fn on_mouse_move(&mut self, column: u16, row: u16) {
        if !self.surface.area().contains((column, row).into()) {
            if let Some(tooltip) = self.tooltip.as_mut() {
                tooltip.hide();
            }
            return;
        }
        let (x, _) = self.surface.to_chart(column, row);
        let Some(tooltip) = self.tooltip.as_mut() else {
            return;
        };

        let mut values = vec![String::new(); tooltip.labels().len()];
        if self.x_axis.has_scale() {
            values[0] = self.x_axis.invert(x);
            if let Some(data) = &self.data {
                let Some(bucket) = self.plot.get_bucket_index(x) else {
                    return;
                };
                let Some(entry) = data.get(bucket) else {
                    return;
                };
                let fmt = |v: Option<f64>| v.map(significant_digits).unwrap_or_default();
                values[1] = self.x_axis.bucket_description(bucket, TOOLTIP_BUCKET_LEN);
                if !entry.empty {
                    values[2] = significant_digits(entry.max);
                    values[3] = fmt(entry.q3());
                    values[4] = fmt(entry.median());
                    values[5] = fmt(entry.q1());
                    values[6] = significant_digits(entry.min);
                }
                values[7] = significant_digits(entry.missing as f64);
            }
        }
        tooltip.update(values, column, row);
    }

    fn clamp_to_chart(&self, column: u16, row: u16) -> (i32, i32) {
        let (x, y) = self.surface.to_chart(column, row);
        let max_x = self.surface.chart_width().saturating_sub(1) as i32;
        let max_y = self.surface.chart_height().saturating_sub(1) as i32;
        (x.clamp(0, max_x), y.clamp(0, max_y))
    }

    /// Starts a selection when the press lands inside a rendered chart.
    pub fn drag_start(&mut self, column: u16, row: u16) -> bool {
        if self.data.is_none() || !self.surface.contains(column, row) {
            return false;
        }
        let origin = self.surface.to_chart(column, row);
        self.state = ViewState::Selecting {
            origin,
            current: origin,
        };
        true
    }

    pub fn drag_move(&mut self, column: u16, row: u16) {
        let current = self.clamp_to_chart(column, row);
        if let ViewState::Selecting { origin, .. } = self.state {
            self.state = ViewState::Selecting { origin, current };
        }
    }

    /// Ends a selection; a rectangle with zero width or height selects nothing.
    pub fn drag_end(&mut self, column: u16, row: u16) -> Option<ViewAction> {
        let ViewState::Selecting { origin, .. } = self.state else {
            return None;
        };
        let end = self.clamp_to_chart(column, row);
        self.state = ViewState::Rendered;
        let filter = self.selection_filter(origin, end)?;
        tracing::debug!(?filter, "selection");
        Some(ViewAction::Filter {
            target: self.remote_object_id.clone(),
            filter,
            ctx: DispatchContext::new(
                format!("{} filtered", self.title),
                self.chart_columns(),
                vec![0],
                ChartOptions::new(ChartKind::QuartileVector),
            ),
        })
    }

    /// Data-space rectangle between two chart cells.
    pub fn selection_filter(&self, a: (i32, i32), b: (i32, i32)) -> Option<RangeFilterPair> {
        if a.0 == b.0 || a.1 == b.1 {
            return None;
        }
        let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
        let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
        if !self.x_axis.has_scale() {
            return None;
        }

        let x = if self.x_axis.description.kind.is_string() {
            let first = self.x_axis.bucket_index(x0)?;
            let last = self.x_axis.bucket_index(x1)?;
            let (lo, _) = self.x_axis.string_bucket_bounds(first)?;
            let (_, hi) = self.x_axis.string_bucket_bounds(last)?;
            RangeFilter::strings(self.x_axis.description.clone(), lo, hi)
        } else {
            let (lo, _) = self.x_axis.cell_bounds(x0)?;
            let (_, hi) = self.x_axis.cell_bounds(x1)?;
            RangeFilter::numeric(self.x_axis.description.clone(), lo, hi)
        };

        let y = self.y_axis.as_ref().and_then(|axis| {
            // Rows grow downwards, values upwards.
            let (_, hi) = axis.cell_bounds(y0)?;
            let (lo, _) = axis.cell_bounds(y1)?;
            Some(RangeFilter::numeric(self.q_column.clone(), lo, hi))
        });
        Some(RangeFilterPair { x, y })
    }

    /// `None` leaves the chart as it is.
    pub fn change_buckets(&self, bucket_count: Option<usize>) -> Option<ViewAction> {
        let bucket_count = bucket_count?;
        Some(ViewAction::DataRanges {
            target: self.remote_object_id.clone(),
            ctx: DispatchContext::new(
                self.title.clone(),
                self.chart_columns(),
                vec![bucket_count],
                ChartOptions::new(ChartKind::QuartileVector).reuse_page(true),
            ),
        })
    }

    /// Recomputes the chart in place with the current bucket count.
    pub fn refresh(&self) -> ViewAction {
        ViewAction::DataRanges {
            target: self.remote_object_id.clone(),
            ctx: DispatchContext::new(
                self.title.clone(),
                self.chart_columns(),
                vec![self.x_axis.bucket_count],
                ChartOptions::new(ChartKind::QuartileVector).reuse_page(true),
            ),
        }
    }

    fn follow_on(&self, kind: ChartKind, columns: Vec<ColumnDescription>, hints: Vec<usize>) -> ViewAction {
        ViewAction::DataRanges {
            target: self.remote_object_id.clone(),
            ctx: DispatchContext::new(self.title.clone(), columns, hints, ChartOptions::new(kind)),
        }
    }

    pub fn do_heatmap(&self) -> ViewAction {
        self.follow_on(ChartKind::Heatmap, self.chart_columns(), vec![0, 0])
    }

    pub fn do_2d_histogram(&self) -> ViewAction {
        self.follow_on(
            ChartKind::Histogram2D,
            self.chart_columns(),
            vec![self.x_axis.bucket_count, 0],
        )
    }

    pub fn do_histogram(&self) -> ViewAction {
        self.follow_on(
            ChartKind::Histogram,
            vec![self.x_axis.description.clone()],
            vec![self.x_axis.bucket_count],
        )
    }

    /// Rows of the table sorted by X, then by the quantile column.
    pub fn show_table(&self) -> ViewAction {
        ViewAction::ShowTable {
            target: self.remote_object_id.clone(),
            schema: self.schema.clone(),
            order: RecordOrder::ascending(&self.chart_columns()),
            title: "Table".to_string(),
        }
    }

    /// How a table combined from this page is charted.
    pub fn combine_renderer(&self, title: impl Into<String>) -> DispatchContext {
        DispatchContext::new(
            title,
            self.chart_columns(),
            vec![0, 0],
            ChartOptions::new(ChartKind::QuartileVector),
        )
    }

    pub fn show_trellis(&self, column: &str) -> Result<()> {
        Err(eyre!(
            "Trellis plots by {} are not supported for quartile charts",
            column
        ))
    }

    pub fn mark_replaced(&mut self) {
        self.state = ViewState::Replaced;
    }

    pub fn csv_lines(&self) -> Result<Vec<String>> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| eyre!("Nothing to export yet"))?;
        Ok(quartiles_csv(&self.x_axis, &self.schema, data))
    }

    pub fn export(&self, saver: &dyn FileSaver) -> Result<PathBuf> {
        let lines = self.csv_lines()?;
        saver.save(CSV_FILE_NAME, &lines.join("\n"))
    }

    pub fn export_png(&self, dir: &Path) -> Result<PathBuf> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| eyre!("Nothing to export yet"))?;
        std::fs::create_dir_all(dir)?;
        let range = self.plot.y_display_range();
        let bounds = QuartilesExportBounds {
            chart_title: self.title.clone(),
            x_label: self.x_axis.display_name(&self.schema),
            y_label: self.schema.display_name(&self.q_column.name),
            y_min: range.min,
            y_max: range.max,
        };
        let path = dir.join(PNG_FILE_NAME);
        write_quartiles_png(&path, data, &self.x_axis, &bounds, PNG_SIZE)?;
        Ok(path)
    }

    pub fn serialize(&self) -> Result<QuantileVectorSerialization> {
        Ok(QuantileVectorSerialization {
            remote_object_id: Some(self.remote_object_id.clone()),
            row_count: Some(self.row_count),
            schema: Some(self.schema.serialize()?),
            column_description0: Some(self.x_axis.description.clone()),
            column_description1: Some(self.q_column.clone()),
            x_bucket_count: Some(self.x_axis.bucket_count),
            title: Some(self.title.clone()),
        })
    }

    /// Empty view with the snapshot's structure, or `None` if a required field is missing.
    pub fn reconstruct(snapshot: &QuantileVectorSerialization) -> Option<Self> {
        let cd0 = snapshot.column_description0.clone()?;
        let cd1 = snapshot.column_description1.clone()?;
        let x_bucket_count = snapshot.x_bucket_count?;
        let schema = TableSchema::deserialize(snapshot.schema.as_deref()?).ok()?;
        let remote_object_id = snapshot.remote_object_id.clone()?;
        let row_count = snapshot.row_count?;
        let title = snapshot
            .title
            .clone()
            .unwrap_or_else(|| format!("{} by {}", cd1.name, cd0.name));

        Some(Self::new(
            remote_object_id,
            row_count,
            schema,
            AxisData::new(cd0, None, x_bucket_count),
            cd1,
            title,
        ))
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        if area != self.surface.area() {
            self.resize(area);
        }
        let style = Style::default().fg(theme.get("text_primary"));
        let heading = format!(
            "{} by {}  {}",
            self.schema.display_name(&self.q_column.name),
            self.x_axis.display_name(&self.schema),
            self.summary
        );
        if area.height > 0 {
            buf.set_stringn(area.x, area.y, heading, area.width as usize, style);
        }
        self.plot.draw(&self.surface, buf, theme);

        if let ViewState::Selecting { origin, current } = self.state {
            let chart = self.surface.chart_area();
            let selection = theme.get("selection");
            let (x0, x1) = (origin.0.min(current.0), origin.0.max(current.0));
            let (y0, y1) = (origin.1.min(current.1), origin.1.max(current.1));
            for y in y0.max(0)..=y1.min(chart.height as i32 - 1) {
                for x in x0.max(0)..=x1.min(chart.width as i32 - 1) {
                    buf[(chart.x + x as u16, chart.y + y as u16)].set_bg(selection);
                }
            }
        }

        if let Some(tooltip) = &self.tooltip {
            tooltip.render(area, buf, theme);
        }
    }
}
