//! Page contents and the follow-up work they ask the app to start.

use ratatui::{buffer::Buffer, layout::Rect};

use crate::backend::{RangeFilterPair, RecordOrder, RemoteObjectId};
use crate::config::Theme;
use crate::dispatch::DispatchContext;
use crate::schema::TableSchema;

pub mod heatmap;
pub mod histogram;
pub mod quartiles;
pub mod table;

pub use heatmap::HeatmapView;
pub use histogram::HistogramView;
pub use quartiles::QuartilesView;
pub use table::TableView;

/// Work a view hands back to the app; views never talk to the backend themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    /// Fetch the ranges of `ctx.columns` on `target`, then open the chart `ctx` describes.
    DataRanges {
        target: RemoteObjectId,
        ctx: DispatchContext,
    },
    /// Filter `target`; the resulting table is charted with `ctx` on a new page.
    Filter {
        target: RemoteObjectId,
        filter: RangeFilterPair,
        ctx: DispatchContext,
    },
    /// Open a table page listing the rows of `target` in `order`.
    ShowTable {
        target: RemoteObjectId,
        schema: TableSchema,
        order: RecordOrder,
        title: String,
    },
}

pub enum PageView {
    Quartiles(QuartilesView),
    Histogram(HistogramView),
    /// Heatmap or stacked 2D histogram.
    Heatmap(HeatmapView),
    Table(TableView),
}

impl PageView {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quartiles(_) => "quartiles",
            Self::Histogram(_) => "histogram",
            Self::Heatmap(_) => "heatmap",
            Self::Table(_) => "table",
        }
    }

    /// Table the page shows.
    pub fn remote_object_id(&self) -> &RemoteObjectId {
        match self {
            Self::Quartiles(v) => v.remote_object_id(),
            Self::Histogram(v) => v.remote_object_id(),
            Self::Heatmap(v) => v.remote_object_id(),
            Self::Table(v) => v.remote_object_id(),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Quartiles(v) => v.summary().to_string(),
            Self::Histogram(v) => v.summary(),
            Self::Heatmap(v) => v.summary(),
            Self::Table(v) => v.summary(),
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        match self {
            Self::Quartiles(v) => v.render(area, buf, theme),
            Self::Histogram(v) => v.render(area, buf, theme),
            Self::Heatmap(v) => v.render(area, buf, theme),
            Self::Table(v) => v.render(area, buf, theme),
        }
    }
}
