//! Chooses the chart, and its first request, from a chart kind and the ranges of its columns.

use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::axis::{AxisData, DataRange};
use crate::backend::ComputeRequest;
use crate::pipeline::QuartilesPipeline;
use crate::schema::{ColumnDescription, ContentsKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    QuartileVector,
    Histogram,
    /// Stacked histogram of X split by Y.
    Histogram2D,
    Heatmap,
}

impl ChartKind {
    /// Number of columns a chart of this kind plots.
    pub fn column_count(self) -> usize {
        match self {
            Self::Histogram => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    pub chart_kind: ChartKind,
    /// Replace the requesting page instead of opening a new one.
    pub reuse_page: bool,
}

impl ChartOptions {
    pub fn new(chart_kind: ChartKind) -> Self {
        Self {
            chart_kind,
            reuse_page: false,
        }
    }

    pub fn reuse_page(mut self, reuse_page: bool) -> Self {
        self.reuse_page = reuse_page;
        self
    }
}

/// Everything a follow-on chart needs besides the ranges of its columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchContext {
    pub title: String,
    pub columns: Vec<ColumnDescription>,
    /// Requested bucket count per column; 0 lets the dispatcher choose.
    pub bucket_hints: Vec<usize>,
    pub options: ChartOptions,
}

impl DispatchContext {
    pub fn new(
        title: impl Into<String>,
        columns: Vec<ColumnDescription>,
        bucket_hints: Vec<usize>,
        options: ChartOptions,
    ) -> Self {
        Self {
            title: title.into(),
            columns,
            bucket_hints,
            options,
        }
    }

    fn hint(&self, index: usize) -> usize {
        self.bucket_hints.get(index).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub enum DispatchPlan {
    Histogram {
        axis: AxisData,
        request: ComputeRequest,
    },
    Histogram2D {
        x: AxisData,
        y: AxisData,
        heatmap: bool,
        request: ComputeRequest,
    },
    Quartiles(QuartilesPipeline),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartDispatcher {
    pub default_buckets: usize,
    pub max_buckets: usize,
}

impl ChartDispatcher {
    pub fn new(default_buckets: usize, max_buckets: usize) -> Self {
        Self {
            default_buckets: default_buckets.max(1),
            max_buckets: max_buckets.max(1),
        }
    }

    /// Bucket count for a column: the hint, or the default when the hint is 0, capped by the
    /// configured maximum, the span of an integer column and the sample size of a string column.
    pub fn choose_bucket_count(&self, hint: usize, cd: &ColumnDescription, range: &DataRange) -> usize {
        let mut count = if hint == 0 { self.default_buckets } else { hint };
        count = count.min(self.max_buckets);
        match cd.kind {
            ContentsKind::Integer if range.max >= range.min => {
                let span = (range.max - range.min).floor() as usize + 1;
                count = count.min(span);
            }
            ContentsKind::String | ContentsKind::Category => {
                if let Some(samples) = &range.string_quantiles {
                    count = count.min(samples.len());
                }
            }
            _ => {}
        }
        count.max(1)
    }

    fn axis(&self, ctx: &DispatchContext, index: usize, ranges: &[DataRange]) -> Result<AxisData> {
        let cd = ctx
            .columns
            .get(index)
            .ok_or_else(|| eyre!("Chart needs {} columns", ctx.options.chart_kind.column_count()))?;
        let range = ranges
            .get(index)
            .ok_or_else(|| eyre!("No range received for column {}", cd.name))?;
        let count = self.choose_bucket_count(ctx.hint(index), cd, range);
        Ok(AxisData::new(cd.clone(), Some(range.clone()), count))
    }

    pub fn dispatch(&self, ctx: &DispatchContext, ranges: &[DataRange]) -> Result<DispatchPlan> {
        let x_range = ranges
            .first()
            .ok_or_else(|| eyre!("No range received for the X column"))?;
        if x_range.present_count == 0 {
            let name = ctx.columns.first().map(|c| c.name.as_str()).unwrap_or("X");
            return Err(eyre!("All values of column {} are missing", name));
        }
        let x = self.axis(ctx, 0, ranges)?;
        tracing::debug!(
            kind = ?ctx.options.chart_kind,
            column = %x.description.name,
            buckets = x.bucket_count,
            "dispatch"
        );
        match ctx.options.chart_kind {
            ChartKind::Histogram => {
                let buckets = x
                    .buckets()
                    .ok_or_else(|| eyre!("No buckets for column {}", x.description.name))?;
                let request = ComputeRequest::Histogram {
                    column: x.description.clone(),
                    buckets,
                };
                Ok(DispatchPlan::Histogram { axis: x, request })
            }
            ChartKind::Histogram2D | ChartKind::Heatmap => {
                let y = self.axis(ctx, 1, ranges)?;
                let (Some(x_buckets), Some(y_buckets)) = (x.buckets(), y.buckets()) else {
                    return Err(eyre!("No buckets for the chart columns"));
                };
                let request = ComputeRequest::Histogram2D {
                    x: x.description.clone(),
                    x_buckets,
                    y: y.description.clone(),
                    y_buckets,
                };
                Ok(DispatchPlan::Histogram2D {
                    x,
                    y,
                    heatmap: ctx.options.chart_kind == ChartKind::Heatmap,
                    request,
                })
            }
            ChartKind::QuartileVector => {
                let q = ctx
                    .columns
                    .get(1)
                    .ok_or_else(|| eyre!("Quartile chart needs a second column"))?;
                if !q.kind.is_numeric() {
                    return Err(eyre!("Quantiles require a numeric column"));
                }
                Ok(DispatchPlan::Quartiles(QuartilesPipeline::new(x, q.clone())))
            }
        }
    }
}
