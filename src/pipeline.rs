//! Histogram-then-quantiles request chain behind a quartile chart.
//!
//! Phase 1 counts the non-null X values per bucket. When that stream completes, the counts go
//! into the arguments of phase 2, which returns one quartile summary per bucket. Every partial
//! phase 2 result replaces the previous rendering.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::time::{Duration, Instant};

use crate::axis::{periodic_samples, AxisData};
use crate::backend::{ComputeRequest, Payload};
use crate::quantiles::{Histogram, QuantileVectorArgs, QuantilesVector};
use crate::schema::ColumnDescription;

pub const QUANTILE_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Histogram,
    Quantiles,
    Completed,
}

/// What the owner of a pipeline should do after feeding it an event.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStep {
    Nothing,
    Render(QuantilesVector),
    Issue(ComputeRequest),
    Finished(Duration),
}

#[derive(Debug, Clone)]
pub struct QuartilesPipeline {
    phase: Phase,
    axis: AxisData,
    quantiles_column: ColumnDescription,
    last_histogram: Option<Histogram>,
    started: Instant,
}

impl QuartilesPipeline {
    pub fn new(axis: AxisData, quantiles_column: ColumnDescription) -> Self {
        Self {
            phase: Phase::Histogram,
            axis,
            quantiles_column,
            last_histogram: None,
            started: Instant::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn axis(&self) -> &AxisData {
        &self.axis
    }

    pub fn quantiles_column(&self) -> &ColumnDescription {
        &self.quantiles_column
    }

    pub fn last_histogram(&self) -> Option<&Histogram> {
        self.last_histogram.as_ref()
    }

    pub fn first_request(&self) -> Result<ComputeRequest> {
        let buckets = self
            .axis
            .buckets()
            .ok_or_else(|| eyre!("No range known for column {}", self.axis.description.name))?;
        Ok(ComputeRequest::Histogram {
            column: self.axis.description.clone(),
            buckets,
        })
    }

    pub fn on_partial(&mut self, payload: Payload) -> PipelineStep {
        match (self.phase, payload) {
            (Phase::Histogram, Payload::Histogram(h)) => {
                self.last_histogram = Some(h);
                PipelineStep::Nothing
            }
            (Phase::Quantiles, Payload::Quantiles(qv)) => PipelineStep::Render(qv),
            (phase, other) => {
                tracing::debug!(?phase, payload = ?std::mem::discriminant(&other), "ignored payload");
                PipelineStep::Nothing
            }
        }
    }

    pub fn on_completed(&mut self) -> Result<PipelineStep> {
        match self.phase {
            Phase::Histogram => {
                let args = self.quantile_args()?;
                self.phase = Phase::Quantiles;
                Ok(PipelineStep::Issue(ComputeRequest::QuantilesVector(args)))
            }
            Phase::Quantiles => {
                self.phase = Phase::Completed;
                Ok(PipelineStep::Finished(self.started.elapsed()))
            }
            Phase::Completed => Ok(PipelineStep::Nothing),
        }
    }

    pub fn quantile_args(&self) -> Result<QuantileVectorArgs> {
        let range = self
            .axis
            .data_range
            .as_ref()
            .ok_or_else(|| eyre!("No range known for column {}", self.axis.description.name))?;
        let bucket_count = self.axis.bucket_count;
        let non_null_counts = self
            .last_histogram
            .as_ref()
            .map(|h| h.buckets.clone())
            .unwrap_or_else(|| vec![0; bucket_count]);
        let (min, max, left_boundaries) = if self.axis.description.kind.is_string() {
            let samples = range.string_quantiles.as_deref().unwrap_or_default();
            (None, None, Some(periodic_samples(samples, bucket_count)))
        } else {
            (Some(range.min), Some(range.max), None)
        };
        Ok(QuantileVectorArgs {
            quantile_count: QUANTILE_COUNT,
            cd: self.axis.description.clone(),
            seed: 0,
            sampling_rate: 1.0,
            bucket_count,
            quantiles_column: self.quantiles_column.name.clone(),
            non_null_counts,
            min,
            max,
            left_boundaries,
        })
    }
}
