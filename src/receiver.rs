//! State of each outstanding request, turning stream events into something the app can apply.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::time::{Duration, Instant};

use crate::axis::DataRange;
use crate::backend::{ComputeRequest, Payload, StreamEvent, TableInfo};
use crate::dispatch::DispatchContext;
use crate::pipeline::{PipelineStep, QuartilesPipeline};
use crate::quantiles::{Histogram, Histogram2D, NextKList, QuantilesVector};

#[derive(Debug, Clone)]
pub enum Receiver {
    /// Column ranges that decide the chart to open next.
    DataRanges {
        ctx: DispatchContext,
        last: Option<Vec<DataRange>>,
    },
    Quartiles(QuartilesPipeline),
    Histogram { started: Instant },
    Histogram2D { started: Instant },
    /// Filter or combine; the new table is opened with `ctx` once the stream completes.
    NewObject {
        ctx: DispatchContext,
        info: Option<TableInfo>,
    },
    NextK,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Nothing,
    Ranges {
        ctx: DispatchContext,
        ranges: Vec<DataRange>,
    },
    UpdateQuartiles(QuantilesVector),
    UpdateHistogram(Histogram),
    UpdateHistogram2D(Histogram2D),
    /// Next request of the same chain; the receiver stays attached to it.
    Issue(ComputeRequest),
    Completed(Duration),
    NewObject {
        info: TableInfo,
        ctx: DispatchContext,
    },
    Rows(NextKList),
}

impl Receiver {
    pub fn data_ranges(ctx: DispatchContext) -> Self {
        Self::DataRanges { ctx, last: None }
    }

    pub fn new_object(ctx: DispatchContext) -> Self {
        Self::NewObject { ctx, info: None }
    }

    pub fn histogram() -> Self {
        Self::Histogram {
            started: Instant::now(),
        }
    }

    pub fn histogram_2d() -> Self {
        Self::Histogram2D {
            started: Instant::now(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DataRanges { .. } => "ranges",
            Self::Quartiles(_) => "quartiles",
            Self::Histogram { .. } => "histogram",
            Self::Histogram2D { .. } => "histogram2d",
            Self::NewObject { .. } => "new-object",
            Self::NextK => "nextk",
        }
    }

    pub fn on_event(&mut self, event: StreamEvent) -> Result<Outcome> {
        match event {
            StreamEvent::Failed(message) => Err(eyre!(message)),
            StreamEvent::Partial { payload, .. } => Ok(self.on_partial(payload)),
            StreamEvent::Completed => self.on_completed(),
        }
    }

    fn on_partial(&mut self, payload: Payload) -> Outcome {
        match (self, payload) {
            (Self::DataRanges { last, .. }, Payload::DataRanges(ranges)) => {
                *last = Some(ranges);
                Outcome::Nothing
            }
            (Self::Quartiles(pipeline), payload) => match pipeline.on_partial(payload) {
                PipelineStep::Render(qv) => Outcome::UpdateQuartiles(qv),
                _ => Outcome::Nothing,
            },
            (Self::Histogram { .. }, Payload::Histogram(h)) => Outcome::UpdateHistogram(h),
            (Self::Histogram2D { .. }, Payload::Histogram2D(h)) => Outcome::UpdateHistogram2D(h),
            (Self::NewObject { info, .. }, Payload::RemoteObject(table)) => {
                *info = Some(table);
                Outcome::Nothing
            }
            (Self::NextK, Payload::NextK(list)) => Outcome::Rows(list),
            _ => Outcome::Nothing,
        }
    }

    fn on_completed(&mut self) -> Result<Outcome> {
        match self {
            Self::DataRanges { ctx, last } => {
                let ranges = last
                    .take()
                    .ok_or_else(|| eyre!("No column ranges were received"))?;
                Ok(Outcome::Ranges {
                    ctx: ctx.clone(),
                    ranges,
                })
            }
            Self::Quartiles(pipeline) => Ok(match pipeline.on_completed()? {
                PipelineStep::Issue(request) => Outcome::Issue(request),
                PipelineStep::Finished(elapsed) => Outcome::Completed(elapsed),
                _ => Outcome::Nothing,
            }),
            Self::Histogram { started } | Self::Histogram2D { started } => {
                Ok(Outcome::Completed(started.elapsed()))
            }
            Self::NewObject { ctx, info } => {
                let info = info
                    .take()
                    .ok_or_else(|| eyre!("The backend did not return a table"))?;
                Ok(Outcome::NewObject {
                    info,
                    ctx: ctx.clone(),
                })
            }
            Self::NextK => Ok(Outcome::Nothing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisData;
    use crate::dispatch::{ChartKind, ChartOptions};
    use crate::schema::{ColumnDescription, ContentsKind, TableSchema};

    fn ctx() -> DispatchContext {
        DispatchContext::new(
            "t filtered",
            vec![ColumnDescription::new("x", ContentsKind::Double)],
            vec![0],
            ChartOptions::new(ChartKind::QuartileVector),
        )
    }

    #[test]
    fn failure_becomes_error() {
        let mut r = Receiver::histogram();
        let err = r.on_event(StreamEvent::Failed("boom".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn ranges_delivered_on_completion() {
        let mut r = Receiver::data_ranges(ctx());
        let ranges = vec![DataRange::numeric(0.0, 1.0, 3, 0)];
        let out = r
            .on_event(StreamEvent::Partial {
                done: 1.0,
                payload: Payload::DataRanges(ranges.clone()),
            })
            .unwrap();
        assert_eq!(out, Outcome::Nothing);
        assert_eq!(
            r.on_event(StreamEvent::Completed).unwrap(),
            Outcome::Ranges { ctx: ctx(), ranges }
        );
    }

    #[test]
    fn ranges_missing_at_completion() {
        let mut r = Receiver::data_ranges(ctx());
        assert!(r.on_event(StreamEvent::Completed).is_err());
    }

    #[test]
    fn quartiles_chain_through_pipeline() {
        let axis = AxisData::new(
            ColumnDescription::new("x", ContentsKind::Double),
            Some(DataRange::numeric(0.0, 1.0, 3, 0)),
            2,
        );
        let mut r = Receiver::Quartiles(QuartilesPipeline::new(
            axis,
            ColumnDescription::new("q", ContentsKind::Double),
        ));
        assert!(matches!(
            r.on_event(StreamEvent::Completed).unwrap(),
            Outcome::Issue(ComputeRequest::QuantilesVector(_))
        ));
        let qv = QuantilesVector::default();
        assert_eq!(
            r.on_event(StreamEvent::Partial {
                done: 0.5,
                payload: Payload::Quantiles(qv.clone())
            })
            .unwrap(),
            Outcome::UpdateQuartiles(qv)
        );
        assert!(matches!(
            r.on_event(StreamEvent::Completed).unwrap(),
            Outcome::Completed(_)
        ));
    }

    #[test]
    fn new_object_opens_with_context() {
        let mut r = Receiver::new_object(ctx());
        let info = TableInfo {
            id: "filter:1".to_string(),
            row_count: 4,
            schema: TableSchema::default(),
        };
        r.on_event(StreamEvent::Partial {
            done: 1.0,
            payload: Payload::RemoteObject(info.clone()),
        })
        .unwrap();
        assert_eq!(
            r.on_event(StreamEvent::Completed).unwrap(),
            Outcome::NewObject { info, ctx: ctx() }
        );
    }
}
