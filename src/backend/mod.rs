//! Compute backend boundary: requests, streamed results and cancellation.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::axis::{BucketsDescription, DataRange};
use crate::quantiles::{Histogram, Histogram2D, NextKList, QuantileVectorArgs, QuantilesVector};
use crate::schema::{ColumnDescription, TableSchema};
use crate::AppEvent;
use quartui_cli::FileFormat;

pub mod local;
pub mod sketch;
pub mod table;

pub use local::LocalBackend;

/// Name of a table registered with a backend.
pub type RemoteObjectId = String;
pub type RequestId = u64;

/// How to read a data file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenOptions {
    pub format: Option<FileFormat>,
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }
}

/// A file to load plus how to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub path: PathBuf,
    pub options: OpenOptions,
}

impl DataSource {
    pub fn new(path: impl AsRef<Path>, options: OpenOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    /// Id of the table the file loads into.
    pub fn root_id(&self) -> RemoteObjectId {
        format!("file:{}", self.path.display())
    }
}

/// What a view needs to know about a remote table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub id: RemoteObjectId,
    pub row_count: u64,
    pub schema: TableSchema,
}

/// Range restriction on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub column: ColumnDescription,
    pub min: f64,
    pub max: f64,
    /// Inclusive lower bound for string columns.
    pub min_string: Option<String>,
    /// Exclusive upper bound for string columns; `None` means unbounded.
    pub max_string: Option<String>,
}

impl RangeFilter {
    pub fn numeric(column: ColumnDescription, min: f64, max: f64) -> Self {
        Self {
            column,
            min,
            max,
            min_string: None,
            max_string: None,
        }
    }

    pub fn strings(column: ColumnDescription, min: String, max: Option<String>) -> Self {
        Self {
            column,
            min: 0.0,
            max: 0.0,
            min_string: Some(min),
            max_string: max,
        }
    }

    pub fn accepts_f64(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    pub fn accepts_str(&self, v: &str) -> bool {
        let above = self.min_string.as_deref().map(|lo| v >= lo).unwrap_or(true);
        let below = self.max_string.as_deref().map(|hi| v < hi).unwrap_or(true);
        above && below
    }
}

/// Selection rectangle in data space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilterPair {
    pub x: RangeFilter,
    pub y: Option<RangeFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOperation {
    Union,
    Intersection,
    /// Rows of the target that are not in the other table.
    Difference,
    /// The other table's rows.
    Replace,
}

impl CombineOperation {
    pub const ALL: [Self; 4] = [Self::Union, Self::Intersection, Self::Difference, Self::Replace];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Union => "Union",
            Self::Intersection => "Intersection",
            Self::Difference => "Difference",
            Self::Replace => "Replace",
        }
    }
}

/// Sort keys, most significant first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordOrder {
    pub columns: Vec<(ColumnDescription, bool)>,
}

impl RecordOrder {
    pub fn ascending(columns: &[ColumnDescription]) -> Self {
        Self {
            columns: columns.iter().map(|c| (c.clone(), true)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeRequest {
    /// Range of each column; string columns also get a sorted sample of `string_samples` values.
    DataRanges {
        columns: Vec<ColumnDescription>,
        string_samples: usize,
    },
    Histogram {
        column: ColumnDescription,
        buckets: BucketsDescription,
    },
    Histogram2D {
        x: ColumnDescription,
        x_buckets: BucketsDescription,
        y: ColumnDescription,
        y_buckets: BucketsDescription,
    },
    QuantilesVector(QuantileVectorArgs),
    Filter(RangeFilterPair),
    Combine {
        other: RemoteObjectId,
        operation: CombineOperation,
    },
    NextK {
        order: RecordOrder,
        start: u64,
        count: usize,
    },
}

impl ComputeRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DataRanges { .. } => "ranges",
            Self::Histogram { .. } => "histogram",
            Self::Histogram2D { .. } => "histogram2d",
            Self::QuantilesVector(_) => "quantiles",
            Self::Filter(_) => "filter",
            Self::Combine { .. } => "combine",
            Self::NextK { .. } => "nextk",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    DataRanges(Vec<DataRange>),
    Histogram(Histogram),
    Histogram2D(Histogram2D),
    Quantiles(QuantilesVector),
    RemoteObject(TableInfo),
    NextK(NextKList),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Cumulative result so far; `done` is the fraction of rows scanned.
    Partial { done: f64, payload: Payload },
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeMessage {
    pub request: RequestId,
    pub event: StreamEvent,
}

/// Live request; dropping it cancels the remaining work.
#[derive(Debug)]
pub struct RequestHandle {
    id: RequestId,
    cancelled: Arc<AtomicBool>,
}

impl RequestHandle {
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn token(&self) -> CancelToken {
        CancelToken(Arc::clone(&self.cancelled))
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Drop for RequestHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Worker-side view of a request's cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub trait ComputeBackend: Send + Sync {
    /// Loads a file and registers it under [`DataSource::root_id`].
    fn load(&self, source: &DataSource) -> Result<TableInfo>;

    /// Runs `request` against `target`, streaming [`ComputeMessage`]s to `reply`.
    fn submit(
        &self,
        target: &RemoteObjectId,
        request: ComputeRequest,
        reply: Sender<AppEvent>,
    ) -> RequestHandle;
}
