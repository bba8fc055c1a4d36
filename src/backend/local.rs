//! In-process backend. Tables live in memory; every request runs on its own worker thread and
//! reports a cumulative result after each shard of rows.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;

use super::sketch::{
    combine_rows, filter_rows, next_k, Histogram2DSketch, HistogramSketch, QuantilesSketch,
    RangeSketch,
};
use super::table::LocalTable;
use super::{
    CancelToken, ComputeBackend, ComputeMessage, ComputeRequest, DataSource, Payload,
    RemoteObjectId, RequestHandle, RequestId, StreamEvent, TableInfo,
};
use crate::AppEvent;

pub const DEFAULT_SHARD_ROWS: usize = 50_000;

#[derive(Clone)]
struct RemoteObject {
    table: Arc<LocalTable>,
    /// Row ids of `table` that belong to this object, ascending.
    rows: Arc<Vec<usize>>,
}

impl RemoteObject {
    fn info(&self, id: &str) -> TableInfo {
        TableInfo {
            id: id.to_string(),
            row_count: self.rows.len() as u64,
            schema: self.table.schema().clone(),
        }
    }
}

type Objects = Arc<Mutex<HashMap<RemoteObjectId, RemoteObject>>>;

pub struct LocalBackend {
    objects: Objects,
    next_request: AtomicU64,
    next_object: Arc<AtomicU64>,
    shard_rows: usize,
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SHARD_ROWS)
    }
}

impl LocalBackend {
    pub fn new(shard_rows: usize) -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            next_request: AtomicU64::new(1),
            next_object: Arc::new(AtomicU64::new(1)),
            shard_rows: shard_rows.max(1),
        }
    }

    /// Registers an in-memory table under `id`, replacing any previous one.
    pub fn register(&self, id: &str, table: LocalTable) -> Result<TableInfo> {
        let rows = (0..table.row_count()).collect();
        let object = RemoteObject {
            table: Arc::new(table),
            rows: Arc::new(rows),
        };
        let info = object.info(id);
        lock(&self.objects)?.insert(id.to_string(), object);
        Ok(info)
    }

    fn lookup(&self, id: &str) -> Result<RemoteObject> {
        lock(&self.objects)?
            .get(id)
            .cloned()
            .ok_or_else(|| eyre!("Unknown table: {}", id))
    }
}

fn lock(
    objects: &Objects,
) -> Result<std::sync::MutexGuard<'_, HashMap<RemoteObjectId, RemoteObject>>> {
    objects
        .lock()
        .map_err(|_| eyre!("Backend table registry is poisoned"))
}

impl ComputeBackend for LocalBackend {
    fn load(&self, source: &DataSource) -> Result<TableInfo> {
        let table = LocalTable::load(source)?;
        tracing::info!(
            path = %source.path.display(),
            rows = table.row_count(),
            columns = table.schema().len(),
            "loaded table"
        );
        self.register(&source.root_id(), table)
    }

    fn submit(
        &self,
        target: &RemoteObjectId,
        request: ComputeRequest,
        reply: Sender<AppEvent>,
    ) -> RequestHandle {
        let id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let handle = RequestHandle::new(id);
        let worker = Worker {
            id,
            reply,
            token: handle.token(),
            shard_rows: self.shard_rows,
        };
        tracing::debug!(request = id, kind = request.name(), target = %target, "submit");

        let object = match self.lookup(target) {
            Ok(object) => object,
            Err(e) => {
                worker.send(StreamEvent::Failed(e.to_string()));
                return handle;
            }
        };
        let other = match &request {
            ComputeRequest::Combine { other, .. } => match self.lookup(other) {
                Ok(o) => Some(o),
                Err(e) => {
                    worker.send(StreamEvent::Failed(e.to_string()));
                    return handle;
                }
            },
            _ => None,
        };
        let objects = Arc::clone(&self.objects);
        let next_object = Arc::clone(&self.next_object);

        let spawned = thread::Builder::new()
            .name(format!("compute-{}", id))
            .spawn(move || {
                let registry = Registry {
                    objects,
                    next_object,
                };
                match worker.run(&object, other.as_ref(), request, &registry) {
                    Ok(true) => {
                        worker.send(StreamEvent::Completed);
                    }
                    Ok(false) => tracing::debug!(request = worker.id, "cancelled"),
                    Err(e) => {
                        tracing::warn!(request = worker.id, error = %e, "request failed");
                        worker.send(StreamEvent::Failed(e.to_string()));
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::error!(request = id, error = %e, "could not start worker");
        }
        handle
    }
}

/// Where derived tables are registered.
struct Registry {
    objects: Objects,
    next_object: Arc<AtomicU64>,
}

impl Registry {
    fn insert(&self, object: RemoteObject, prefix: &str) -> Result<TableInfo> {
        let n = self.next_object.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}:{}", prefix, n);
        let info = object.info(&id);
        lock(&self.objects)?.insert(id, object);
        Ok(info)
    }
}

struct Worker {
    id: RequestId,
    reply: Sender<AppEvent>,
    token: CancelToken,
    shard_rows: usize,
}

impl Worker {
    /// False once the app has dropped its receiver.
    fn send(&self, event: StreamEvent) -> bool {
        self.reply
            .send(AppEvent::Compute(ComputeMessage {
                request: self.id,
                event,
            }))
            .is_ok()
    }

    fn live(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Feeds `rows` shard by shard to `step`, sending the cumulative payload after each one.
    /// Returns false if the request was cancelled along the way.
    fn stream<F>(&self, rows: &[usize], mut step: F) -> bool
    where
        F: FnMut(&[usize]) -> Payload,
    {
        let shards: Vec<&[usize]> = if rows.is_empty() {
            vec![rows]
        } else {
            rows.chunks(self.shard_rows).collect()
        };
        let total = shards.len();
        for (i, shard) in shards.into_iter().enumerate() {
            if !self.live() {
                return false;
            }
            let payload = step(shard);
            let done = (i + 1) as f64 / total as f64;
            if !self.send(StreamEvent::Partial { done, payload }) {
                return false;
            }
        }
        self.live()
    }

    fn run(
        &self,
        object: &RemoteObject,
        other: Option<&RemoteObject>,
        request: ComputeRequest,
        registry: &Registry,
    ) -> Result<bool> {
        let table = object.table.as_ref();
        let rows = object.rows.as_slice();
        match request {
            ComputeRequest::DataRanges {
                columns,
                string_samples,
            } => {
                let values = columns
                    .iter()
                    .map(|cd| table.column(&cd.name))
                    .collect::<Result<Vec<_>>>()?;
                let mut sketches: Vec<RangeSketch> =
                    values.iter().map(|_| RangeSketch::new(string_samples)).collect();
                Ok(self.stream(rows, |shard| {
                    for (sketch, v) in sketches.iter_mut().zip(values.iter()) {
                        sketch.add(v, shard);
                    }
                    Payload::DataRanges(
                        sketches
                            .iter()
                            .zip(values.iter())
                            .map(|(s, v)| s.result(v))
                            .collect(),
                    )
                }))
            }
            ComputeRequest::Histogram { column, buckets } => {
                let values = table.column(&column.name)?;
                let mut sketch = HistogramSketch::new(buckets);
                Ok(self.stream(rows, |shard| {
                    sketch.add(values, shard);
                    Payload::Histogram(sketch.result().clone())
                }))
            }
            ComputeRequest::Histogram2D {
                x,
                x_buckets,
                y,
                y_buckets,
            } => {
                let xv = table.column(&x.name)?;
                let yv = table.column(&y.name)?;
                let mut sketch = Histogram2DSketch::new(x_buckets, y_buckets);
                Ok(self.stream(rows, |shard| {
                    sketch.add(xv, yv, shard);
                    Payload::Histogram2D(sketch.result().clone())
                }))
            }
            ComputeRequest::QuantilesVector(args) => {
                let q_kind = table
                    .schema()
                    .find(&args.quantiles_column)
                    .map(|cd| cd.kind)
                    .ok_or_else(|| eyre!("Column not found: {}", args.quantiles_column))?;
                if !q_kind.is_numeric() {
                    return Err(eyre!("Quantiles require a numeric column"));
                }
                let xv = table.column(&args.cd.name)?;
                let qv = table.column(&args.quantiles_column)?;
                let mut sketch = QuantilesSketch::new(&args)?;
                Ok(self.stream(rows, |shard| {
                    sketch.add(xv, qv, shard);
                    Payload::Quantiles(sketch.result())
                }))
            }
            ComputeRequest::Filter(filter) => {
                let kept = filter_rows(table, rows, &filter)?;
                if !self.live() {
                    return Ok(false);
                }
                let info = registry.insert(
                    RemoteObject {
                        table: Arc::clone(&object.table),
                        rows: Arc::new(kept),
                    },
                    "filter",
                )?;
                Ok(self.send(StreamEvent::Partial {
                    done: 1.0,
                    payload: Payload::RemoteObject(info),
                }) && self.live())
            }
            ComputeRequest::Combine { operation, .. } => {
                let other = other.ok_or_else(|| eyre!("Combine needs a second table"))?;
                if !Arc::ptr_eq(&object.table, &other.table) {
                    return Err(eyre!("Only views of the same dataset can be combined"));
                }
                let rows = combine_rows(rows, &other.rows, operation);
                let info = registry.insert(
                    RemoteObject {
                        table: Arc::clone(&object.table),
                        rows: Arc::new(rows),
                    },
                    "combine",
                )?;
                Ok(self.send(StreamEvent::Partial {
                    done: 1.0,
                    payload: Payload::RemoteObject(info),
                }) && self.live())
            }
            ComputeRequest::NextK {
                order,
                start,
                count,
            } => {
                let page = next_k(table, rows, &order, start, count)?;
                Ok(self.send(StreamEvent::Partial {
                    done: 1.0,
                    payload: Payload::NextK(page),
                }) && self.live())
            }
        }
    }
}
