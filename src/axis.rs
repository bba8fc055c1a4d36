//! Axis and bucket mapping.
//!
//! An [`AxisData`] ties a column to its value range and a bucket count, and once a chart has been
//! laid out, to a cell resolution. It owns every conversion between terminal cells, bucket indices
//! and data values. Charts copy it; nothing shares one.

use serde::{Deserialize, Serialize};

use crate::format::{format_date_millis, significant_digits, truncate};
use crate::schema::{ColumnDescription, ContentsKind, TableSchema};

/// Which edge of the chart an axis runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisKind {
    /// Cells count left to right.
    Bottom,
    /// Cells count top to bottom; values grow upwards.
    Left,
}

/// Range of a column as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRange {
    pub min: f64,
    pub max: f64,
    pub present_count: u64,
    pub missing_count: u64,
    /// Sorted sample of distinct values; only set for string columns.
    pub string_quantiles: Option<Vec<String>>,
}

impl DataRange {
    pub fn numeric(min: f64, max: f64, present_count: u64, missing_count: u64) -> Self {
        Self {
            min,
            max,
            present_count,
            missing_count,
            string_quantiles: None,
        }
    }

    pub fn strings(samples: Vec<String>, present_count: u64, missing_count: u64) -> Self {
        Self {
            min: 0.0,
            max: samples.len().saturating_sub(1) as f64,
            present_count,
            missing_count,
            string_quantiles: Some(samples),
        }
    }
}

/// How values are split into buckets for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BucketsDescription {
    /// `count` equal-width buckets over `[min, max]`; the last bucket includes `max`.
    Numeric { min: f64, max: f64, count: usize },
    /// Bucket `i` holds values in `[left_boundaries[i], left_boundaries[i + 1])`; the last is unbounded above.
    Strings { left_boundaries: Vec<String> },
}

impl BucketsDescription {
    pub fn count(&self) -> usize {
        match self {
            Self::Numeric { count, .. } => *count,
            Self::Strings { left_boundaries } => left_boundaries.len(),
        }
    }

    pub fn index_of_f64(&self, v: f64) -> Option<usize> {
        let Self::Numeric { min, max, count } = self else {
            return None;
        };
        if *count == 0 || v.is_nan() || v < *min || v > *max {
            return None;
        }
        if max <= min {
            return Some(0);
        }
        if v == *max {
            return Some(count - 1);
        }
        let idx = ((v - min) / (max - min) * *count as f64).floor() as usize;
        Some(idx.min(count - 1))
    }

    pub fn index_of_str(&self, v: &str) -> Option<usize> {
        let Self::Strings { left_boundaries } = self else {
            return None;
        };
        // Number of boundaries <= v, minus one.
        let above = left_boundaries.partition_point(|b| b.as_str() <= v);
        above.checked_sub(1)
    }
}

/// Evenly spaced samples of a sorted sequence: indices `i * len / count`, or all of it when
/// `count >= len`.
pub fn periodic_samples<T: Clone>(sorted: &[T], count: usize) -> Vec<T> {
    if count >= sorted.len() {
        return sorted.to_vec();
    }
    (0..count)
        .map(|i| sorted[i * sorted.len() / count].clone())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resolution {
    cells: u16,
    kind: AxisKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisData {
    pub description: ColumnDescription,
    pub data_range: Option<DataRange>,
    pub bucket_count: usize,
    resolution: Option<Resolution>,
}

impl AxisData {
    pub fn new(description: ColumnDescription, data_range: Option<DataRange>, bucket_count: usize) -> Self {
        let mut bucket_count = bucket_count;
        if description.kind.is_string() {
            if let Some(samples) = data_range.as_ref().and_then(|r| r.string_quantiles.as_ref()) {
                if !samples.is_empty() {
                    bucket_count = bucket_count.min(samples.len());
                }
            }
        }
        Self {
            description,
            data_range,
            bucket_count,
            resolution: None,
        }
    }

    pub fn set_resolution(&mut self, cells: u16, kind: AxisKind) {
        self.resolution = Some(Resolution { cells, kind });
    }

    pub fn resolution(&self) -> Option<(u16, AxisKind)> {
        self.resolution.map(|r| (r.cells, r.kind))
    }

    /// True once the axis knows both its range and its size on screen.
    pub fn has_scale(&self) -> bool {
        self.data_range.is_some() && self.resolution.map(|r| r.cells > 0).unwrap_or(false)
    }

    pub fn display_name(&self, schema: &TableSchema) -> String {
        schema.display_name(&self.description.name)
    }

    pub fn buckets(&self) -> Option<BucketsDescription> {
        let range = self.data_range.as_ref()?;
        if self.description.kind.is_string() {
            let samples = range.string_quantiles.as_ref()?;
            Some(BucketsDescription::Strings {
                left_boundaries: periodic_samples(samples, self.bucket_count),
            })
        } else {
            Some(BucketsDescription::Numeric {
                min: range.min,
                max: range.max,
                count: self.bucket_count,
            })
        }
    }

    /// Cell position along the axis, counted in the direction values grow.
    fn oriented(&self, cell: i32) -> Option<(i32, i32)> {
        let res = self.resolution?;
        let cells = res.cells as i32;
        if cells <= 0 || cell < 0 || cell >= cells {
            return None;
        }
        match res.kind {
            AxisKind::Bottom => Some((cell, cells)),
            AxisKind::Left => Some((cells - 1 - cell, cells)),
        }
    }

    /// Bucket under a cell, or `None` outside `[0, cells)` or before a resolution is set.
    pub fn bucket_index(&self, cell: i32) -> Option<usize> {
        if self.bucket_count == 0 {
            return None;
        }
        let (pos, cells) = self.oriented(cell)?;
        let idx = pos as usize * self.bucket_count / cells as usize;
        Some(idx.min(self.bucket_count - 1))
    }

    /// Numeric value at the centre of a cell; `None` for string axes.
    pub fn value_at(&self, cell: i32) -> Option<f64> {
        if self.description.kind.is_string() {
            return None;
        }
        let range = self.data_range.as_ref()?;
        let (pos, cells) = self.oriented(cell)?;
        let fraction = (pos as f64 + 0.5) / cells as f64;
        Some(range.min + fraction * (range.max - range.min))
    }

    /// Values at the low and high edges of a cell; the outermost cells end exactly at the range
    /// bounds. `None` for string axes.
    pub fn cell_bounds(&self, cell: i32) -> Option<(f64, f64)> {
        if self.description.kind.is_string() {
            return None;
        }
        let range = self.data_range.as_ref()?;
        let (pos, cells) = self.oriented(cell)?;
        let at = |edge: i32| {
            if edge <= 0 {
                range.min
            } else if edge >= cells {
                range.max
            } else {
                range.min + edge as f64 / cells as f64 * (range.max - range.min)
            }
        };
        Some((at(pos), at(pos + 1)))
    }

    /// Display value under a cell; empty when the cell is off the axis.
    pub fn invert(&self, cell: i32) -> String {
        if self.description.kind.is_string() {
            let Some(samples) = self
                .data_range
                .as_ref()
                .and_then(|r| r.string_quantiles.as_ref())
            else {
                return String::new();
            };
            let Some((pos, cells)) = self.oriented(cell) else {
                return String::new();
            };
            let idx = pos as usize * samples.len() / cells as usize;
            return samples
                .get(idx.min(samples.len().saturating_sub(1)))
                .cloned()
                .unwrap_or_default();
        }
        self.value_at(cell)
            .map(|v| self.format_value(v))
            .unwrap_or_default()
    }

    pub fn format_value(&self, v: f64) -> String {
        match self.description.kind {
            ContentsKind::Date => format_date_millis(v),
            ContentsKind::Integer => format!("{}", v.round()),
            _ => significant_digits(v),
        }
    }

    /// Numeric bounds of a bucket.
    pub fn bucket_bounds(&self, bucket: usize) -> Option<(f64, f64)> {
        let range = self.data_range.as_ref()?;
        if self.description.kind.is_string() || bucket >= self.bucket_count {
            return None;
        }
        let width = (range.max - range.min) / self.bucket_count as f64;
        let lo = range.min + width * bucket as f64;
        let hi = if bucket + 1 == self.bucket_count {
            range.max
        } else {
            lo + width
        };
        Some((lo, hi))
    }

    /// Left boundary strings of a string bucket and of the next bucket, if any.
    pub fn string_bucket_bounds(&self, bucket: usize) -> Option<(String, Option<String>)> {
        let Some(BucketsDescription::Strings { left_boundaries }) = self.buckets() else {
            return None;
        };
        let lo = left_boundaries.get(bucket)?.clone();
        Some((lo, left_boundaries.get(bucket + 1).cloned()))
    }

    /// Label for a bucket, cut to `max_len` characters (0 keeps it whole).
    pub fn bucket_description(&self, bucket: usize, max_len: usize) -> String {
        if bucket >= self.bucket_count {
            return String::new();
        }
        let text = if self.description.kind.is_string() {
            self.string_bucket_description(bucket)
        } else {
            match self.bucket_bounds(bucket) {
                Some((lo, hi)) => {
                    let close = if bucket + 1 == self.bucket_count { "]" } else { ")" };
                    format!("[{}, {}{}", self.format_value(lo), self.format_value(hi), close)
                }
                None => String::new(),
            }
        };
        truncate(&text, max_len)
    }

    fn string_bucket_description(&self, bucket: usize) -> String {
        let Some(samples) = self
            .data_range
            .as_ref()
            .and_then(|r| r.string_quantiles.as_ref())
        else {
            return String::new();
        };
        let Some((lo, next)) = self.string_bucket_bounds(bucket) else {
            return String::new();
        };
        let lo_pos = samples.partition_point(|s| s < &lo);
        match next {
            Some(hi) => {
                let hi_pos = samples.partition_point(|s| s < &hi);
                if hi_pos == lo_pos + 1 {
                    lo
                } else {
                    format!("[{}, {})", lo, hi)
                }
            }
            None => {
                let last = samples.last().cloned().unwrap_or_default();
                if lo_pos + 1 >= samples.len() {
                    lo
                } else {
                    format!("[{}, {}]", lo, last)
                }
            }
        }
    }
}
