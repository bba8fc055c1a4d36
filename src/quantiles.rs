//! Result payloads of the bucketed sketches.

use serde::{Deserialize, Serialize};

use crate::schema::ColumnDescription;

/// Quartile summary of one X bucket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuantilesEntry {
    /// No row of the bucket has a value in the quantile column.
    pub empty: bool,
    pub min: f64,
    pub max: f64,
    /// Rows of the bucket whose quantile column is null.
    pub missing: u64,
    /// Up to three interior quantiles in order: q1, median, q3.
    pub samples: Vec<f64>,
}

impl QuantilesEntry {
    pub fn empty(missing: u64) -> Self {
        Self {
            empty: true,
            missing,
            ..Default::default()
        }
    }

    pub fn q1(&self) -> Option<f64> {
        self.samples.first().copied()
    }

    /// Falls back to q1 when fewer than two samples exist.
    pub fn median(&self) -> Option<f64> {
        self.samples.get(1).copied().or_else(|| self.q1())
    }

    /// Falls back to the median when fewer than three samples exist.
    pub fn q3(&self) -> Option<f64> {
        self.samples.get(2).copied().or_else(|| self.median())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuantilesVector {
    pub data: Vec<QuantilesEntry>,
}

impl QuantilesVector {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, bucket: usize) -> Option<&QuantilesEntry> {
        self.data.get(bucket)
    }
}

/// Arguments of a quantiles-vector request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileVectorArgs {
    pub quantile_count: usize,
    /// Column bucketed along X.
    pub cd: ColumnDescription,
    pub seed: u64,
    pub sampling_rate: f64,
    pub bucket_count: usize,
    /// Column whose quantiles are computed.
    pub quantiles_column: String,
    /// Non-null X counts per bucket, from the histogram phase.
    pub non_null_counts: Vec<u64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub left_boundaries: Option<Vec<String>>,
}

/// Per-bucket non-null counts of one column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Histogram {
    pub buckets: Vec<u64>,
    pub missing: u64,
}

impl Histogram {
    pub fn zeros(count: usize) -> Self {
        Self {
            buckets: vec![0; count],
            missing: 0,
        }
    }

    /// Bucket-wise sum; histograms over the same buckets form a monoid under this.
    pub fn add(&self, other: &Histogram) -> Histogram {
        let len = self.buckets.len().max(other.buckets.len());
        let buckets = (0..len)
            .map(|i| {
                self.buckets.get(i).copied().unwrap_or(0) + other.buckets.get(i).copied().unwrap_or(0)
            })
            .collect();
        Histogram {
            buckets,
            missing: self.missing + other.missing,
        }
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.buckets.iter().copied().max().unwrap_or(0)
    }
}

/// Counts over X buckets by Y buckets; `counts[x][y]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Histogram2D {
    pub counts: Vec<Vec<u64>>,
    /// Rows with a null X.
    pub x_missing: u64,
    /// Rows with a non-null X and a null Y.
    pub y_missing: u64,
}

impl Histogram2D {
    pub fn zeros(x_count: usize, y_count: usize) -> Self {
        Self {
            counts: vec![vec![0; y_count]; x_count],
            x_missing: 0,
            y_missing: 0,
        }
    }

    pub fn x_count(&self) -> usize {
        self.counts.len()
    }

    pub fn y_count(&self) -> usize {
        self.counts.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn max_count(&self) -> u64 {
        self.counts
            .iter()
            .flat_map(|col| col.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Total of one X bucket over every Y bucket.
    pub fn column_total(&self, x: usize) -> u64 {
        self.counts.get(x).map(|c| c.iter().sum()).unwrap_or(0)
    }

    pub fn add(&self, other: &Histogram2D) -> Histogram2D {
        let mut out = self.clone();
        for (x, col) in other.counts.iter().enumerate() {
            if x >= out.counts.len() {
                out.counts.push(col.clone());
                continue;
            }
            for (y, c) in col.iter().enumerate() {
                match out.counts[x].get_mut(y) {
                    Some(v) => *v += c,
                    None => out.counts[x].push(*c),
                }
            }
        }
        out.x_missing += other.x_missing;
        out.y_missing += other.y_missing;
        out
    }
}

/// A page of rows in a requested order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NextKList {
    pub rows: Vec<Vec<String>>,
    pub start_position: u64,
    pub row_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(samples: &[f64]) -> QuantilesEntry {
        QuantilesEntry {
            empty: false,
            min: 0.0,
            max: 10.0,
            missing: 0,
            samples: samples.to_vec(),
        }
    }

    #[test]
    fn degeneracy_no_samples() {
        let e = entry(&[]);
        assert_eq!(e.q1(), None);
        assert_eq!(e.median(), None);
        assert_eq!(e.q3(), None);
    }

    #[test]
    fn degeneracy_one_sample() {
        let e = entry(&[4.0]);
        assert_eq!(e.q1(), Some(4.0));
        assert_eq!(e.median(), Some(4.0));
        assert_eq!(e.q3(), Some(4.0));
    }

    #[test]
    fn degeneracy_two_samples() {
        let e = entry(&[4.0, 6.0]);
        assert_eq!(e.q1(), Some(4.0));
        assert_eq!(e.median(), Some(6.0));
        assert_eq!(e.q3(), Some(6.0));
    }

    #[test]
    fn three_samples_used_as_is() {
        let e = entry(&[4.0, 6.0, 8.0]);
        assert_eq!((e.q1(), e.median(), e.q3()), (Some(4.0), Some(6.0), Some(8.0)));
    }

    #[test]
    fn histogram_add_is_bucketwise() {
        let a = Histogram {
            buckets: vec![1, 2, 3],
            missing: 1,
        };
        let b = Histogram {
            buckets: vec![4, 0, 1],
            missing: 2,
        };
        let sum = a.add(&b);
        assert_eq!(sum.buckets, vec![5, 2, 4]);
        assert_eq!(sum.missing, 3);
        assert_eq!(a.add(&Histogram::zeros(3)), a);
        assert_eq!(sum.total(), 11);
        assert_eq!(sum.max_count(), 5);
    }

    #[test]
    fn histogram_2d_add() {
        let mut a = Histogram2D::zeros(2, 2);
        a.counts[0][1] = 3;
        a.x_missing = 1;
        let mut b = Histogram2D::zeros(2, 2);
        b.counts[0][1] = 2;
        b.counts[1][0] = 7;
        b.y_missing = 4;
        let sum = a.add(&b);
        assert_eq!(sum.counts, vec![vec![0, 5], vec![7, 0]]);
        assert_eq!((sum.x_missing, sum.y_missing), (1, 4));
        assert_eq!(sum.max_count(), 7);
        assert_eq!(sum.column_total(0), 5);
    }
}
