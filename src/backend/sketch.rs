//! Sketches over a set of row ids of a [`LocalTable`]. Each sketch is fed shard by shard so the
//! backend can report a cumulative result after every shard.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::table::{ColumnValues, LocalTable};
use super::{CombineOperation, RangeFilter, RangeFilterPair, RecordOrder};
use crate::axis::{periodic_samples, BucketsDescription, DataRange};
use crate::quantiles::{
    Histogram, Histogram2D, NextKList, QuantileVectorArgs, QuantilesEntry, QuantilesVector,
};
use crate::schema::ColumnDescription;

/// Interior quantile samples of a sorted bucket: `k = min(3, n - 1)` points at `i * n / (k + 1)`.
pub fn quantile_samples(sorted: &[f64]) -> Vec<f64> {
    let n = sorted.len();
    if n < 2 {
        return Vec::new();
    }
    let k = (n - 1).min(3);
    (1..=k).map(|i| sorted[i * n / (k + 1)]).collect()
}

fn bucket_of(values: &ColumnValues, row: usize, buckets: &BucketsDescription) -> Option<usize> {
    match values {
        ColumnValues::Numeric(_) => values.f64_at(row).and_then(|v| buckets.index_of_f64(v)),
        ColumnValues::Text(_) => values.str_at(row).and_then(|v| buckets.index_of_str(v)),
    }
}

/// Min, max and counts of one column; string columns also collect distinct values.
pub struct RangeSketch {
    min: f64,
    max: f64,
    present: u64,
    missing: u64,
    distinct: BTreeSet<String>,
    samples: usize,
}

impl RangeSketch {
    pub fn new(samples: usize) -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            present: 0,
            missing: 0,
            distinct: BTreeSet::new(),
            samples,
        }
    }

    pub fn add(&mut self, values: &ColumnValues, rows: &[usize]) {
        for &row in rows {
            match values {
                ColumnValues::Numeric(_) => match values.f64_at(row) {
                    Some(v) => {
                        self.present += 1;
                        self.min = self.min.min(v);
                        self.max = self.max.max(v);
                    }
                    None => self.missing += 1,
                },
                ColumnValues::Text(_) => match values.str_at(row) {
                    Some(v) => {
                        self.present += 1;
                        self.distinct.insert(v.to_string());
                    }
                    None => self.missing += 1,
                },
            }
        }
    }

    pub fn result(&self, values: &ColumnValues) -> DataRange {
        match values {
            ColumnValues::Numeric(_) => {
                let (min, max) = if self.present == 0 {
                    (0.0, 0.0)
                } else {
                    (self.min, self.max)
                };
                DataRange::numeric(min, max, self.present, self.missing)
            }
            ColumnValues::Text(_) => {
                let sorted: Vec<String> = self.distinct.iter().cloned().collect();
                let mut sample = periodic_samples(&sorted, self.samples.max(1));
                // Keep the true maximum so the last bucket's label covers it.
                if let Some(last) = sorted.last() {
                    if sample.last() != Some(last) {
                        sample.push(last.clone());
                    }
                }
                DataRange::strings(sample, self.present, self.missing)
            }
        }
    }
}

pub struct HistogramSketch {
    buckets: BucketsDescription,
    result: Histogram,
}

impl HistogramSketch {
    pub fn new(buckets: BucketsDescription) -> Self {
        let result = Histogram::zeros(buckets.count());
        Self { buckets, result }
    }

    pub fn add(&mut self, values: &ColumnValues, rows: &[usize]) {
        for &row in rows {
            if values.is_null(row) {
                self.result.missing += 1;
                continue;
            }
            if let Some(b) = bucket_of(values, row, &self.buckets) {
                self.result.buckets[b] += 1;
            }
        }
    }

    pub fn result(&self) -> &Histogram {
        &self.result
    }
}

pub struct Histogram2DSketch {
    x_buckets: BucketsDescription,
    y_buckets: BucketsDescription,
    result: Histogram2D,
}

impl Histogram2DSketch {
    pub fn new(x_buckets: BucketsDescription, y_buckets: BucketsDescription) -> Self {
        let result = Histogram2D::zeros(x_buckets.count(), y_buckets.count());
        Self {
            x_buckets,
            y_buckets,
            result,
        }
    }

    pub fn add(&mut self, x: &ColumnValues, y: &ColumnValues, rows: &[usize]) {
        for &row in rows {
            if x.is_null(row) {
                self.result.x_missing += 1;
                continue;
            }
            if y.is_null(row) {
                self.result.y_missing += 1;
                continue;
            }
            let (Some(bx), Some(by)) = (
                bucket_of(x, row, &self.x_buckets),
                bucket_of(y, row, &self.y_buckets),
            ) else {
                continue;
            };
            self.result.counts[bx][by] += 1;
        }
    }

    pub fn result(&self) -> &Histogram2D {
        &self.result
    }
}

/// Quantile-column values collected per X bucket.
pub struct QuantilesSketch {
    buckets: BucketsDescription,
    values: Vec<Vec<f64>>,
    missing: Vec<u64>,
}

impl QuantilesSketch {
    pub fn new(args: &QuantileVectorArgs) -> Result<Self> {
        let buckets = match (&args.left_boundaries, args.min, args.max) {
            (Some(left_boundaries), _, _) => BucketsDescription::Strings {
                left_boundaries: left_boundaries.clone(),
            },
            (None, Some(min), Some(max)) => BucketsDescription::Numeric {
                min,
                max,
                count: args.bucket_count,
            },
            _ => return Err(eyre!("Quantile request needs either min/max or left boundaries")),
        };
        let count = buckets.count();
        let values = (0..count)
            .map(|i| Vec::with_capacity(args.non_null_counts.get(i).copied().unwrap_or(0) as usize))
            .collect();
        Ok(Self {
            buckets,
            values,
            missing: vec![0; count],
        })
    }

    pub fn add(&mut self, x: &ColumnValues, q: &ColumnValues, rows: &[usize]) {
        for &row in rows {
            let Some(b) = bucket_of(x, row, &self.buckets) else {
                continue;
            };
            match q.f64_at(row) {
                Some(v) => self.values[b].push(v),
                None => self.missing[b] += 1,
            }
        }
    }

    pub fn result(&self) -> QuantilesVector {
        let data = self
            .values
            .iter()
            .zip(self.missing.iter())
            .map(|(values, &missing)| {
                if values.is_empty() {
                    return QuantilesEntry::empty(missing);
                }
                let mut sorted = values.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                QuantilesEntry {
                    empty: false,
                    min: sorted[0],
                    max: sorted[sorted.len() - 1],
                    missing,
                    samples: quantile_samples(&sorted),
                }
            })
            .collect();
        QuantilesVector { data }
    }
}

fn accepts(filter: &RangeFilter, values: &ColumnValues, row: usize) -> bool {
    match values {
        ColumnValues::Numeric(_) => values.f64_at(row).map(|v| filter.accepts_f64(v)).unwrap_or(false),
        ColumnValues::Text(_) => values.str_at(row).map(|v| filter.accepts_str(v)).unwrap_or(false),
    }
}

/// Rows of `rows` that fall inside the selection rectangle.
pub fn filter_rows(table: &LocalTable, rows: &[usize], filter: &RangeFilterPair) -> Result<Vec<usize>> {
    let x = table.column(&filter.x.column.name)?;
    let y = match &filter.y {
        Some(f) => Some((f, table.column(&f.column.name)?)),
        None => None,
    };
    Ok(rows
        .iter()
        .copied()
        .filter(|&row| accepts(&filter.x, x, row))
        .filter(|&row| y.map(|(f, values)| accepts(f, values, row)).unwrap_or(true))
        .collect())
}

/// Set operation on two sorted row-id lists.
pub fn combine_rows(left: &[usize], right: &[usize], operation: CombineOperation) -> Vec<usize> {
    let l: BTreeSet<usize> = left.iter().copied().collect();
    let r: BTreeSet<usize> = right.iter().copied().collect();
    match operation {
        CombineOperation::Union => l.union(&r).copied().collect(),
        CombineOperation::Intersection => l.intersection(&r).copied().collect(),
        CombineOperation::Difference => l.difference(&r).copied().collect(),
        CombineOperation::Replace => r.into_iter().collect(),
    }
}

fn compare_rows(order: &[(&ColumnValues, bool)], a: usize, b: usize) -> Ordering {
    for (values, ascending) in order {
        // Nulls sort last regardless of direction.
        let ord = match values {
            ColumnValues::Numeric(_) => match (values.f64_at(a), values.f64_at(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            ColumnValues::Text(_) => match (values.str_at(a), values.str_at(b)) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        let ord = if *ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.cmp(&b)
}

/// `count` rows starting at `start` in the given order, every schema column rendered as text.
pub fn next_k(
    table: &LocalTable,
    rows: &[usize],
    order: &RecordOrder,
    start: u64,
    count: usize,
) -> Result<NextKList> {
    let keys = order
        .columns
        .iter()
        .map(|(cd, asc)| table.column(&cd.name).map(|v| (v, *asc)))
        .collect::<Result<Vec<_>>>()?;
    let mut sorted = rows.to_vec();
    sorted.sort_by(|&a, &b| compare_rows(&keys, a, b));
    let columns: Vec<ColumnDescription> = table.schema().columns().to_vec();
    let page = sorted
        .iter()
        .skip(start as usize)
        .take(count)
        .map(|&row| columns.iter().map(|cd| table.cell_display(cd, row)).collect())
        .collect();
    Ok(NextKList {
        rows: page,
        start_position: start,
        row_count: rows.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ContentsKind;

    fn table() -> LocalTable {
        LocalTable::from_columns(vec![
            (
                ColumnDescription::new("x", ContentsKind::Double),
                ColumnValues::Numeric(vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0), None, Some(4.0)]),
            ),
            (
                ColumnDescription::new("q", ContentsKind::Double),
                ColumnValues::Numeric(vec![Some(10.0), Some(20.0), None, Some(40.0), Some(50.0), Some(60.0)]),
            ),
            (
                ColumnDescription::new("s", ContentsKind::String),
                ColumnValues::Text(vec![
                    Some("b".to_string()),
                    Some("a".to_string()),
                    Some("d".to_string()),
                    Some("c".to_string()),
                    Some("a".to_string()),
                    None,
                ]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn quantile_samples_by_size() {
        assert!(quantile_samples(&[]).is_empty());
        assert!(quantile_samples(&[1.0]).is_empty());
        assert_eq!(quantile_samples(&[1.0, 2.0]), vec![2.0]);
        assert_eq!(quantile_samples(&[1.0, 2.0, 3.0]), vec![2.0, 3.0]);
        assert_eq!(quantile_samples(&[1.0, 2.0, 3.0, 4.0]), vec![2.0, 3.0, 4.0]);
        let hundred: Vec<f64> = (0..100).map(f64::from).collect();
        assert_eq!(quantile_samples(&hundred), vec![25.0, 50.0, 75.0]);
    }

    #[test]
    fn ranges_numeric_and_strings() {
        let t = table();
        let rows: Vec<usize> = (0..t.row_count()).collect();
        let x = t.column("x").unwrap();
        let mut sketch = RangeSketch::new(10);
        sketch.add(x, &rows[..3]);
        sketch.add(x, &rows[3..]);
        let r = sketch.result(x);
        assert_eq!((r.min, r.max, r.present_count, r.missing_count), (0.0, 4.0, 5, 1));
        assert!(r.string_quantiles.is_none());

        let s = t.column("s").unwrap();
        let mut sketch = RangeSketch::new(10);
        sketch.add(s, &rows);
        let r = sketch.result(s);
        assert_eq!(
            r.string_quantiles,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()])
        );
        assert_eq!((r.present_count, r.missing_count), (5, 1));
    }

    #[test]
    fn string_sample_keeps_maximum() {
        let t = table();
        let rows: Vec<usize> = (0..t.row_count()).collect();
        let s = t.column("s").unwrap();
        let mut sketch = RangeSketch::new(2);
        sketch.add(s, &rows);
        let r = sketch.result(s);
        assert_eq!(
            r.string_quantiles,
            Some(vec!["a".to_string(), "c".to_string(), "d".to_string()])
        );
    }

    #[test]
    fn histogram_counts_non_null() {
        let t = table();
        let rows: Vec<usize> = (0..t.row_count()).collect();
        let mut sketch = HistogramSketch::new(BucketsDescription::Numeric {
            min: 0.0,
            max: 4.0,
            count: 2,
        });
        sketch.add(t.column("x").unwrap(), &rows);
        assert_eq!(sketch.result().buckets, vec![2, 3]);
        assert_eq!(sketch.result().missing, 1);
    }

    #[test]
    fn quantiles_by_bucket() {
        let t = table();
        let rows: Vec<usize> = (0..t.row_count()).collect();
        let args = QuantileVectorArgs {
            quantile_count: 4,
            cd: ColumnDescription::new("x", ContentsKind::Double),
            seed: 0,
            sampling_rate: 1.0,
            bucket_count: 2,
            quantiles_column: "q".to_string(),
            non_null_counts: vec![2, 3],
            min: Some(0.0),
            max: Some(4.0),
            left_boundaries: None,
        };
        let mut sketch = QuantilesSketch::new(&args).unwrap();
        sketch.add(t.column("x").unwrap(), t.column("q").unwrap(), &rows);
        let qv = sketch.result();
        assert_eq!(qv.len(), 2);
        assert_eq!(qv.data[0].min, 10.0);
        assert_eq!(qv.data[0].max, 20.0);
        assert_eq!(qv.data[0].samples, vec![20.0]);
        // Bucket 1 holds x = 2, 3, 4 with q = null, 40, 60.
        assert_eq!(qv.data[1].missing, 1);
        assert_eq!((qv.data[1].min, qv.data[1].max), (40.0, 60.0));
    }

    #[test]
    fn quantiles_empty_bucket() {
        let t = table();
        let rows: Vec<usize> = (0..t.row_count()).collect();
        let args = QuantileVectorArgs {
            quantile_count: 4,
            cd: ColumnDescription::new("x", ContentsKind::Double),
            seed: 0,
            sampling_rate: 1.0,
            bucket_count: 3,
            quantiles_column: "q".to_string(),
            non_null_counts: vec![],
            min: Some(0.0),
            max: Some(30.0),
            left_boundaries: None,
        };
        let mut sketch = QuantilesSketch::new(&args).unwrap();
        sketch.add(t.column("x").unwrap(), t.column("q").unwrap(), &rows);
        let qv = sketch.result();
        assert!(!qv.data[0].empty);
        assert!(qv.data[1].empty);
        assert!(qv.data[2].empty);
    }

    #[test]
    fn quantiles_need_bounds() {
        let args = QuantileVectorArgs {
            quantile_count: 4,
            cd: ColumnDescription::new("x", ContentsKind::Double),
            seed: 0,
            sampling_rate: 1.0,
            bucket_count: 3,
            quantiles_column: "q".to_string(),
            non_null_counts: vec![],
            min: None,
            max: None,
            left_boundaries: None,
        };
        assert!(QuantilesSketch::new(&args).is_err());
    }

    #[test]
    fn filter_rectangle() {
        let t = table();
        let rows: Vec<usize> = (0..t.row_count()).collect();
        let pair = RangeFilterPair {
            x: RangeFilter::numeric(ColumnDescription::new("x", ContentsKind::Double), 1.0, 3.0),
            y: Some(RangeFilter::numeric(
                ColumnDescription::new("q", ContentsKind::Double),
                0.0,
                30.0,
            )),
        };
        assert_eq!(filter_rows(&t, &rows, &pair).unwrap(), vec![1]);

        let strings = RangeFilterPair {
            x: RangeFilter::strings(
                ColumnDescription::new("s", ContentsKind::String),
                "b".to_string(),
                None,
            ),
            y: None,
        };
        assert_eq!(filter_rows(&t, &rows, &strings).unwrap(), vec![0, 2, 3]);
    }

    #[test]
    fn combine_membership() {
        let a = [1, 2, 3];
        let b = [3, 4];
        assert_eq!(combine_rows(&a, &b, CombineOperation::Union), vec![1, 2, 3, 4]);
        assert_eq!(combine_rows(&a, &b, CombineOperation::Intersection), vec![3]);
        assert_eq!(combine_rows(&a, &b, CombineOperation::Difference), vec![1, 2]);
        assert_eq!(combine_rows(&a, &b, CombineOperation::Replace), vec![3, 4]);
    }

    #[test]
    fn next_k_sorted_with_nulls_last() {
        let t = table();
        let rows: Vec<usize> = (0..t.row_count()).collect();
        let order = RecordOrder::ascending(&[ColumnDescription::new("s", ContentsKind::String)]);
        let page = next_k(&t, &rows, &order, 0, 10).unwrap();
        let s: Vec<&str> = page.rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(s, vec!["a", "a", "b", "c", "d", ""]);
        assert_eq!(page.row_count, 6);

        let page = next_k(&t, &rows, &order, 4, 10).unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.start_position, 4);
    }
}
