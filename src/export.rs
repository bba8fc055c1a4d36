//! Delimited-text export of a quartile chart.

use color_eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::axis::AxisData;
use crate::quantiles::{QuantilesEntry, QuantilesVector};
use crate::schema::TableSchema;

pub const CSV_FILE_NAME: &str = "quantiles2d.csv";

/// Destination for exported files.
pub trait FileSaver {
    fn save(&self, name: &str, contents: &str) -> Result<PathBuf>;
}

/// Writes files into one directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, name: &str, contents: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

fn row<F>(label: &str, entries: &[QuantilesEntry], buckets: usize, cell: F) -> String
where
    F: Fn(&QuantilesEntry) -> Option<f64>,
{
    let mut line = format!("{},", label);
    for x in 0..buckets {
        line.push(',');
        if let Some(v) = entries.get(x).filter(|e| !e.empty).and_then(&cell) {
            line.push_str(&v.to_string());
        }
    }
    line
}

/// One header line of bucket labels, then min, q1, median, q3, max and missing. Cells of
/// empty buckets stay blank except for `missing`.
pub fn quartiles_csv(axis: &AxisData, schema: &TableSchema, qv: &QuantilesVector) -> Vec<String> {
    let buckets = axis.bucket_count;
    let name = axis.display_name(schema);
    let mut header = String::from(",");
    for x in 0..buckets {
        let label = format!("{} {}", name, axis.bucket_description(x, 0));
        header.push(',');
        header.push_str(&serde_json::Value::from(label).to_string());
    }

    let entries = &qv.data;
    let mut missing = String::from("missing,");
    for x in 0..buckets {
        missing.push(',');
        missing.push_str(&entries.get(x).map(|e| e.missing).unwrap_or(0).to_string());
    }

    vec![
        header,
        row("min", entries, buckets, |e| Some(e.min)),
        row("q1", entries, buckets, |e| e.samples.first().copied()),
        row("median", entries, buckets, |e| e.samples.get(1).copied()),
        row("q3", entries, buckets, |e| e.samples.get(2).copied()),
        row("max", entries, buckets, |e| Some(e.max)),
        missing,
    ]
}
