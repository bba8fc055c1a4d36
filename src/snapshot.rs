//! Saved description of a quartile view, enough to rebuild it and re-run its requests.

use chrono::Local;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::ColumnDescription;

/// Every field is optional so that a snapshot with a missing field can be told apart from a
/// valid one; see [`crate::views::quartiles::QuartilesView::reconstruct`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantileVectorSerialization {
    pub remote_object_id: Option<String>,
    pub row_count: Option<u64>,
    /// Table schema as produced by [`crate::schema::TableSchema::serialize`].
    pub schema: Option<String>,
    pub column_description0: Option<ColumnDescription>,
    pub column_description1: Option<ColumnDescription>,
    pub x_bucket_count: Option<usize>,
    pub title: Option<String>,
}

impl QuantileVectorSerialization {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| eyre!("Invalid snapshot: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read snapshot {}: {}", path.display(), e))?;
        Self::from_json(&text)
    }

    /// Writes the snapshot under `dir` with a timestamped name.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let name = format!("quartiles-{}.json", Local::now().format("%Y%m%d-%H%M%S"));
        let path = dir.join(name);
        fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ContentsKind;

    #[test]
    fn missing_fields_deserialize_as_none() {
        let snap = QuantileVectorSerialization::from_json(r#"{"rowCount": 3}"#).unwrap();
        assert_eq!(snap.row_count, Some(3));
        assert!(snap.column_description0.is_none());
        assert!(QuantileVectorSerialization::from_json("[").is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let snap = QuantileVectorSerialization {
            remote_object_id: Some("file:/tmp/a.csv".to_string()),
            row_count: Some(10),
            schema: Some("{}".to_string()),
            column_description0: Some(ColumnDescription::new("x", ContentsKind::Integer)),
            column_description1: Some(ColumnDescription::new("q", ContentsKind::Double)),
            x_bucket_count: Some(7),
            title: Some("t".to_string()),
        };
        let path = snap.save(dir.path()).unwrap();
        assert_eq!(QuantileVectorSerialization::load(&path).unwrap(), snap);
    }
}
