//! Column descriptions and table schema shared by views, requests and snapshots.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::{DataType, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of values held by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentsKind {
    Integer,
    Double,
    /// Milliseconds since the Unix epoch.
    Date,
    String,
    Category,
}

impl ContentsKind {
    /// String-keyed kinds have no metric between values; their buckets come from samples.
    pub fn is_string(self) -> bool {
        matches!(self, Self::String | Self::Category)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Double | Self::Date)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Double => "Double",
            Self::Date => "Date",
            Self::String => "String",
            Self::Category => "Category",
        }
    }

    /// Maps a polars dtype onto the kinds the charts understand.
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Date | DataType::Datetime(_, _) => Self::Date,
            DataType::Boolean => Self::Category,
            d if d.is_integer() => Self::Integer,
            d if d.is_float() => Self::Double,
            _ => Self::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub kind: ContentsKind,
}

impl ColumnDescription {
    pub fn new(name: impl Into<String>, kind: ContentsKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column list plus optional display names (renamed columns).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnDescription>,
    #[serde(default)]
    display_names: HashMap<String, String>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDescription>) -> Self {
        Self {
            columns,
            display_names: HashMap::new(),
        }
    }

    pub fn from_polars(schema: &Schema) -> Self {
        let columns = schema
            .iter()
            .map(|(name, dtype)| ColumnDescription::new(name.as_str(), ContentsKind::from_dtype(dtype)))
            .collect();
        Self::new(columns)
    }

    pub fn columns(&self) -> &[ColumnDescription] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&ColumnDescription> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn set_display_name(&mut self, column: &str, display: impl Into<String>) {
        self.display_names.insert(column.to_string(), display.into());
    }

    /// Name shown to the user; falls back to the column name.
    pub fn display_name(&self, column: &str) -> String {
        self.display_names
            .get(column)
            .cloned()
            .unwrap_or_else(|| column.to_string())
    }

    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| eyre!("Invalid schema: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_kinds() {
        assert!(ContentsKind::String.is_string());
        assert!(ContentsKind::Category.is_string());
        assert!(!ContentsKind::Double.is_string());
        assert!(ContentsKind::Date.is_numeric());
    }

    #[test]
    fn kinds_from_dtypes() {
        assert_eq!(ContentsKind::from_dtype(&DataType::Int32), ContentsKind::Integer);
        assert_eq!(ContentsKind::from_dtype(&DataType::UInt8), ContentsKind::Integer);
        assert_eq!(ContentsKind::from_dtype(&DataType::Float64), ContentsKind::Double);
        assert_eq!(ContentsKind::from_dtype(&DataType::Date), ContentsKind::Date);
        assert_eq!(ContentsKind::from_dtype(&DataType::String), ContentsKind::String);
        assert_eq!(ContentsKind::from_dtype(&DataType::Boolean), ContentsKind::Category);
    }

    #[test]
    fn display_name_falls_back_to_column() {
        let mut schema = TableSchema::new(vec![ColumnDescription::new("a", ContentsKind::Double)]);
        assert_eq!(schema.display_name("a"), "a");
        schema.set_display_name("a", "Alpha");
        assert_eq!(schema.display_name("a"), "Alpha");
    }

    #[test]
    fn schema_serialization() {
        let mut schema = TableSchema::new(vec![
            ColumnDescription::new("a", ContentsKind::Integer),
            ColumnDescription::new("b", ContentsKind::String),
        ]);
        schema.set_display_name("b", "Bee");
        let text = schema.serialize().unwrap();
        let back = TableSchema::deserialize(&text).unwrap();
        assert_eq!(back, schema);
        assert!(TableSchema::deserialize("not json").is_err());
    }
}
