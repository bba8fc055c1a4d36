//! In-memory column store the local backend computes on.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use super::DataSource;
use crate::format::{format_date_millis, significant_digits};
use crate::schema::{ColumnDescription, ContentsKind, TableSchema};
use quartui_cli::FileFormat;

/// Values of one column. Numeric kinds (dates included) are widened to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => v.get(row).map(|x| x.is_none()).unwrap_or(true),
            Self::Text(v) => v.get(row).map(|x| x.is_none()).unwrap_or(true),
        }
    }

    pub fn f64_at(&self, row: usize) -> Option<f64> {
        match self {
            Self::Numeric(v) => v.get(row).copied().flatten(),
            Self::Text(_) => None,
        }
    }

    pub fn str_at(&self, row: usize) -> Option<&str> {
        match self {
            Self::Text(v) => v.get(row).and_then(|s| s.as_deref()),
            Self::Numeric(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalTable {
    schema: TableSchema,
    columns: HashMap<String, ColumnValues>,
    row_count: usize,
}

impl LocalTable {
    pub fn from_columns(columns: Vec<(ColumnDescription, ColumnValues)>) -> Result<Self> {
        let row_count = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((cd, _)) = columns.iter().find(|(_, v)| v.len() != row_count) {
            return Err(eyre!("Column {} has a different length", cd.name));
        }
        let schema = TableSchema::new(columns.iter().map(|(cd, _)| cd.clone()).collect());
        let columns = columns
            .into_iter()
            .map(|(cd, values)| (cd.name, values))
            .collect();
        Ok(Self {
            schema,
            columns,
            row_count,
        })
    }

    pub fn load(source: &DataSource) -> Result<Self> {
        let format = source
            .options
            .format
            .or_else(|| FileFormat::from_path(&source.path))
            .ok_or_else(|| {
                eyre!(
                    "Unsupported file type: {}. Use --format to choose one.",
                    source.path.display()
                )
            })?;
        let pl_path = PlPath::Local(Arc::from(source.path.as_path()));
        let lf = match format {
            FileFormat::Parquet => LazyFrame::scan_parquet(pl_path, Default::default())?,
            FileFormat::Csv | FileFormat::Tsv | FileFormat::Psv => {
                let separator = source
                    .options
                    .delimiter
                    .or_else(|| format.separator())
                    .unwrap_or(b',');
                LazyCsvReader::new(pl_path)
                    .with_has_header(source.options.has_header.unwrap_or(true))
                    .with_separator(separator)
                    .with_try_parse_dates(true)
                    .finish()?
            }
        };
        let polars_schema = lf.clone().collect_schema()?;
        let schema = TableSchema::from_polars(&polars_schema);
        let df = lf.collect()?;
        Self::from_dataframe(&df, schema)
    }

    pub fn from_dataframe(df: &DataFrame, schema: TableSchema) -> Result<Self> {
        let mut columns = HashMap::new();
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let name = series.name().to_string();
            let kind = schema
                .find(&name)
                .map(|cd| cd.kind)
                .unwrap_or_else(|| ContentsKind::from_dtype(series.dtype()));
            columns.insert(name, Self::series_values(series, kind)?);
        }
        Ok(Self {
            schema,
            columns,
            row_count: df.height(),
        })
    }

    fn series_values(series: &Series, kind: ContentsKind) -> Result<ColumnValues> {
        let values = match kind {
            ContentsKind::Date => ColumnValues::Numeric(Self::epoch_millis(series)?),
            ContentsKind::Integer | ContentsKind::Double => {
                let cast = series.cast(&DataType::Float64)?;
                ColumnValues::Numeric(cast.f64()?.into_iter().collect())
            }
            ContentsKind::String | ContentsKind::Category => {
                let cast = series.cast(&DataType::String)?;
                ColumnValues::Text(
                    cast.str()?
                        .into_iter()
                        .map(|s| s.map(str::to_string))
                        .collect(),
                )
            }
        };
        Ok(values)
    }

    fn epoch_millis(series: &Series) -> Result<Vec<Option<f64>>> {
        const MS_PER_DAY: f64 = 86_400_000.0;
        let (divisor, scale) = match series.dtype() {
            DataType::Date => (1.0, MS_PER_DAY),
            DataType::Datetime(TimeUnit::Nanoseconds, _) => (1_000_000.0, 1.0),
            DataType::Datetime(TimeUnit::Microseconds, _) => (1_000.0, 1.0),
            _ => (1.0, 1.0),
        };
        let physical = series.cast(&DataType::Int64)?;
        Ok(physical
            .i64()?
            .into_iter()
            .map(|v| v.map(|v| v as f64 / divisor * scale))
            .collect())
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column(&self, name: &str) -> Result<&ColumnValues> {
        self.columns
            .get(name)
            .ok_or_else(|| eyre!("Column not found: {}", name))
    }

    /// Text shown for a cell in the table view.
    pub fn cell_display(&self, cd: &ColumnDescription, row: usize) -> String {
        let Some(values) = self.columns.get(&cd.name) else {
            return String::new();
        };
        match values {
            ColumnValues::Text(_) => values.str_at(row).unwrap_or("").to_string(),
            ColumnValues::Numeric(_) => match values.f64_at(row) {
                Some(v) if cd.kind == ContentsKind::Date => format_date_millis(v),
                Some(v) if cd.kind == ContentsKind::Integer => format!("{}", v),
                Some(v) => significant_digits(v),
                None => String::new(),
            },
        }
    }
}
