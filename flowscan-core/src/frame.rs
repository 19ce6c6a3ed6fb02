//! Tabular export of a decorated series.
//!
//! The frame carries the OHLCV columns, then every attached numeric column, pattern
//! column and signal column in attachment order. Missing values stay NaN. A pattern-backed
//! signal shares its pattern's column name and is written once.

use crate::domain::BarSeries;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported export format '{0}' (expected .parquet or .csv)")]
    UnsupportedFormat(String),
}

/// Output file format, chosen from the path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Parquet,
    Csv,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "parquet" | "pq" => Ok(Self::Parquet),
            "csv" => Ok(Self::Csv),
            _ => Err(ExportError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Convert the series into a polars `DataFrame`, one row per bar.
pub fn to_dataframe(series: &BarSeries) -> Result<DataFrame, ExportError> {
    let bars = series.bars();
    let millis: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_millis())
        .collect();

    let mut columns = vec![
        Column::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        Column::new("open".into(), bars.iter().map(|b| b.open).collect::<Vec<f64>>()),
        Column::new("high".into(), bars.iter().map(|b| b.high).collect::<Vec<f64>>()),
        Column::new("low".into(), bars.iter().map(|b| b.low).collect::<Vec<f64>>()),
        Column::new("close".into(), bars.iter().map(|b| b.close).collect::<Vec<f64>>()),
        Column::new("volume".into(), bars.iter().map(|b| b.volume).collect::<Vec<f64>>()),
    ];
    for (column, values) in series.values() {
        columns.push(Column::new(column.name().into(), values.to_vec()));
    }
    for (pattern, flags) in series.patterns() {
        columns.push(Column::new(pattern.name().into(), flags.to_vec()));
    }
    for (kind, flags) in series.signals() {
        if kind.pattern().is_some_and(|p| series.pattern(p).is_some()) {
            continue;
        }
        columns.push(Column::new(kind.name().into(), flags.to_vec()));
    }

    Ok(DataFrame::new(columns)?)
}

/// Write the series to `path` as Parquet or CSV, depending on the extension.
pub fn write(series: &BarSeries, path: &Path) -> Result<(), ExportError> {
    let format = ExportFormat::from_path(path)?;
    let mut df = to_dataframe(series)?;
    let file = fs::File::create(path)?;
    match format {
        ExportFormat::Parquet => {
            ParquetWriter::new(file).finish(&mut df)?;
        }
        ExportFormat::Csv => {
            CsvWriter::new(file).include_header(true).finish(&mut df)?;
        }
    }
    Ok(())
}
