//! CSV/tabular ingestion adapter
//!
//! The engine itself never touches files; this adapter turns a CSV or an
//! in-memory polars `DataFrame` into clean [`TimeSeries`] values. Rows
//! with unparseable timestamps are dropped, the value column is coerced
//! to float, and duplicate timestamps are aggregated with the configured
//! [`DedupAgg`] before the series is handed to the core. A group key
//! column splits a long-format table into one series per entity.

use super::{DedupAgg, TimePoint, TimeSeries};
use crate::error::{GridcastError, Result};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

/// Loader for timestamped tabular series.
pub struct SeriesLoader {
    time_column: String,
    value_column: String,
    covariate_columns: Vec<String>,
    group_key: Option<String>,
    agg: DedupAgg,
    time_format: Option<String>,
}

impl SeriesLoader {
    pub fn new(time_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            time_column: time_column.into(),
            value_column: value_column.into(),
            covariate_columns: Vec::new(),
            group_key: None,
            agg: DedupAgg::Mean,
            time_format: None,
        }
    }

    /// Aggregation applied to duplicate timestamps.
    pub fn with_agg(mut self, agg: DedupAgg) -> Self {
        self.agg = agg;
        self
    }

    /// Additional numeric columns to carry along as covariates.
    pub fn with_covariates(mut self, columns: Vec<String>) -> Self {
        self.covariate_columns = columns;
        self
    }

    /// Entity column for long-format tables (one series per distinct key).
    pub fn with_group_key(mut self, column: impl Into<String>) -> Self {
        self.group_key = Some(column.into());
        self
    }

    /// Explicit chrono format for the timestamp column. Without it a small
    /// set of common formats is tried per row.
    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }

    /// Load a CSV file into a single series.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<TimeSeries> {
        self.from_dataframe(&read_csv(path.as_ref())?)
    }

    /// Load a long-format CSV into one series per group-key value.
    pub fn load_grouped_csv(&self, path: impl AsRef<Path>) -> Result<Vec<(String, TimeSeries)>> {
        self.from_dataframe_grouped(&read_csv(path.as_ref())?)
    }

    /// Build a series from an already-loaded `DataFrame`.
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<TimeSeries> {
        let timestamps = self.parse_timestamps(df)?;
        let rows: Vec<usize> = (0..timestamps.len())
            .filter(|&i| timestamps[i].is_some())
            .collect();
        self.build_series(df, &timestamps, &rows)
    }

    /// Split a long-format table by the configured group key, one series
    /// per distinct key value, keys in sorted order.
    pub fn from_dataframe_grouped(&self, df: &DataFrame) -> Result<Vec<(String, TimeSeries)>> {
        let key_column = self.group_key.as_ref().ok_or_else(|| {
            GridcastError::ConfigError("group key column not configured".to_string())
        })?;
        let keys = df
            .column(key_column)
            .map_err(|_| {
                GridcastError::ConfigError(format!("group key column '{}' not found", key_column))
            })?
            .str()
            .map_err(|e| GridcastError::DataError(e.to_string()))?;

        let timestamps = self.parse_timestamps(df)?;
        let mut by_key: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, key) in keys.into_iter().enumerate() {
            if timestamps[i].is_none() {
                continue;
            }
            if let Some(key) = key {
                by_key.entry(key.to_string()).or_default().push(i);
            }
        }

        by_key
            .into_iter()
            .map(|(key, rows)| {
                self.build_series(df, &timestamps, &rows)
                    .map(|series| (key, series))
            })
            .collect()
    }

    fn build_series(
        &self,
        df: &DataFrame,
        timestamps: &[Option<NaiveDateTime>],
        rows: &[usize],
    ) -> Result<TimeSeries> {
        if rows.is_empty() {
            return Err(GridcastError::DataError(format!(
                "no parseable timestamps in column '{}'",
                self.time_column
            )));
        }
        let values = numeric_column(df, &self.value_column)?;

        let points: Vec<TimePoint> = rows
            .iter()
            .map(|&i| TimePoint {
                timestamp: timestamps[i].unwrap(),
                value: values[i],
            })
            .collect();
        let mut series = TimeSeries::from_points(points, self.agg)?;

        for name in &self.covariate_columns {
            let column = numeric_column(df, name)?;
            // Align covariates with the deduplicated timestamp vector by
            // last-wins lookup, mirroring the value aggregation order.
            let mut aligned = vec![f64::NAN; series.len()];
            for &i in rows {
                if let Some(pos) = series.position(timestamps[i].unwrap()) {
                    if column[i].is_finite() {
                        aligned[pos] = column[i];
                    }
                }
            }
            series = series.with_covariate(name.clone(), aligned)?;
        }

        Ok(series)
    }

    fn parse_timestamps(&self, df: &DataFrame) -> Result<Vec<Option<NaiveDateTime>>> {
        let column = df
            .column(&self.time_column)
            .map_err(|e| GridcastError::DataError(e.to_string()))?;
        let strings = column
            .str()
            .map_err(|e| GridcastError::DataError(e.to_string()))?;

        let parsed = strings
            .into_iter()
            .map(|opt| opt.and_then(|raw| self.parse_one(raw)))
            .collect();
        Ok(parsed)
    }

    fn parse_one(&self, raw: &str) -> Option<NaiveDateTime> {
        if let Some(fmt) = &self.time_format {
            return NaiveDateTime::parse_from_str(raw, fmt).ok();
        }
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| GridcastError::DataError(e.to_string()))?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| GridcastError::DataError(e.to_string()))
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| GridcastError::DataError(format!("column '{}' not found", name)))?;
    let floats = column
        .cast(&DataType::Float64)
        .map_err(|e| GridcastError::DataError(e.to_string()))?;
    let chunked = floats
        .f64()
        .map_err(|e| GridcastError::DataError(e.to_string()))?;
    Ok(chunked
        .into_iter()
        .map(|opt| opt.unwrap_or(f64::NAN))
        .collect())
}
