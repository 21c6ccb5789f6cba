//! Time series container and ingestion boundary
//!
//! A [`TimeSeries`] owns a sorted, deduplicated hourly (or otherwise
//! regularly sampled) signal plus optional named covariate columns
//! (weather, irradiance). Everything downstream assumes the invariants
//! established here: strictly increasing unique timestamps and finite
//! values.

mod loader;

pub use loader::SeriesLoader;

use crate::error::{GridcastError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single observation of the target signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// How duplicate timestamps are collapsed during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedupAgg {
    Mean,
    Max,
    Min,
    First,
    Last,
}

impl DedupAgg {
    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            DedupAgg::Mean => values.iter().sum::<f64>() / values.len() as f64,
            DedupAgg::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            DedupAgg::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            DedupAgg::First => values[0],
            DedupAgg::Last => values[values.len() - 1],
        }
    }
}

/// Sorted, deduplicated numeric series keyed by timestamp.
///
/// Covariate columns are aligned with the timestamp vector and may contain
/// NaN for missing observations; `ffill_covariates` carries the last seen
/// value forward the way the original weather integration does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
    covariates: BTreeMap<String, Vec<f64>>,
}

impl TimeSeries {
    /// Build a series from raw observations.
    ///
    /// Points are sorted by timestamp, rows with non-finite values are
    /// dropped, and duplicate timestamps are collapsed with `agg`.
    pub fn from_points(points: Vec<TimePoint>, agg: DedupAgg) -> Result<Self> {
        let mut points: Vec<TimePoint> = points
            .into_iter()
            .filter(|p| p.value.is_finite())
            .collect();
        if points.is_empty() {
            return Err(GridcastError::DataError(
                "series is empty after dropping non-finite values".to_string(),
            ));
        }
        points.sort_by_key(|p| p.timestamp);

        let mut timestamps = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len());
        let mut run: Vec<f64> = Vec::new();
        let mut run_ts = points[0].timestamp;
        for p in points {
            if p.timestamp == run_ts {
                run.push(p.value);
            } else {
                timestamps.push(run_ts);
                values.push(agg.apply(&run));
                run.clear();
                run.push(p.value);
                run_ts = p.timestamp;
            }
        }
        timestamps.push(run_ts);
        values.push(agg.apply(&run));

        Ok(Self {
            timestamps,
            values,
            covariates: BTreeMap::new(),
        })
    }

    /// Convenience constructor from parallel vectors, no covariates.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(GridcastError::ShapeError {
                expected: format!("{} values", timestamps.len()),
                actual: format!("{} values", values.len()),
            });
        }
        let points = timestamps
            .into_iter()
            .zip(values)
            .map(|(timestamp, value)| TimePoint { timestamp, value })
            .collect();
        Self::from_points(points, DedupAgg::Mean)
    }

    /// Attach a covariate column aligned with the series timestamps.
    /// NaN entries mark missing observations.
    pub fn with_covariate(mut self, name: impl Into<String>, column: Vec<f64>) -> Result<Self> {
        if column.len() != self.timestamps.len() {
            return Err(GridcastError::ShapeError {
                expected: format!("{} rows", self.timestamps.len()),
                actual: format!("{} rows", column.len()),
            });
        }
        self.covariates.insert(name.into(), column);
        Ok(self)
    }

    /// Forward-fill NaN gaps in every covariate column. Leading NaNs stay
    /// NaN and are later purged by the feature builder.
    pub fn ffill_covariates(&mut self) {
        for column in self.covariates.values_mut() {
            let mut last = f64::NAN;
            for v in column.iter_mut() {
                if v.is_finite() {
                    last = *v;
                } else if last.is_finite() {
                    *v = last;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn covariate(&self, name: &str) -> Option<&[f64]> {
        self.covariates.get(name).map(|c| c.as_slice())
    }

    pub fn covariate_names(&self) -> Vec<&str> {
        self.covariates.keys().map(|k| k.as_str()).collect()
    }

    /// Index of the given timestamp in the series, if present.
    pub fn position(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(&timestamp).ok()
    }

    /// Restrict the series (and its covariates) to rows whose timestamp
    /// satisfies the predicate. Returns an error if nothing survives.
    pub fn filter_by_time<F: Fn(NaiveDateTime) -> bool>(&self, keep: F) -> Result<TimeSeries> {
        let idx: Vec<usize> = (0..self.len())
            .filter(|&i| keep(self.timestamps[i]))
            .collect();
        if idx.is_empty() {
            return Err(GridcastError::DataError(
                "time filter removed every row".to_string(),
            ));
        }
        let covariates = self
            .covariates
            .iter()
            .map(|(name, col)| (name.clone(), idx.iter().map(|&i| col[i]).collect()))
            .collect();
        Ok(TimeSeries {
            timestamps: idx.iter().map(|&i| self.timestamps[i]).collect(),
            values: idx.iter().map(|&i| self.values[i]).collect(),
            covariates,
        })
    }
}
