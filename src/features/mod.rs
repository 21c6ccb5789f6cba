//! Supervised-matrix construction
//!
//! Turns a clean [`TimeSeries`](crate::series::TimeSeries) into a
//! leakage-free feature matrix: calendar attributes, lagged values and
//! trailing rolling statistics, with every incomplete row purged. The
//! column order is captured in a [`FeatureSchema`] that travels with any
//! fitted model.

mod builder;
mod schema;

pub use builder::FeatureBuilder;
pub use schema::FeatureSchema;

use crate::error::{GridcastError, Result};
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Trailing-window statistic for rolling features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollingStat {
    Mean,
    Std,
    Max,
    Min,
}

impl RollingStat {
    pub(crate) fn apply(&self, window: &[f64]) -> f64 {
        match self {
            RollingStat::Mean => window.iter().sum::<f64>() / window.len() as f64,
            RollingStat::Std => {
                let mean = window.iter().sum::<f64>() / window.len() as f64;
                let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / window.len() as f64;
                variance.sqrt()
            }
            RollingStat::Max => window.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            RollingStat::Min => window.iter().cloned().fold(f64::INFINITY, f64::min),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            RollingStat::Mean => "mean",
            RollingStat::Std => "std",
            RollingStat::Max => "max",
            RollingStat::Min => "min",
        }
    }
}

/// A covariate column pulled into the matrix at the row's own timestamp.
///
/// Concurrent covariates are only honest under a perfect-forecast
/// assumption; callers must say so explicitly and the pipeline logs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovariateSpec {
    pub column: String,
    pub perfect_foresight: bool,
}

impl CovariateSpec {
    pub fn perfect_foresight(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            perfect_foresight: true,
        }
    }
}

/// Configuration for feature construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Lag offsets in native sampling steps.
    pub lag_offsets: Vec<usize>,
    /// Trailing rolling-window sizes in steps (current row excluded).
    pub rolling_windows: Vec<usize>,
    pub rolling_stat: RollingStat,
    /// Include hour / day_of_week / month columns.
    pub include_calendar: bool,
    /// Include the weekend 0/1 flag.
    pub include_weekend_flag: bool,
    /// Include the holiday 0/1 flag.
    pub include_holiday_flag: bool,
    /// Include sin/cos encodings of hour and day_of_week.
    pub include_cyclical: bool,
    /// Concurrent covariate columns (weather and the like).
    pub covariates: Vec<CovariateSpec>,
    /// Steps between a row and its target value. 0 targets the row's own
    /// value; a positive lead targets a strictly later observation.
    pub target_lead: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lag_offsets: vec![1, 24],
            rolling_windows: Vec::new(),
            rolling_stat: RollingStat::Mean,
            include_calendar: true,
            include_weekend_flag: false,
            include_holiday_flag: false,
            include_cyclical: false,
            covariates: Vec::new(),
            target_lead: 0,
        }
    }
}

impl FeatureConfig {
    /// Number of leading rows per group that cannot produce a complete row.
    pub fn warmup_rows(&self) -> usize {
        self.lag_offsets
            .iter()
            .chain(self.rolling_windows.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(&bad) = self.lag_offsets.iter().find(|&&k| k == 0) {
            return Err(GridcastError::ConfigError(format!(
                "lag offset must be positive, got {}",
                bad
            )));
        }
        if let Some(&bad) = self.rolling_windows.iter().find(|&&w| w == 0) {
            return Err(GridcastError::ConfigError(format!(
                "rolling window must be positive, got {}",
                bad
            )));
        }
        Ok(())
    }
}

/// How rows of a grouped matrix are ordered, so split logic downstream
/// knows what it is slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowOrder {
    /// Single series, strictly increasing timestamps.
    Chronological,
    /// Group by group, strictly increasing timestamps within each group.
    GroupedByEntity,
}

/// The supervised matrix: X with intercept first, aligned target y,
/// per-row timestamps and calendar buckets (years).
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub timestamps: Vec<NaiveDateTime>,
    /// Entity id per row when built from grouped series.
    pub group_ids: Option<Vec<String>>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub schema: FeatureSchema,
    /// Calendar bucket (year) per row, consumed by the splitter.
    pub buckets: Vec<i32>,
    pub row_order: RowOrder,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Row subset by index, preserving order.
    pub fn select(&self, indices: &[usize]) -> FeatureMatrix {
        let x = Array2::from_shape_fn((indices.len(), self.x.ncols()), |(i, j)| {
            self.x[[indices[i], j]]
        });
        let y = Array1::from_iter(indices.iter().map(|&i| self.y[i]));
        FeatureMatrix {
            timestamps: indices.iter().map(|&i| self.timestamps[i]).collect(),
            group_ids: self
                .group_ids
                .as_ref()
                .map(|ids| indices.iter().map(|&i| ids[i].clone()).collect()),
            x,
            y,
            schema: self.schema.clone(),
            buckets: indices.iter().map(|&i| self.buckets[i]).collect(),
            row_order: self.row_order,
        }
    }
}
