//! Forecast evaluation
//!
//! MAE/RMSE metrics, the persistence baseline, per-slice diagnostic
//! breakdowns, timestamp-joined comparison of two model variants, and the
//! daily load-factor table.

mod compare;
mod load_factor;

pub use compare::{compare_by_hour, compare_by_slice, SliceComparison};
pub use load_factor::{daily_load_factor, DailyLoadFactor};

use crate::error::{GridcastError, Result};
use chrono::NaiveDateTime;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headline error metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    pub rmse: f64,
}

impl Metrics {
    /// MAE and RMSE of predictions against observed values.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(GridcastError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(GridcastError::DataError(
                "cannot compute metrics over zero rows".to_string(),
            ));
        }
        let n = y_true.len() as f64;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let diff = t - p;
            abs_sum += diff.abs();
            sq_sum += diff * diff;
        }
        Ok(Self {
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
        })
    }
}

/// Metrics of the naive predict-previous-value forecaster.
///
/// The first observation has no predecessor and is dropped, the same
/// alignment the feature purge applies to a lag-1 model.
pub fn persistence_baseline(values: &[f64]) -> Result<Metrics> {
    if values.len() < 2 {
        return Err(GridcastError::DataError(
            "persistence baseline needs at least two observations".to_string(),
        ));
    }
    let y_true = Array1::from_iter(values[1..].iter().copied());
    let y_pred = Array1::from_iter(values[..values.len() - 1].iter().copied());
    Metrics::compute(&y_true, &y_pred)
}

/// Per-slice MAE (slice = hour of day, entity id, holiday flag, ...).
/// Slices with zero rows are omitted, not zero-filled.
pub fn slice_breakdown<K: Ord + Clone>(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    keys: &[K],
) -> Result<BTreeMap<K, f64>> {
    if y_true.len() != y_pred.len() || y_true.len() != keys.len() {
        return Err(GridcastError::ShapeError {
            expected: format!("{} rows in every input", y_true.len()),
            actual: format!("{} predictions, {} keys", y_pred.len(), keys.len()),
        });
    }
    let mut sums: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for i in 0..keys.len() {
        let entry = sums.entry(keys[i].clone()).or_insert((0.0, 0));
        entry.0 += (y_true[i] - y_pred[i]).abs();
        entry.1 += 1;
    }
    Ok(sums
        .into_iter()
        .map(|(k, (sum, count))| (k, sum / count as f64))
        .collect())
}

/// One scored run: per-row timestamps with observed and predicted values,
/// kept together so two runs can be joined explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub timestamps: Vec<NaiveDateTime>,
    pub y_true: Vec<f64>,
    pub y_pred: Vec<f64>,
}

impl EvaluationRun {
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        y_true: Vec<f64>,
        y_pred: Vec<f64>,
    ) -> Result<Self> {
        if timestamps.len() != y_true.len() || timestamps.len() != y_pred.len() {
            return Err(GridcastError::ShapeError {
                expected: format!("{} rows in every column", timestamps.len()),
                actual: format!("{} observed, {} predicted", y_true.len(), y_pred.len()),
            });
        }
        Ok(Self {
            timestamps,
            y_true,
            y_pred,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn metrics(&self) -> Result<Metrics> {
        Metrics::compute(
            &Array1::from_vec(self.y_true.clone()),
            &Array1::from_vec(self.y_pred.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_metrics_known_values() {
        let y_true = array![10.0, 12.0, 14.0];
        let y_pred = array![11.0, 12.0, 12.0];
        let m = Metrics::compute(&y_true, &y_pred).unwrap();
        assert!((m.mae - 1.0).abs() < 1e-12);
        assert!((m.rmse - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_shape_mismatch() {
        let y_true = array![1.0, 2.0];
        let y_pred = array![1.0];
        assert!(Metrics::compute(&y_true, &y_pred).is_err());
    }

    #[test]
    fn test_perfect_prediction_is_zero() {
        let y = array![5.0, 6.0, 7.0];
        let m = Metrics::compute(&y, &y).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
    }

    #[test]
    fn test_persistence_baseline() {
        // diffs: 2, -1, 4
        let m = persistence_baseline(&[10.0, 12.0, 11.0, 15.0]).unwrap();
        assert!((m.mae - 7.0 / 3.0).abs() < 1e-12);
        assert!((m.rmse - (21.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_persistence_needs_history() {
        assert!(persistence_baseline(&[1.0]).is_err());
    }

    #[test]
    fn test_slice_breakdown_omits_empty_slices() {
        let y_true = array![10.0, 20.0, 30.0, 40.0];
        let y_pred = array![11.0, 22.0, 31.0, 44.0];
        let keys = vec![0u32, 1, 0, 1];
        let table = slice_breakdown(&y_true, &y_pred, &keys).unwrap();
        assert_eq!(table.len(), 2);
        assert!((table[&0] - 1.0).abs() < 1e-12);
        assert!((table[&1] - 3.0).abs() < 1e-12);
        assert!(!table.contains_key(&2));
    }
}
