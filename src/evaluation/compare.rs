//! Variant comparison
//!
//! Two scored runs are compared through an explicit per-timestamp join.
//! If the two row sets differ at all the comparison aborts with an
//! alignment error: positional pairing of mismatched rows would silently
//! corrupt the improvement column.

use super::EvaluationRun;
use crate::error::{GridcastError, Result};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the comparison table. `improvement = mae_a - mae_b`:
/// positive means variant B is better on that slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceComparison<K> {
    pub key: K,
    pub mae_a: f64,
    pub mae_b: f64,
    pub improvement: f64,
}

/// Compare two runs slice by slice, keyed by `key_fn` over the timestamp.
/// Rows are returned sorted by improvement, best first.
pub fn compare_by_slice<K, F>(
    a: &EvaluationRun,
    b: &EvaluationRun,
    key_fn: F,
) -> Result<Vec<SliceComparison<K>>>
where
    K: Ord + Clone,
    F: Fn(NaiveDateTime) -> K,
{
    let joined = join_rows(a, b)?;

    let mut slices: BTreeMap<K, (f64, f64, usize)> = BTreeMap::new();
    for (ts, err_a, err_b) in joined {
        let entry = slices.entry(key_fn(ts)).or_insert((0.0, 0.0, 0));
        entry.0 += err_a;
        entry.1 += err_b;
        entry.2 += 1;
    }

    let mut table: Vec<SliceComparison<K>> = slices
        .into_iter()
        .map(|(key, (sum_a, sum_b, count))| {
            let mae_a = sum_a / count as f64;
            let mae_b = sum_b / count as f64;
            SliceComparison {
                key,
                mae_a,
                mae_b,
                improvement: mae_a - mae_b,
            }
        })
        .collect();
    table.sort_by(|l, r| {
        r.improvement
            .partial_cmp(&l.improvement)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(table)
}

/// Hour-of-day comparison table, the diagnostic the reports lead with.
pub fn compare_by_hour(
    a: &EvaluationRun,
    b: &EvaluationRun,
) -> Result<Vec<SliceComparison<u32>>> {
    compare_by_slice(a, b, |ts| ts.hour())
}

/// Inner-join the two runs on timestamp, requiring the row sets to be
/// identical. Returns (timestamp, abs_err_a, abs_err_b) per row.
fn join_rows(a: &EvaluationRun, b: &EvaluationRun) -> Result<Vec<(NaiveDateTime, f64, f64)>> {
    let b_rows: BTreeMap<NaiveDateTime, (f64, f64)> = b
        .timestamps
        .iter()
        .zip(b.y_true.iter().zip(b.y_pred.iter()))
        .map(|(&ts, (&t, &p))| (ts, (t, p)))
        .collect();
    if b_rows.len() != b.len() {
        return Err(GridcastError::AlignmentError(
            "right-hand run contains duplicate timestamps".to_string(),
        ));
    }

    let mut joined = Vec::with_capacity(a.len());
    let mut seen = 0usize;
    for i in 0..a.len() {
        let ts = a.timestamps[i];
        match b_rows.get(&ts) {
            Some(&(bt, bp)) => {
                seen += 1;
                joined.push((ts, (a.y_true[i] - a.y_pred[i]).abs(), (bt - bp).abs()));
            }
            None => {
                return Err(GridcastError::AlignmentError(format!(
                    "timestamp {} present in one run but not the other",
                    ts
                )));
            }
        }
    }
    if seen != b_rows.len() {
        return Err(GridcastError::AlignmentError(format!(
            "runs cover different row sets: {} joined of {} right-hand rows",
            seen,
            b_rows.len()
        )));
    }
    Ok(joined)
}
