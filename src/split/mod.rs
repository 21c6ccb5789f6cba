//! Chronological splitting
//!
//! Train/test partitions are always derived from a calendar bucket (the
//! year of each row), never from row position or random sampling. Two
//! modes: a single last-bucket hold-out, and walk-forward validation with
//! expanding or rolling training windows.

use crate::error::{GridcastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Split strategy, as configured by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    /// Last bucket is the test set, everything earlier trains.
    Single,
    /// Walk-forward: train on all buckets strictly before the test bucket.
    Expanding,
    /// Walk-forward: train on exactly the immediately preceding bucket.
    Rolling,
}

/// One chronological train/test partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    /// Bucket value the test rows share.
    pub test_bucket: i32,
}

/// Partitions rows by calendar bucket.
pub struct ChronoSplitter;

impl ChronoSplitter {
    /// Hold out every row of the maximum bucket as the test set.
    ///
    /// Asking for this contrast with fewer than two distinct buckets is an
    /// error: the caller requested a comparison that cannot exist.
    pub fn single_split(buckets: &[i32]) -> Result<Fold> {
        let distinct: BTreeSet<i32> = buckets.iter().copied().collect();
        if distinct.len() < 2 {
            return Err(GridcastError::InsufficientHistory {
                needed: 2,
                available: distinct.len(),
            });
        }
        let last = *distinct.iter().next_back().unwrap();
        let (mut train, mut test) = (Vec::new(), Vec::new());
        for (i, &b) in buckets.iter().enumerate() {
            if b == last {
                test.push(i);
            } else {
                train.push(i);
            }
        }
        Ok(Fold {
            train_indices: train,
            test_indices: test,
            test_bucket: last,
        })
    }

    /// Walk-forward folds over the last `n_folds` buckets, yielded in
    /// increasing test-bucket order.
    ///
    /// Fewer than two distinct buckets is a valid "not enough history"
    /// outcome and returns an empty list. A fold whose train or test set
    /// comes up empty is skipped, not an error.
    pub fn walk_forward(buckets: &[i32], n_folds: usize, mode: SplitMode) -> Result<Vec<Fold>> {
        if mode == SplitMode::Single {
            return Err(GridcastError::ConfigError(
                "walk-forward requires expanding or rolling mode".to_string(),
            ));
        }
        let distinct: Vec<i32> = buckets
            .iter()
            .copied()
            .collect::<BTreeSet<i32>>()
            .into_iter()
            .collect();
        if distinct.len() < 2 {
            return Ok(Vec::new());
        }

        let end = distinct.len();
        let start = end.saturating_sub(n_folds).max(1);
        let mut folds = Vec::new();
        for i in start..end {
            let test_bucket = distinct[i];
            let train_buckets: &[i32] = match mode {
                SplitMode::Expanding => &distinct[..i],
                SplitMode::Rolling => &distinct[i - 1..i],
                SplitMode::Single => unreachable!(),
            };
            let train: Vec<usize> = buckets
                .iter()
                .enumerate()
                .filter(|(_, b)| train_buckets.contains(b))
                .map(|(idx, _)| idx)
                .collect();
            let test: Vec<usize> = buckets
                .iter()
                .enumerate()
                .filter(|(_, &b)| b == test_bucket)
                .map(|(idx, _)| idx)
                .collect();
            if train.is_empty() || test.is_empty() {
                continue;
            }
            folds.push(Fold {
                train_indices: train,
                test_indices: test,
                test_bucket,
            });
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_split_takes_last_bucket() {
        let buckets = vec![2015, 2015, 2016, 2016, 2017, 2017];
        let fold = ChronoSplitter::single_split(&buckets).unwrap();
        assert_eq!(fold.test_bucket, 2017);
        assert_eq!(fold.train_indices, vec![0, 1, 2, 3]);
        assert_eq!(fold.test_indices, vec![4, 5]);
    }

    #[test]
    fn test_single_split_needs_two_buckets() {
        let result = ChronoSplitter::single_split(&[2017, 2017, 2017]);
        assert!(matches!(
            result,
            Err(GridcastError::InsufficientHistory { available: 1, .. })
        ));
    }

    #[test]
    fn test_walk_forward_expanding() {
        let buckets = vec![2014, 2015, 2015, 2016, 2017];
        let folds = ChronoSplitter::walk_forward(&buckets, 3, SplitMode::Expanding).unwrap();
        assert_eq!(folds.len(), 3);
        assert_eq!(folds[0].test_bucket, 2015);
        assert_eq!(folds[1].test_bucket, 2016);
        assert_eq!(folds[2].test_bucket, 2017);
        // Expanding: each fold's train buckets include everything earlier.
        assert_eq!(folds[2].train_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_walk_forward_rolling_trains_on_previous_bucket_only() {
        let buckets = vec![2014, 2015, 2015, 2016, 2017];
        let folds = ChronoSplitter::walk_forward(&buckets, 2, SplitMode::Rolling).unwrap();
        assert_eq!(folds.len(), 2);
        // Test 2017 trains on 2016 alone.
        assert_eq!(folds[1].train_indices, vec![3]);
        assert_eq!(folds[1].test_indices, vec![4]);
    }

    #[test]
    fn test_walk_forward_short_history_is_empty_not_error() {
        let folds = ChronoSplitter::walk_forward(&[2017, 2017], 3, SplitMode::Expanding).unwrap();
        assert!(folds.is_empty());
    }

    #[test]
    fn test_walk_forward_caps_folds_at_history() {
        let buckets = vec![2016, 2017];
        let folds = ChronoSplitter::walk_forward(&buckets, 5, SplitMode::Expanding).unwrap();
        assert_eq!(folds.len(), 1);
        assert_eq!(folds[0].test_bucket, 2017);
    }

    #[test]
    fn test_folds_are_disjoint() {
        let buckets: Vec<i32> = (0..100).map(|i| 2014 + (i % 4)).collect();
        let folds = ChronoSplitter::walk_forward(&buckets, 3, SplitMode::Expanding).unwrap();
        for fold in &folds {
            for idx in &fold.test_indices {
                assert!(!fold.train_indices.contains(idx));
            }
        }
    }

    #[test]
    fn test_single_mode_rejected_for_walk_forward() {
        assert!(ChronoSplitter::walk_forward(&[2016, 2017], 2, SplitMode::Single).is_err());
    }
}
