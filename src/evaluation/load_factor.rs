//! Daily load factor
//!
//! Operational metric over the raw series: per-day mean, peak and their
//! ratio. Low factors flag days with sharp peaks over a modest base —
//! candidates for load shifting.

use crate::series::TimeSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoadFactor {
    pub date: NaiveDate,
    pub mean: f64,
    pub peak: f64,
    /// mean / peak, in (0, 1] for a non-negative signal.
    pub factor: f64,
}

/// Per-day load factor table, in date order. Days whose peak is zero or
/// non-finite are omitted.
pub fn daily_load_factor(series: &TimeSeries) -> Vec<DailyLoadFactor> {
    let mut days: BTreeMap<NaiveDate, (f64, f64, usize)> = BTreeMap::new();
    for (ts, &value) in series.timestamps().iter().zip(series.values()) {
        let entry = days
            .entry(ts.date())
            .or_insert((0.0, f64::NEG_INFINITY, 0));
        entry.0 += value;
        entry.1 = entry.1.max(value);
        entry.2 += 1;
    }

    days.into_iter()
        .filter_map(|(date, (sum, peak, count))| {
            if peak == 0.0 || !peak.is_finite() {
                return None;
            }
            let mean = sum / count as f64;
            Some(DailyLoadFactor {
                date,
                mean,
                peak,
                factor: mean / peak,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_daily_load_factor() {
        let start = NaiveDate::from_ymd_opt(2017, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        // Two days: flat 100 then a 100/200 alternation.
        let timestamps: Vec<_> = (0..48).map(|i| start + Duration::hours(i)).collect();
        let values: Vec<f64> = (0..48)
            .map(|i| {
                if i < 24 {
                    100.0
                } else if i % 2 == 0 {
                    100.0
                } else {
                    200.0
                }
            })
            .collect();
        let series = TimeSeries::new(timestamps, values).unwrap();

        let table = daily_load_factor(&series);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].factor, 1.0);
        assert!((table[1].mean - 150.0).abs() < 1e-12);
        assert_eq!(table[1].peak, 200.0);
        assert!((table[1].factor - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_peak_day_omitted() {
        let start = NaiveDate::from_ymd_opt(2017, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps: Vec<_> = (0..24).map(|i| start + Duration::hours(i)).collect();
        let series = TimeSeries::new(timestamps, vec![0.0; 24]).unwrap();
        assert!(daily_load_factor(&series).is_empty());
    }
}
