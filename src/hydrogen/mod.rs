//! Hydrogen-production potential
//!
//! Estimates how much hydrogen an electrolyser could produce during
//! off-peak hours of a load series. Off-peak is a percentile threshold on
//! the load; available power is the electrolyser capacity, optionally
//! capped by PV output derived from an irradiance covariate.

use crate::error::{GridcastError, Result};
use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Electrolyser and accounting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2Params {
    pub capacity_mw: f64,
    /// Electricity required per kilogram of hydrogen.
    pub kwh_per_kg: f64,
    /// Grid emission factor, kg CO2e per kWh.
    pub emission_factor_kg_per_kwh: f64,
    /// PV capacity per unit of irradiance; when set together with an
    /// `irradiance_wm2` covariate, available power is PV-limited.
    pub pv_coeff_mw_per_wm2: Option<f64>,
}

/// Per-hour potential row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2Potential {
    pub offpeak: bool,
    pub kw_available: f64,
    /// Production in the hour, zero outside off-peak windows.
    pub h2_kg: f64,
}

/// Aggregated estimate over the whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2Summary {
    pub threshold_load: f64,
    pub hours_offpeak: usize,
    pub h2_total_kg: f64,
    pub co2e_kg_per_kg: f64,
}

/// Off-peak flags: load at or below the given percentile of the series.
pub fn offpeak_flags(values: &[f64], percentile: f64) -> Result<(Vec<bool>, f64)> {
    if !(0.0..=100.0).contains(&percentile) {
        return Err(GridcastError::ConfigError(format!(
            "percentile must lie in [0, 100], got {}",
            percentile
        )));
    }
    let threshold = percentile_of(values, percentile)?;
    let flags = values.iter().map(|&v| v <= threshold).collect();
    Ok((flags, threshold))
}

/// Estimate hourly hydrogen potential for a load series.
pub fn estimate_h2_potential(
    series: &TimeSeries,
    offpeak_percentile: f64,
    params: &H2Params,
) -> Result<(Vec<H2Potential>, H2Summary)> {
    if params.capacity_mw <= 0.0 || params.kwh_per_kg <= 0.0 {
        return Err(GridcastError::ConfigError(
            "capacity and efficiency must be positive".to_string(),
        ));
    }
    let (flags, threshold) = offpeak_flags(series.values(), offpeak_percentile)?;

    let capacity_kw = params.capacity_mw * 1000.0;
    let pv_kw: Option<Vec<f64>> = match (params.pv_coeff_mw_per_wm2, series.covariate("irradiance_wm2")) {
        (Some(coeff), Some(irradiance)) => {
            Some(irradiance.iter().map(|&w| w * coeff * 1000.0).collect())
        }
        _ => None,
    };

    let mut rows = Vec::with_capacity(series.len());
    let mut total_kg = 0.0;
    let mut hours_offpeak = 0;
    for i in 0..series.len() {
        let kw_available = match &pv_kw {
            Some(pv) => pv[i].min(capacity_kw),
            None => capacity_kw,
        };
        let h2_kw = if flags[i] { kw_available } else { 0.0 };
        let h2_kg = h2_kw / params.kwh_per_kg;
        if flags[i] {
            hours_offpeak += 1;
        }
        total_kg += h2_kg;
        rows.push(H2Potential {
            offpeak: flags[i],
            kw_available,
            h2_kg,
        });
    }

    let summary = H2Summary {
        threshold_load: threshold,
        hours_offpeak,
        h2_total_kg: total_kg,
        co2e_kg_per_kg: params.emission_factor_kg_per_kwh * params.kwh_per_kg,
    };
    info!(
        hours_offpeak,
        h2_total_kg = summary.h2_total_kg,
        "hydrogen potential estimated"
    );
    Ok((rows, summary))
}

/// Linear-interpolation percentile over finite values.
fn percentile_of(values: &[f64], percentile: f64) -> Result<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(GridcastError::DataError(
            "no finite values for percentile".to_string(),
        ));
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Ok(sorted[lo]);
    }
    let weight = rank - lo as f64;
    Ok(sorted[lo] * (1.0 - weight) + sorted[hi] * weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps = (0..values.len())
            .map(|i| start + Duration::hours(i as i64))
            .collect();
        TimeSeries::new(timestamps, values).unwrap()
    }

    fn params() -> H2Params {
        H2Params {
            capacity_mw: 10.0,
            kwh_per_kg: 50.0,
            emission_factor_kg_per_kwh: 0.4,
            pv_coeff_mw_per_wm2: None,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        assert_eq!(percentile_of(&[0.0, 10.0], 50.0).unwrap(), 5.0);
        assert_eq!(percentile_of(&[1.0, 2.0, 3.0, 4.0], 0.0).unwrap(), 1.0);
        assert_eq!(percentile_of(&[1.0, 2.0, 3.0, 4.0], 100.0).unwrap(), 4.0);
    }

    #[test]
    fn test_offpeak_hours_produce() {
        let s = series(vec![100.0, 900.0, 100.0, 900.0]);
        let (rows, summary) = estimate_h2_potential(&s, 50.0, &params()).unwrap();
        assert_eq!(summary.hours_offpeak, 2);
        // 10 MW for an hour at 50 kWh/kg -> 200 kg per off-peak hour.
        assert_eq!(rows[0].h2_kg, 200.0);
        assert_eq!(rows[1].h2_kg, 0.0);
        assert_eq!(summary.h2_total_kg, 400.0);
        assert_eq!(summary.co2e_kg_per_kg, 20.0);
    }

    #[test]
    fn test_pv_caps_available_power() {
        let s = series(vec![100.0, 100.0])
            .with_covariate("irradiance_wm2", vec![200.0, 2000.0])
            .unwrap();
        let p = H2Params {
            pv_coeff_mw_per_wm2: Some(0.002),
            ..params()
        };
        let (rows, _) = estimate_h2_potential(&s, 100.0, &p).unwrap();
        // 200 W/m2 * 0.002 MW per (W/m2) = 0.4 MW, PV-limited.
        assert_eq!(rows[0].kw_available, 400.0);
        // 2000 W/m2 -> 4 MW, still below the 10 MW electrolyser cap.
        assert_eq!(rows[1].kw_available, 4000.0);
    }

    #[test]
    fn test_bad_percentile_rejected() {
        let s = series(vec![1.0, 2.0]);
        assert!(estimate_h2_potential(&s, 150.0, &params()).is_err());
    }
}
