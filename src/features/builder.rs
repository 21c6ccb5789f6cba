//! Feature builder

use super::schema::FeatureSchema;
use super::{FeatureConfig, FeatureMatrix, RowOrder};
use crate::calendar::{CalendarEnricher, HolidayCalendar};
use crate::error::{GridcastError, Result};
use crate::series::TimeSeries;
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;
use tracing::debug;

/// Builds leakage-free supervised matrices from clean series.
///
/// Lags reference strictly earlier rows, rolling windows cover
/// `[t-w, t-1]` and never include the current observation, and every row
/// with an undefined required input is purged rather than imputed.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    config: FeatureConfig,
    enricher: CalendarEnricher,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig, holidays: HolidayCalendar) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            enricher: CalendarEnricher::new(holidays),
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Column order of every matrix this builder produces.
    pub fn schema(&self) -> FeatureSchema {
        let mut columns = Vec::new();
        if self.config.include_calendar {
            columns.push("hour".to_string());
            columns.push("day_of_week".to_string());
            columns.push("month".to_string());
        }
        if self.config.include_cyclical {
            columns.push("hour_sin".to_string());
            columns.push("hour_cos".to_string());
            columns.push("dow_sin".to_string());
            columns.push("dow_cos".to_string());
        }
        for &k in &self.config.lag_offsets {
            columns.push(format!("lag_{}", k));
        }
        for &w in &self.config.rolling_windows {
            columns.push(format!("roll_{}_{}", self.config.rolling_stat.label(), w));
        }
        if self.config.include_weekend_flag {
            columns.push("is_weekend".to_string());
        }
        if self.config.include_holiday_flag {
            columns.push("is_holiday".to_string());
        }
        for spec in &self.config.covariates {
            columns.push(spec.column.clone());
        }
        FeatureSchema::new(columns)
    }

    /// Build the matrix for a single series.
    pub fn build(&self, series: &TimeSeries) -> Result<FeatureMatrix> {
        let (timestamps, x, y, buckets) = self.build_rows(series)?;
        debug!(
            rows_in = series.len(),
            rows_out = timestamps.len(),
            "feature matrix built"
        );
        Ok(FeatureMatrix {
            timestamps,
            group_ids: None,
            x,
            y,
            schema: self.schema(),
            buckets,
            row_order: RowOrder::Chronological,
        })
    }

    /// Build one matrix over several independent entities. All lag and
    /// rolling computation is scoped within each group; output rows are
    /// ordered group by group, chronologically within each group.
    pub fn build_grouped(&self, groups: &[(String, TimeSeries)]) -> Result<FeatureMatrix> {
        if groups.is_empty() {
            return Err(GridcastError::DataError("no groups supplied".to_string()));
        }
        let schema = self.schema();
        let width = schema.width();

        let mut timestamps = Vec::new();
        let mut group_ids = Vec::new();
        let mut buckets = Vec::new();
        let mut rows: Vec<f64> = Vec::new();
        let mut y_all: Vec<f64> = Vec::new();

        for (id, series) in groups {
            let (ts, x, y, b) = self.build_rows(series)?;
            group_ids.extend(std::iter::repeat(id.clone()).take(ts.len()));
            timestamps.extend(ts);
            buckets.extend(b);
            rows.extend(x.iter().copied());
            y_all.extend(y.iter().copied());
        }

        let n = timestamps.len();
        let x = Array2::from_shape_vec((n, width), rows).map_err(|e| {
            GridcastError::ShapeError {
                expected: format!("{}x{}", n, width),
                actual: e.to_string(),
            }
        })?;

        Ok(FeatureMatrix {
            timestamps,
            group_ids: Some(group_ids),
            x,
            y: Array1::from_vec(y_all),
            schema,
            buckets,
            row_order: RowOrder::GroupedByEntity,
        })
    }

    fn build_rows(
        &self,
        series: &TimeSeries,
    ) -> Result<(Vec<NaiveDateTime>, Array2<f64>, Array1<f64>, Vec<i32>)> {
        let values = series.values();
        let n = values.len();
        let attrs = self.enricher.enrich(series.timestamps());

        let mut columns: Vec<Vec<f64>> = Vec::new();

        if self.config.include_calendar {
            columns.push(attrs.iter().map(|a| a.hour as f64).collect());
            columns.push(attrs.iter().map(|a| a.day_of_week as f64).collect());
            columns.push(attrs.iter().map(|a| a.month as f64).collect());
        }
        if self.config.include_cyclical {
            columns.push(attrs.iter().map(|a| (2.0 * PI * a.hour as f64 / 24.0).sin()).collect());
            columns.push(attrs.iter().map(|a| (2.0 * PI * a.hour as f64 / 24.0).cos()).collect());
            columns.push(attrs.iter().map(|a| (2.0 * PI * a.day_of_week as f64 / 7.0).sin()).collect());
            columns.push(attrs.iter().map(|a| (2.0 * PI * a.day_of_week as f64 / 7.0).cos()).collect());
        }
        for &k in &self.config.lag_offsets {
            let mut col = vec![f64::NAN; n];
            for i in k..n {
                col[i] = values[i - k];
            }
            columns.push(col);
        }
        for &w in &self.config.rolling_windows {
            let mut col = vec![f64::NAN; n];
            for i in w..n {
                col[i] = self.config.rolling_stat.apply(&values[i - w..i]);
            }
            columns.push(col);
        }
        if self.config.include_weekend_flag {
            columns.push(attrs.iter().map(|a| if a.is_weekend { 1.0 } else { 0.0 }).collect());
        }
        if self.config.include_holiday_flag {
            columns.push(attrs.iter().map(|a| if a.is_holiday { 1.0 } else { 0.0 }).collect());
        }
        for spec in &self.config.covariates {
            let col = series.covariate(&spec.column).ok_or_else(|| {
                GridcastError::ConfigError(format!(
                    "covariate column '{}' not present in series",
                    spec.column
                ))
            })?;
            columns.push(col.to_vec());
        }

        // Target, shifted forward by the configured lead.
        let lead = self.config.target_lead;
        let target: Vec<f64> = (0..n)
            .map(|i| {
                if i + lead < n {
                    values[i + lead]
                } else {
                    f64::NAN
                }
            })
            .collect();

        // Purge: a row survives only when every required input is defined.
        let keep: Vec<usize> = (0..n)
            .filter(|&i| target[i].is_finite() && columns.iter().all(|c| c[i].is_finite()))
            .collect();

        let width = columns.len() + 1;
        let mut data = Vec::with_capacity(keep.len() * width);
        for &i in &keep {
            data.push(1.0);
            for c in &columns {
                data.push(c[i]);
            }
        }
        let x = Array2::from_shape_vec((keep.len(), width), data).map_err(|e| {
            GridcastError::ShapeError {
                expected: format!("{}x{}", keep.len(), width),
                actual: e.to_string(),
            }
        })?;
        let y = Array1::from_iter(keep.iter().map(|&i| target[i]));
        let timestamps: Vec<NaiveDateTime> =
            keep.iter().map(|&i| series.timestamps()[i]).collect();
        let buckets: Vec<i32> = keep.iter().map(|&i| attrs[i].year).collect();

        Ok((timestamps, x, y, buckets))
    }
}
