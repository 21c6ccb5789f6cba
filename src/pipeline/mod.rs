//! Forecast pipeline
//!
//! One shared enrich -> build -> split -> fit -> predict -> evaluate
//! runner. Model variants (plain lags+calendar, weekend/holiday flags,
//! weather-augmented) are expressed as [`FeatureConfig`] values consumed
//! by this single pipeline rather than duplicated per-variant code paths.

use crate::calendar::HolidayCalendar;
use crate::error::{GridcastError, Result};
use crate::evaluation::{slice_breakdown, EvaluationRun, Metrics};
use crate::features::{FeatureBuilder, FeatureConfig, FeatureMatrix, FeatureSchema};
use crate::linear::LinearModel;
use crate::series::TimeSeries;
use crate::split::{ChronoSplitter, Fold, SplitMode};
use chrono::Timelike;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Anything with a one-shot fit and a predict. `LinearRegressor` is the
/// built-in implementation; an external gradient-boosting model plugs in
/// through the same seam.
pub trait Regressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Closed-form linear regression behind the [`Regressor`] seam.
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    schema: FeatureSchema,
    ridge_lambda: f64,
    model: Option<LinearModel>,
}

impl LinearRegressor {
    pub fn new(schema: FeatureSchema, ridge_lambda: f64) -> Self {
        Self {
            schema,
            ridge_lambda,
            model: None,
        }
    }

    pub fn model(&self) -> Option<&LinearModel> {
        self.model.as_ref()
    }
}

impl Regressor for LinearRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.model = Some(LinearModel::fit_arrays(
            x,
            y,
            self.schema.clone(),
            self.ridge_lambda,
        )?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match &self.model {
            Some(model) => model.predict_x(x),
            None => Err(GridcastError::ModelNotFitted),
        }
    }
}

/// Pipeline configuration: one feature variant plus split and fit options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub split_mode: SplitMode,
    /// Walk-forward fold count; ignored for `SplitMode::Single`.
    pub fold_count: usize,
    pub ridge_lambda: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            split_mode: SplitMode::Single,
            fold_count: 3,
            ridge_lambda: 0.0,
        }
    }
}

/// Walk-forward fold scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    pub test_bucket: i32,
    pub mae: f64,
    pub rmse: f64,
}

/// Everything a run produces, handed to external reporting collaborators.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Fitted coefficients with their schema; `None` when an external
    /// regressor was used.
    pub model: Option<LinearModel>,
    /// Hold-out bucket (the last calendar year).
    pub test_bucket: i32,
    pub model_metrics: Metrics,
    /// Persistence baseline over the identical test rows.
    pub baseline_metrics: Metrics,
    pub folds: Vec<FoldReport>,
    /// Test-set MAE by hour of day.
    pub hourly_mae: BTreeMap<u32, f64>,
    /// Scored test rows for explicit cross-variant comparison.
    pub run: EvaluationRun,
}

/// The shared forecast pipeline.
pub struct ForecastPipeline {
    config: PipelineConfig,
    holidays: HolidayCalendar,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig, holidays: HolidayCalendar) -> Self {
        Self { config, holidays }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline with the built-in linear model.
    pub fn run(&self, series: &TimeSeries) -> Result<PipelineReport> {
        let builder = self.builder()?;
        let mut regressor = LinearRegressor::new(builder.schema(), self.config.ridge_lambda);
        let mut report = self.run_matrix(&builder.build(series)?, series, &mut regressor)?;
        report.model = regressor.model().cloned();
        Ok(report)
    }

    /// Run with a caller-supplied regressor (external model seam).
    pub fn run_with<M: Regressor>(
        &self,
        series: &TimeSeries,
        regressor: &mut M,
    ) -> Result<PipelineReport> {
        let builder = self.builder()?;
        self.run_matrix(&builder.build(series)?, series, regressor)
    }

    /// Run independent series in parallel. Each gets its own matrix and
    /// model; nothing is shared and the output order follows the input.
    pub fn run_grouped(
        &self,
        groups: &[(String, TimeSeries)],
    ) -> Result<Vec<(String, PipelineReport)>> {
        groups
            .par_iter()
            .map(|(id, series)| self.run(series).map(|report| (id.clone(), report)))
            .collect()
    }

    fn builder(&self) -> Result<FeatureBuilder> {
        for spec in &self.config.features.covariates {
            if spec.perfect_foresight {
                warn!(
                    column = %spec.column,
                    "concurrent covariate in use: results are a perfect-forecast upper bound"
                );
            }
        }
        FeatureBuilder::new(self.config.features.clone(), self.holidays.clone())
    }

    fn run_matrix<M: Regressor>(
        &self,
        matrix: &FeatureMatrix,
        series: &TimeSeries,
        regressor: &mut M,
    ) -> Result<PipelineReport> {
        let holdout = ChronoSplitter::single_split(&matrix.buckets)?;
        let train = matrix.select(&holdout.train_indices);
        let test = matrix.select(&holdout.test_indices);

        regressor.fit(&train.x, &train.y)?;
        let y_pred = regressor.predict(&test.x)?;
        let model_metrics = Metrics::compute(&test.y, &y_pred)?;
        let baseline_metrics = self.persistence_over(&test, series)?;

        let hours: Vec<u32> = test.timestamps.iter().map(|t| t.hour()).collect();
        let hourly_mae = slice_breakdown(&test.y, &y_pred, &hours)?;

        let folds = if self.config.split_mode == SplitMode::Single {
            Vec::new()
        } else {
            self.walk_forward_scores(matrix, regressor)?
        };

        info!(
            test_bucket = holdout.test_bucket,
            mae = model_metrics.mae,
            rmse = model_metrics.rmse,
            baseline_mae = baseline_metrics.mae,
            "pipeline run complete"
        );

        let run = EvaluationRun::new(
            test.timestamps.clone(),
            test.y.to_vec(),
            y_pred.to_vec(),
        )?;

        Ok(PipelineReport {
            model: None,
            test_bucket: holdout.test_bucket,
            model_metrics,
            baseline_metrics,
            folds,
            hourly_mae,
            run,
        })
    }

    fn walk_forward_scores<M: Regressor>(
        &self,
        matrix: &FeatureMatrix,
        regressor: &mut M,
    ) -> Result<Vec<FoldReport>> {
        let folds = ChronoSplitter::walk_forward(
            &matrix.buckets,
            self.config.fold_count,
            self.config.split_mode,
        )?;
        let mut reports = Vec::with_capacity(folds.len());
        for Fold {
            train_indices,
            test_indices,
            test_bucket,
        } in folds
        {
            let train = matrix.select(&train_indices);
            let test = matrix.select(&test_indices);
            regressor.fit(&train.x, &train.y)?;
            let y_pred = regressor.predict(&test.x)?;
            let metrics = Metrics::compute(&test.y, &y_pred)?;
            reports.push(FoldReport {
                test_bucket,
                mae: metrics.mae,
                rmse: metrics.rmse,
            });
        }
        Ok(reports)
    }

    /// Persistence forecast over exactly the surviving test rows: the last
    /// value observed before each row's target time, looked up in the raw
    /// series.
    fn persistence_over(&self, test: &FeatureMatrix, series: &TimeSeries) -> Result<Metrics> {
        let lead = self.config.features.target_lead;
        let values = series.values();
        let mut y_true = Vec::with_capacity(test.n_rows());
        let mut y_pred = Vec::with_capacity(test.n_rows());
        for (row, &ts) in test.timestamps.iter().enumerate() {
            let pos = series.position(ts).ok_or_else(|| {
                GridcastError::AlignmentError(format!(
                    "test row timestamp {} not found in source series",
                    ts
                ))
            })?;
            let prev = if lead == 0 {
                if pos == 0 {
                    continue;
                }
                values[pos - 1]
            } else {
                values[pos]
            };
            y_true.push(test.y[row]);
            y_pred.push(prev);
        }
        Metrics::compute(&Array1::from_vec(y_true), &Array1::from_vec(y_pred))
    }
}
