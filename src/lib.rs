//! Gridcast - time-series feature and evaluation engine for energy-load
//! forecasting
//!
//! Builds leakage-free supervised matrices from raw load series, splits
//! them chronologically, fits a closed-form linear model and scores it
//! against a persistence baseline:
//!
//! - [`series`] - clean series container and tabular ingestion boundary
//! - [`calendar`] - calendar/season/holiday enrichment
//! - [`features`] - lag, rolling-window and calendar feature construction
//! - [`split`] - single hold-out and walk-forward chronological splitting
//! - [`linear`] - pseudo-inverse normal-equation regression
//! - [`evaluation`] - MAE/RMSE, baselines, slice breakdowns, comparisons
//! - [`pipeline`] - the shared enrich/build/split/fit/evaluate runner
//! - [`hydrogen`] - off-peak hydrogen-production potential estimation
//!
//! The whole engine is batch-oriented and deterministic: one run consumes
//! one in-memory series, shares nothing, and reproduces its coefficients
//! bit for bit on identical input.

pub mod calendar;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod hydrogen;
pub mod linear;
pub mod pipeline;
pub mod series;
pub mod split;

pub use error::{GridcastError, Result};

/// Re-export of commonly used types
pub mod prelude {
    pub use crate::calendar::{CalendarAttributes, CalendarEnricher, HolidayCalendar, Season};
    pub use crate::error::{GridcastError, Result};
    pub use crate::evaluation::{
        compare_by_hour, daily_load_factor, persistence_baseline, slice_breakdown, EvaluationRun,
        Metrics,
    };
    pub use crate::features::{
        CovariateSpec, FeatureBuilder, FeatureConfig, FeatureMatrix, FeatureSchema, RollingStat,
        RowOrder,
    };
    pub use crate::hydrogen::{estimate_h2_potential, offpeak_flags, H2Params, H2Summary};
    pub use crate::linear::LinearModel;
    pub use crate::pipeline::{
        ForecastPipeline, LinearRegressor, PipelineConfig, PipelineReport, Regressor,
    };
    pub use crate::series::{DedupAgg, SeriesLoader, TimePoint, TimeSeries};
    pub use crate::split::{ChronoSplitter, Fold, SplitMode};
}
