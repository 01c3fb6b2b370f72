//! Core forecasting library for country-level development indicators.
//!
//! The service turns a per-country historical series into a multi-step
//! projection: [`prepare`] the series from a reference table, [`select_model`]
//! from a small candidate grid by AIC, then [`forecast`] with the winner.
//! [`run`] chains the three.

pub mod dataset;
pub mod error;
pub mod fit;
pub mod forecast;
pub mod metrics;
pub mod model;
pub mod report;
pub mod selection;
pub mod series;
pub mod service;

// Re-exports for convenience
pub use dataset::{DatasetDescriptor, ReferenceTable, Row};
pub use error::{ForecastError, Result};
pub use fit::{gaussian_aic, FittedModel, LibraryFitter, ModelFitter, Projection};
pub use forecast::{
    evaluate_holdout, forecast, forecast_with, run, run_with, FitQuality, ForecastOptions,
    ForecastResult, HoldoutEvaluation, DEFAULT_HORIZON,
};
pub use metrics::{mae, mape, mse, rmse};
pub use model::{
    candidate_grid, ModelCandidate, ModelFamily, DEFAULT_POLYNOMIAL_DEGREE, MAX_ARIMA_ORDER,
};
pub use report::{chart_points, markdown_table, summary, user_message, ChartPoint, Segment};
pub use selection::{search, select_model, SearchOptions, Selection};
pub use series::{prepare, Observation, PeriodRange, TimeSeries, MIN_OBSERVATIONS};
pub use service::ForecastService;
