//! Projection of a chosen model and the prepare → select → forecast pipeline.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::dataset::Row;
use crate::error::{ForecastError, Result};
use crate::fit::{LibraryFitter, ModelFitter};
use crate::metrics::{mae, mape, residual_std, rmse};
use crate::model::{ModelCandidate, ModelFamily};
use crate::selection::{fit_isolated, search, SearchOptions, Selection};
use crate::series::{prepare, Observation, PeriodRange, TimeSeries};

/// Horizon used by the dashboard's forecast pages.
pub const DEFAULT_HORIZON: usize = 10;

/// Forecast options.
#[derive(Debug, Clone, Copy)]
pub struct ForecastOptions {
    /// Number of periods to project
    pub horizon: usize,
    /// Confidence level of the prediction interval (0-1)
    pub confidence_level: f64,
    /// Candidate search options
    pub search: SearchOptions,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            confidence_level: 0.95,
            search: SearchOptions::default(),
        }
    }
}

impl ForecastOptions {
    pub fn with_horizon(horizon: usize) -> Self {
        Self {
            horizon,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::invalid_parameter(
                "horizon",
                self.horizon,
                "must be at least 1",
            ));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::invalid_parameter(
                "confidence_level",
                self.confidence_level,
                "must be between 0 and 1 (exclusive)",
            ));
        }
        Ok(())
    }
}

/// In-sample quality of the final fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub aic: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Forecast for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub entity_id: String,
    pub chosen_model: ModelCandidate,
    /// `last + 1 ..= last + horizon`
    pub projected_periods: Vec<i32>,
    /// Point forecasts, parallel to `projected_periods`
    pub projected_values: Vec<f64>,
    /// Lower prediction-interval bounds
    pub lower: Vec<f64>,
    /// Upper prediction-interval bounds
    pub upper: Vec<f64>,
    pub confidence_level: f64,
    pub quality: FitQuality,
    /// Observations the model was fit to
    pub history: Vec<Observation>,
}

impl ForecastResult {
    pub fn horizon(&self) -> usize {
        self.projected_periods.len()
    }

    /// Projected `(period, value)` pairs.
    pub fn projections(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.projected_periods
            .iter()
            .copied()
            .zip(self.projected_values.iter().copied())
    }
}

/// Refit `model` on the full series and project `horizon` periods ahead.
pub fn forecast(series: &TimeSeries, model: ModelCandidate, horizon: usize) -> Result<ForecastResult> {
    forecast_with(
        &LibraryFitter,
        series,
        model,
        &ForecastOptions::with_horizon(horizon),
    )
}

/// [`forecast`] with an explicit fitter and options.
pub fn forecast_with<F: ModelFitter>(
    fitter: &F,
    series: &TimeSeries,
    model: ModelCandidate,
    options: &ForecastOptions,
) -> Result<ForecastResult> {
    options.validate()?;
    let horizon = options.horizon;

    let last = series.last_period();
    let projected_periods = i32::try_from(horizon)
        .ok()
        .and_then(|h| last.checked_add(h))
        .map(|end| (last + 1..=end).collect::<Vec<i32>>())
        .ok_or_else(|| {
            ForecastError::invalid_parameter("horizon", horizon, "projects past the last period")
        })?;

    let fitted = fit_isolated(fitter, series, model)?;
    let projected_values = fitted.project(horizon)?;

    let (lower, upper) = prediction_intervals(
        &projected_values,
        fitted.residuals(),
        options.confidence_level,
    )?;

    let residuals = fitted.residuals();
    let zeros = vec![0.0; residuals.len()];
    let quality = FitQuality {
        aic: fitted.aic(),
        rmse: rmse(residuals, &zeros).unwrap_or(0.0),
        mae: mae(residuals, &zeros).unwrap_or(0.0),
    };

    Ok(ForecastResult {
        entity_id: series.entity_id().to_string(),
        chosen_model: model,
        projected_periods,
        projected_values,
        lower,
        upper,
        confidence_level: options.confidence_level,
        quality,
        history: series.observations().to_vec(),
    })
}

/// `ŷ_h ± z·σ·√h` with `σ` the in-sample residual standard deviation.
fn prediction_intervals(
    point: &[f64],
    residuals: &[f64],
    confidence: f64,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::ComputationError(format!("normal distribution: {}", e)))?;
    let z = normal.inverse_cdf(0.5 + confidence / 2.0);
    let sigma = residual_std(residuals);

    let half_width = |i: usize| z * sigma * ((i + 1) as f64).sqrt();
    let lower = point
        .iter()
        .enumerate()
        .map(|(i, &f)| f - half_width(i))
        .collect();
    let upper = point
        .iter()
        .enumerate()
        .map(|(i, &f)| f + half_width(i))
        .collect();
    Ok((lower, upper))
}

/// Prepare, select and forecast in one call.
pub fn run(
    raw_rows: &[Row],
    entity_id: &str,
    period_range: &PeriodRange,
    family: ModelFamily,
    horizon: usize,
) -> Result<ForecastResult> {
    run_with(
        &LibraryFitter,
        raw_rows,
        entity_id,
        period_range,
        family,
        &ForecastOptions::with_horizon(horizon),
    )
}

/// [`run`] with an explicit fitter and options.
pub fn run_with<F: ModelFitter>(
    fitter: &F,
    raw_rows: &[Row],
    entity_id: &str,
    period_range: &PeriodRange,
    family: ModelFamily,
    options: &ForecastOptions,
) -> Result<ForecastResult> {
    options.validate()?;
    let series = prepare(raw_rows, entity_id, period_range)?;
    let Selection { candidate, .. } = search(fitter, &series, family, &options.search)?;
    forecast_with(fitter, &series, candidate, options)
}

/// Accuracy of a forecast made without the last `holdout` observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldoutEvaluation {
    pub chosen_model: ModelCandidate,
    pub holdout_periods: Vec<i32>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    /// Prediction-interval bounds matched to `holdout_periods`
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub confidence_level: f64,
    /// Share of held-out actuals inside their interval
    pub coverage: f64,
    pub mae: f64,
    pub rmse: f64,
    /// `None` when every held-out actual is zero
    pub mape: Option<f64>,
}

/// Hold out the trailing `holdout` observations, forecast them from the rest,
/// and score the forecast against what was observed.
///
/// Predictions are matched to held-out periods, so gaps inside the holdout
/// window are handled. `options.horizon` is replaced by the span of the
/// holdout window; search and confidence settings are used as given.
pub fn evaluate_holdout<F: ModelFitter>(
    fitter: &F,
    series: &TimeSeries,
    family: ModelFamily,
    holdout: usize,
    options: &ForecastOptions,
) -> Result<HoldoutEvaluation> {
    if holdout == 0 || holdout >= series.len() {
        return Err(ForecastError::invalid_parameter(
            "holdout",
            holdout,
            "must be at least 1 and leave training observations",
        ));
    }

    let split = series.len() - holdout;
    let train = TimeSeries::new(
        series.entity_id(),
        series.observations()[..split].to_vec(),
    )?;
    let test = &series.observations()[split..];

    let selection = search(fitter, &train, family, &options.search)?;
    let span = (test[test.len() - 1].period - train.last_period()) as usize;
    let result = forecast_with(
        fitter,
        &train,
        selection.candidate,
        &ForecastOptions {
            horizon: span,
            ..*options
        },
    )?;

    let steps: Vec<usize> = test
        .iter()
        .map(|o| (o.period - train.last_period() - 1) as usize)
        .collect();
    let predicted: Vec<f64> = steps.iter().map(|&i| result.projected_values[i]).collect();
    let lower: Vec<f64> = steps.iter().map(|&i| result.lower[i]).collect();
    let upper: Vec<f64> = steps.iter().map(|&i| result.upper[i]).collect();
    let actual: Vec<f64> = test.iter().map(|o| o.value).collect();

    let covered = actual
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .filter(|(a, (lo, hi))| *lo <= *a && *a <= *hi)
        .count();

    Ok(HoldoutEvaluation {
        chosen_model: selection.candidate,
        holdout_periods: test.iter().map(|o| o.period).collect(),
        coverage: covered as f64 / actual.len() as f64,
        confidence_level: result.confidence_level,
        lower,
        upper,
        mae: mae(&actual, &predicted)?,
        rmse: rmse(&actual, &predicted)?,
        mape: mape(&actual, &predicted).ok(),
        actual,
        predicted,
    })
}
