//! Fitting a single model candidate to a series.
//!
//! [`LibraryFitter`] delegates ARIMA candidates to `anofox-forecast` and
//! polynomial candidates to an OLS fit from `anofox-regression`. Anything that
//! implements [`ModelFitter`] can stand in for it during model search.

use std::fmt;

use anofox_forecast::core::TimeSeriesBuilder;
use anofox_forecast::models::arima::ARIMA;
use anofox_forecast::prelude::Forecaster;
use anofox_regression::prelude::*;

use crate::error::{ForecastError, Result};
use crate::model::ModelCandidate;
use crate::series::TimeSeries;

/// Multi-step projection from a fitted model.
pub trait Projection {
    /// Point forecasts for steps `1..=horizon` after the last observation.
    fn project(&self, horizon: usize) -> Result<Vec<f64>>;
}

/// A candidate fit to a particular series.
pub struct FittedModel {
    candidate: ModelCandidate,
    aic: f64,
    fitted: Vec<f64>,
    residuals: Vec<f64>,
    projection: Box<dyn Projection>,
}

impl FittedModel {
    pub fn new(
        candidate: ModelCandidate,
        aic: f64,
        fitted: Vec<f64>,
        residuals: Vec<f64>,
        projection: Box<dyn Projection>,
    ) -> Self {
        Self {
            candidate,
            aic,
            fitted,
            residuals,
            projection,
        }
    }

    pub fn candidate(&self) -> ModelCandidate {
        self.candidate
    }

    /// Akaike Information Criterion of the fit; lower is better.
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// In-sample fitted values.
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// In-sample residuals (actual - fitted).
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Project `horizon` steps ahead.
    ///
    /// Fails unless exactly `horizon` finite values come back.
    pub fn project(&self, horizon: usize) -> Result<Vec<f64>> {
        let values = self.projection.project(horizon)?;
        if values.len() != horizon {
            return Err(ForecastError::ComputationError(format!(
                "{} returned {} projected values, expected {}",
                self.candidate,
                values.len(),
                horizon
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(format!(
                "{} produced a non-finite projection",
                self.candidate
            )));
        }
        Ok(values)
    }
}

impl fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedModel")
            .field("candidate", &self.candidate)
            .field("aic", &self.aic)
            .field("n_fitted", &self.fitted.len())
            .finish_non_exhaustive()
    }
}

/// Fits one candidate to one series.
pub trait ModelFitter {
    fn fit(&self, series: &TimeSeries, candidate: ModelCandidate) -> Result<FittedModel>;
}

/// Production fitter backed by `anofox-forecast` and `anofox-regression`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryFitter;

impl ModelFitter for LibraryFitter {
    fn fit(&self, series: &TimeSeries, candidate: ModelCandidate) -> Result<FittedModel> {
        match candidate {
            ModelCandidate::Arima { p, d, q } => fit_arima(series, p, d, q),
            ModelCandidate::Polynomial { degree } => fit_polynomial(series, degree),
        }
    }
}

/// Gaussian-likelihood AIC from residuals with `n_params` estimated coefficients.
///
/// SSE is floored at `f64::MIN_POSITIVE` so an exact fit stays finite.
pub fn gaussian_aic(residuals: &[f64], n_params: usize) -> f64 {
    let n = residuals.len() as f64;
    let sse = residuals
        .iter()
        .map(|r| r * r)
        .sum::<f64>()
        .max(f64::MIN_POSITIVE);
    n * (2.0 * std::f64::consts::PI).ln() + n * (sse / n).ln() + n + 2.0 * n_params as f64
}

// ============================================================================
// ARIMA
// ============================================================================

struct ArimaProjection {
    model: ARIMA,
}

impl Projection for ArimaProjection {
    fn project(&self, horizon: usize) -> Result<Vec<f64>> {
        let forecast = self.model.predict(horizon).map_err(|e| {
            ForecastError::ComputationError(format!("Failed to generate ARIMA forecasts: {}", e))
        })?;
        Ok(forecast.point().first().cloned().unwrap_or_default())
    }
}

fn fit_arima(series: &TimeSeries, p: usize, d: usize, q: usize) -> Result<FittedModel> {
    let candidate = ModelCandidate::Arima { p, d, q };
    let values = series.values();

    // Differencing consumes d points; the remaining ones must outnumber the ARMA terms.
    if values.len() <= p + d + q {
        return Err(ForecastError::ComputationError(format!(
            "{} needs more than {} observations, got {}",
            candidate,
            p + d + q,
            values.len()
        )));
    }

    let time_series = TimeSeriesBuilder::new()
        .values(values.clone())
        .build()
        .map_err(|e| {
            ForecastError::ComputationError(format!("Failed to build TimeSeries: {}", e))
        })?;

    let mut model = ARIMA::new(p, d, q);
    model.fit(&time_series).map_err(|e| {
        ForecastError::ComputationError(format!("Failed to fit {}: {}", candidate, e))
    })?;

    let residuals: Vec<f64> = model
        .residuals()
        .map(|r| r.iter().copied().filter(|v| v.is_finite()).collect())
        .unwrap_or_default();
    let fitted: Vec<f64> = model
        .fitted_values()
        .map(|f| f.to_vec())
        .unwrap_or_default();

    let aic = arima_aic(candidate, model.aic())?;

    Ok(FittedModel::new(
        candidate,
        aic,
        fitted,
        residuals,
        Box::new(ArimaProjection { model }),
    ))
}

/// Only the library's own AIC ranks ARIMA candidates; a missing or non-finite
/// value fails the fit.
fn arima_aic(candidate: ModelCandidate, reported: Option<f64>) -> Result<f64> {
    match reported {
        Some(aic) if aic.is_finite() => Ok(aic),
        Some(_) => Err(ForecastError::ComputationError(format!(
            "{} produced a non-finite AIC",
            candidate
        ))),
        None => Err(ForecastError::ComputationError(format!(
            "{} did not report an AIC",
            candidate
        ))),
    }
}

// ============================================================================
// Polynomial trend
// ============================================================================

/// `value = intercept + Σ coefficients[j] * t^(j+1)`, `t = period - origin`.
#[derive(Debug, Clone)]
struct PolynomialProjection {
    intercept: f64,
    coefficients: Vec<f64>,
    /// `t` of the last observation
    last_t: f64,
}

impl PolynomialProjection {
    fn evaluate(&self, t: f64) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .fold(self.intercept, |acc, (j, beta)| acc + beta * t.powi(j as i32 + 1))
    }
}

impl Projection for PolynomialProjection {
    fn project(&self, horizon: usize) -> Result<Vec<f64>> {
        Ok((1..=horizon)
            .map(|h| self.evaluate(self.last_t + h as f64))
            .collect())
    }
}

fn fit_polynomial(series: &TimeSeries, degree: usize) -> Result<FittedModel> {
    let candidate = ModelCandidate::Polynomial { degree };
    let y = series.values();
    let n = y.len();

    if n < degree + 1 {
        return Err(ForecastError::ComputationError(format!(
            "{} needs at least {} observations, got {}",
            candidate,
            degree + 1,
            n
        )));
    }

    // Offsets from the first period keep t^degree well conditioned for calendar years.
    let origin = series.first_period();
    let t: Vec<f64> = series
        .periods()
        .iter()
        .map(|&p| (p - origin) as f64)
        .collect();

    let (intercept, coefficients) = if degree == 0 {
        (y.iter().sum::<f64>() / n as f64, Vec::new())
    } else {
        let x_mat = faer::Mat::from_fn(n, degree, |i, j| t[i].powi(j as i32 + 1));
        let y_col = faer::Col::from_fn(n, |i| y[i]);

        let fitted = match OlsRegressor::builder()
            .with_intercept(true)
            .build()
            .fit(&x_mat, &y_col)
        {
            Ok(f) => f,
            Err(_) => {
                return Err(ForecastError::ComputationError(format!(
                    "Least-squares fit failed for {}",
                    candidate
                )))
            }
        };

        let intercept = fitted.intercept().unwrap_or(0.0);
        let coeffs_col = fitted.coefficients();
        let coefficients: Vec<f64> = (0..coeffs_col.nrows()).map(|i| coeffs_col[i]).collect();
        (intercept, coefficients)
    };

    if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
        return Err(ForecastError::ComputationError(format!(
            "{} has non-finite coefficients",
            candidate
        )));
    }

    let projection = PolynomialProjection {
        intercept,
        coefficients,
        last_t: t[n - 1],
    };
    let fitted: Vec<f64> = t.iter().map(|&ti| projection.evaluate(ti)).collect();
    let residuals: Vec<f64> = y.iter().zip(fitted.iter()).map(|(a, f)| a - f).collect();
    let aic = gaussian_aic(&residuals, candidate.n_params());

    Ok(FittedModel::new(
        candidate,
        aic,
        fitted,
        residuals,
        Box::new(projection),
    ))
}
