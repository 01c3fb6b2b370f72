//! Accuracy metrics for in-sample fits and holdout evaluation.
//!
//! - **Scale-dependent**: MAE, MSE, RMSE
//! - **Percentage**: MAPE

use crate::error::{ForecastError, Result};

/// Mean Absolute Error.
///
/// # Example
/// ```
/// use wdi_fcst_core::metrics::mae;
/// let actual = vec![1.0, 2.0, 3.0];
/// let forecast = vec![1.1, 2.2, 2.8];
/// let error = mae(&actual, &forecast).unwrap();
/// assert!((error - 0.166).abs() < 0.01);
/// ```
pub fn mae(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Mean Squared Error.
pub fn mse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let sum: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Root Mean Squared Error.
pub fn rmse(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    mse(actual, forecast).map(f64::sqrt)
}

/// Mean Absolute Percentage Error, in percent.
///
/// Actual values of zero are excluded; fails if every actual value is zero.
pub fn mape(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    validate_inputs(actual, forecast)?;
    let terms: Vec<f64> = actual
        .iter()
        .zip(forecast.iter())
        .filter(|(a, _)| a.abs() > f64::EPSILON)
        .map(|(a, f)| ((a - f) / a).abs())
        .collect();
    if terms.is_empty() {
        return Err(ForecastError::InvalidInput(
            "MAPE is undefined when all actual values are zero".to_string(),
        ));
    }
    Ok(100.0 * terms.iter().sum::<f64>() / terms.len() as f64)
}

/// Population standard deviation of residuals around zero.
pub fn residual_std(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
}

fn validate_inputs(actual: &[f64], forecast: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(ForecastError::InvalidInput(
            "Input arrays must not be empty".to_string(),
        ));
    }
    if actual.len() != forecast.len() {
        return Err(ForecastError::InvalidInput(format!(
            "Length mismatch: actual has {} values, forecast has {}",
            actual.len(),
            forecast.len()
        )));
    }
    Ok(())
}
