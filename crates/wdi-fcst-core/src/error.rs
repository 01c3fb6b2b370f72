//! Error types for the forecast service.

use thiserror::Error;

/// Result type for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Error types for forecast service operations.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid series for '{entity}': need at least {needed} usable observations, got {got}")]
    InvalidSeries {
        entity: String,
        /// Rows for the entity inside the period window, before filtering
        rows: usize,
        needed: usize,
        got: usize,
    },

    #[error("No viable model for '{entity}': all {attempted} candidate fits failed")]
    NoViableModel { entity: String, attempted: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter '{param}' = '{value}': {reason}")]
    InvalidParameter {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForecastError {
    /// Stable numeric code for the error kind.
    pub fn to_code(&self) -> i32 {
        match self {
            ForecastError::InvalidSeries { .. } => 1,
            ForecastError::NoViableModel { .. } => 2,
            ForecastError::InvalidInput(_) => 3,
            ForecastError::InvalidParameter { .. } => 4,
            ForecastError::ComputationError(_) => 5,
            ForecastError::Dataset(_) => 6,
            ForecastError::Io(_) => 7,
        }
    }

    /// The entity an error is scoped to, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            ForecastError::InvalidSeries { entity, .. }
            | ForecastError::NoViableModel { entity, .. } => Some(entity),
            _ => None,
        }
    }

    pub(crate) fn invalid_parameter(
        param: &str,
        value: impl ToString,
        reason: &str,
    ) -> ForecastError {
        ForecastError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Dataset(err.to_string())
    }
}
