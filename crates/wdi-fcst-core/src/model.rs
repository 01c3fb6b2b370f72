//! Model families and the candidate grids searched for each.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Largest value searched for each of `p`, `d` and `q`.
pub const MAX_ARIMA_ORDER: usize = 2;

/// Polynomial degree used when none is configured.
pub const DEFAULT_POLYNOMIAL_DEGREE: usize = 2;

/// Family of models a forecast is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "family")]
pub enum ModelFamily {
    /// ARIMA(p, d, q) with each order in `0..=MAX_ARIMA_ORDER`
    #[default]
    Autoregressive,
    /// Polynomial trend of a fixed degree, fit by least squares
    Polynomial { degree: usize },
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Autoregressive => "arima",
            ModelFamily::Polynomial { .. } => "polynomial",
        }
    }

    /// Fewest observations any candidate of this family can be fit to.
    pub fn min_observations(&self) -> usize {
        match self {
            ModelFamily::Autoregressive => crate::series::MIN_OBSERVATIONS,
            ModelFamily::Polynomial { degree } => degree + 1,
        }
    }
}

impl std::str::FromStr for ModelFamily {
    type Err = ForecastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arima" | "autoregressive" | "ar" => Ok(ModelFamily::Autoregressive),
            "polynomial" | "poly" | "linear" => Ok(ModelFamily::Polynomial {
                degree: DEFAULT_POLYNOMIAL_DEGREE,
            }),
            _ => Err(ForecastError::invalid_parameter(
                "family",
                s,
                "expected 'arima' or 'polynomial'",
            )),
        }
    }
}

/// A concrete model configuration considered during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum ModelCandidate {
    Arima { p: usize, d: usize, q: usize },
    Polynomial { degree: usize },
}

impl ModelCandidate {
    pub fn family(&self) -> ModelFamily {
        match *self {
            ModelCandidate::Arima { .. } => ModelFamily::Autoregressive,
            ModelCandidate::Polynomial { degree } => ModelFamily::Polynomial { degree },
        }
    }

    /// Number of estimated coefficients, excluding the noise variance.
    pub fn n_params(&self) -> usize {
        match *self {
            ModelCandidate::Arima { p, q, .. } => p + q + 1,
            ModelCandidate::Polynomial { degree } => degree + 1,
        }
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelCandidate::Arima { p, d, q } => write!(f, "ARIMA({},{},{})", p, d, q),
            ModelCandidate::Polynomial { degree } => write!(f, "Polynomial(degree={})", degree),
        }
    }
}

/// Enumerate the candidates searched for `family`, in tie-breaking order.
///
/// ARIMA orders are enumerated `p`-major, then `d`, then `q`.
pub fn candidate_grid(family: ModelFamily) -> Vec<ModelCandidate> {
    match family {
        ModelFamily::Autoregressive => {
            let mut grid = Vec::with_capacity((MAX_ARIMA_ORDER + 1).pow(3));
            for p in 0..=MAX_ARIMA_ORDER {
                for d in 0..=MAX_ARIMA_ORDER {
                    for q in 0..=MAX_ARIMA_ORDER {
                        grid.push(ModelCandidate::Arima { p, d, q });
                    }
                }
            }
            grid
        }
        ModelFamily::Polynomial { degree } => vec![ModelCandidate::Polynomial { degree }],
    }
}
