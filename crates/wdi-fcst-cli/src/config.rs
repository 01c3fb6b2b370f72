//! Service configuration: defaults, then an optional file, then `WDI_FCST_*`
//! environment variables. Command-line flags are applied on top by the caller.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use wdi_fcst_core::{ForecastOptions, SearchOptions, DEFAULT_HORIZON, DEFAULT_POLYNOMIAL_DEGREE};

/// Environment variable prefix, e.g. `WDI_FCST_HORIZON=5`.
pub const ENV_PREFIX: &str = "WDI_FCST";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Periods to project
    pub horizon: usize,
    /// Prediction-interval confidence level
    pub confidence_level: f64,
    /// Wall-clock budget for the order search in milliseconds; 0 disables it
    pub search_budget_ms: u64,
    /// Degree used by the polynomial family
    pub polynomial_degree: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            confidence_level: 0.95,
            search_budget_ms: 5_000,
            polynomial_degree: DEFAULT_POLYNOMIAL_DEGREE,
        }
    }
}

impl ServiceConfig {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .context("failed to read configuration")?;
        let cfg: ServiceConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        tracing::debug!(?cfg, "configuration loaded");
        Ok(cfg)
    }

    pub fn forecast_options(&self) -> ForecastOptions {
        ForecastOptions {
            horizon: self.horizon,
            confidence_level: self.confidence_level,
            search: SearchOptions {
                budget: (self.search_budget_ms > 0)
                    .then(|| Duration::from_millis(self.search_budget_ms)),
            },
        }
    }
}
