use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{entities, evaluate, forecast, ForecastArgs};
use crate::config::ServiceConfig;

#[derive(Parser)]
#[command(name = "wdi-fcst")]
#[command(about = "Forecast world development indicators per country")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "WDI_FCST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dataset {
    Gdp,
    Income,
    Salary,
    Mpi,
}

impl Dataset {
    pub fn preset_name(self) -> &'static str {
        match self {
            Dataset::Gdp => "gdp",
            Dataset::Income => "income",
            Dataset::Salary => "salary",
            Dataset::Mpi => "mpi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Family {
    Arima,
    Polynomial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DataArgs {
    /// CSV file holding the reference table
    #[arg(short, long)]
    pub data: PathBuf,

    /// Which indicator the file holds
    #[arg(long, value_enum, default_value = "gdp")]
    pub dataset: Dataset,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SeriesArgs {
    /// Country to forecast
    #[arg(short, long)]
    pub entity: String,

    /// First year to use (defaults to the dataset's forecast window)
    #[arg(long)]
    pub from: Option<i32>,

    /// Last year to use (defaults to the dataset's forecast window)
    #[arg(long)]
    pub to: Option<i32>,

    /// Model family (defaults to the dataset's own: ARIMA, or polynomial for income)
    #[arg(long, value_enum)]
    pub family: Option<Family>,

    /// Polynomial degree (overrides configuration)
    #[arg(long)]
    pub degree: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the countries available in a dataset
    Entities {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Forecast one country
    Forecast {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        series: SeriesArgs,
        /// Periods to project (overrides configuration)
        #[arg(long)]
        horizon: Option<usize>,
        #[arg(long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },
    /// Score a model family on the last observations of one country
    Evaluate {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        series: SeriesArgs,
        /// Observations to hold out
        #[arg(long, default_value_t = 5)]
        holdout: usize,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = ServiceConfig::load(self.config.as_deref())?;
        match self.command {
            Commands::Entities { data } => entities(&data),
            Commands::Forecast {
                data,
                series,
                horizon,
                format,
            } => forecast(
                &config,
                &ForecastArgs {
                    data,
                    series,
                    horizon,
                    format,
                },
            ),
            Commands::Evaluate {
                data,
                series,
                holdout,
            } => evaluate(&config, &data, &series, holdout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_forecast() {
        let cli = Cli::try_parse_from([
            "wdi-fcst", "forecast", "--data", "gdp.csv", "--entity", "Chile", "--family",
            "polynomial", "--degree", "3", "--horizon", "5", "--format", "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Forecast {
                data,
                series,
                horizon,
                format,
            } => {
                assert_eq!(data.dataset, Dataset::Gdp);
                assert_eq!(series.entity, "Chile");
                assert_eq!(series.family, Some(Family::Polynomial));
                assert_eq!(series.degree, Some(3));
                assert_eq!(horizon, Some(5));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("Expected forecast command"),
        }
    }

    #[test]
    fn test_family_is_optional() {
        let cli = Cli::try_parse_from([
            "wdi-fcst", "forecast", "--data", "income.csv", "--dataset", "income", "--entity",
            "Peru",
        ])
        .unwrap();
        match cli.command {
            Commands::Forecast { data, series, .. } => {
                assert_eq!(data.dataset, Dataset::Income);
                assert_eq!(series.family, None);
            }
            _ => panic!("Expected forecast command"),
        }
    }
}
