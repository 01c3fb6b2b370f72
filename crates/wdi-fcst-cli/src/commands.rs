use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};
use wdi_fcst_core::{
    chart_points, markdown_table, summary, user_message, DatasetDescriptor, ForecastError,
    ForecastOptions, ForecastService, ModelFamily, PeriodRange, ReferenceTable,
};

use crate::cli::{DataArgs, Family, OutputFormat, SeriesArgs};
use crate::config::ServiceConfig;

pub struct ForecastArgs {
    pub data: DataArgs,
    pub series: SeriesArgs,
    pub horizon: Option<usize>,
    pub format: OutputFormat,
}

fn load_table(args: &DataArgs) -> Result<Arc<ReferenceTable>> {
    let descriptor = DatasetDescriptor::preset(args.dataset.preset_name())?;
    let table = ReferenceTable::from_csv_path(&args.data, descriptor)
        .with_context(|| format!("failed to load {}", args.data.display()))?;
    Ok(Arc::new(table))
}

/// Configured options with the `--horizon` override applied, rejected when invalid.
fn forecast_options(config: &ServiceConfig, horizon: Option<usize>) -> Result<ForecastOptions> {
    let mut options = config.forecast_options();
    if let Some(horizon) = horizon {
        options.horizon = horizon;
    }
    options.validate().context("invalid forecast settings")?;
    Ok(options)
}

/// An explicit `--family` wins; otherwise the dataset's own family is used.
fn model_family(
    config: &ServiceConfig,
    descriptor: &DatasetDescriptor,
    series: &SeriesArgs,
) -> ModelFamily {
    let polynomial = || ModelFamily::Polynomial {
        degree: series.degree.unwrap_or(config.polynomial_degree),
    };
    match series.family {
        Some(Family::Arima) => ModelFamily::Autoregressive,
        Some(Family::Polynomial) => polynomial(),
        None => match descriptor.default_family {
            ModelFamily::Polynomial { .. } => polynomial(),
            family => family,
        },
    }
}

/// `None` keeps the dataset's forecast window; a single flag narrows one side of it.
fn period_range(table: &ReferenceTable, series: &SeriesArgs) -> Result<Option<PeriodRange>> {
    if series.from.is_none() && series.to.is_none() {
        return Ok(None);
    }
    let window = table.descriptor().forecast_range;
    let range = PeriodRange::new(series.from.or(window.start), series.to.or(window.end));
    range.validate().context("invalid --from/--to")?;
    Ok(Some(range))
}

/// Failures that describe the entity's data rather than the request.
fn is_degenerate(err: &ForecastError) -> bool {
    matches!(
        err,
        ForecastError::InvalidSeries { .. }
            | ForecastError::NoViableModel { .. }
            | ForecastError::ComputationError(_)
    )
}

pub fn entities(data: &DataArgs) -> Result<()> {
    let table = load_table(data)?;
    let names = table.entities(&table.descriptor().forecast_range);
    info!(count = names.len(), "listing entities");
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn forecast(config: &ServiceConfig, args: &ForecastArgs) -> Result<()> {
    let options = forecast_options(config, args.horizon)?;
    let table = load_table(&args.data)?;
    let range = period_range(&table, &args.series)?;
    let family = model_family(config, table.descriptor(), &args.series);
    let metric_label = table.descriptor().metric_label.clone();
    let service = ForecastService::new(table, options);

    match service.forecast_entity(&args.series.entity, range, family) {
        Ok(result) => match args.format {
            OutputFormat::Markdown => {
                println!("{}\n", summary(&result));
                print!("{}", markdown_table(&result, &metric_label));
            }
            OutputFormat::Json => {
                let body = json!({
                    "forecast": result,
                    "chart": chart_points(&result),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
        },
        Err(err) if is_degenerate(&err) => {
            warn!(entity = %args.series.entity, code = err.to_code(), error = %err, "forecast unavailable");
            let message = user_message(&err);
            match args.format {
                OutputFormat::Markdown => println!("{}", message),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "entity_id": args.series.entity,
                        "error": message,
                        "code": err.to_code(),
                    }))?
                ),
            }
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to forecast {}", args.series.entity))
        }
    }
    Ok(())
}

pub fn evaluate(
    config: &ServiceConfig,
    data: &DataArgs,
    series: &SeriesArgs,
    holdout: usize,
) -> Result<()> {
    let options = forecast_options(config, None)?;
    let table = load_table(data)?;
    let range = period_range(&table, series)?;
    let family = model_family(config, table.descriptor(), series);
    let service = ForecastService::new(table, options);

    match service.evaluate_entity(&series.entity, range, family, holdout) {
        Ok(eval) => {
            println!(
                "{} on {} held-out period(s) for {}: MAE {:.3}, RMSE {:.3}{}, {:.0}% inside the {:.0}% interval",
                eval.chosen_model,
                eval.holdout_periods.len(),
                series.entity,
                eval.mae,
                eval.rmse,
                eval.mape
                    .map(|m| format!(", MAPE {:.2}%", m))
                    .unwrap_or_default(),
                eval.coverage * 100.0,
                eval.confidence_level * 100.0,
            );
        }
        Err(err) if is_degenerate(&err) => {
            warn!(entity = %series.entity, error = %err, "evaluation unavailable");
            println!("{}", user_message(&err));
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to evaluate {}", series.entity))
        }
    }
    Ok(())
}
