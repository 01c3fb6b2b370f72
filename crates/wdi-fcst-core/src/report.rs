//! Presentation-neutral views of forecast outcomes.

use std::fmt::Write;

use serde::Serialize;

use crate::error::ForecastError;
use crate::forecast::ForecastResult;

/// Which part of a combined chart a point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Historical,
    Forecast,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub period: i32,
    pub value: f64,
    pub segment: Segment,
}

/// History followed by projection, ready for a combined line chart.
pub fn chart_points(result: &ForecastResult) -> Vec<ChartPoint> {
    let historical = result.history.iter().map(|o| ChartPoint {
        period: o.period,
        value: o.value,
        segment: Segment::Historical,
    });
    let projected = result.projections().map(|(period, value)| ChartPoint {
        period,
        value,
        segment: Segment::Forecast,
    });
    historical.chain(projected).collect()
}

/// Markdown table of projected `(period, value)` pairs.
pub fn markdown_table(result: &ForecastResult, metric_label: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "| Year | {} |", metric_label);
    let _ = writeln!(out, "|-----:|{}:|", "-".repeat(metric_label.len() + 1));
    for (period, value) in result.projections() {
        let _ = writeln!(out, "| {} | {:.2} |", period, value);
    }
    out
}

/// One-line summary of the chosen model and its quality.
pub fn summary(result: &ForecastResult) -> String {
    format!(
        "{} forecast for {}: {} periods ({}-{}), AIC {:.2}, in-sample RMSE {:.2}",
        result.chosen_model,
        result.entity_id,
        result.horizon(),
        result.projected_periods.first().copied().unwrap_or_default(),
        result.projected_periods.last().copied().unwrap_or_default(),
        result.quality.aic,
        result.quality.rmse,
    )
}

/// Human-readable message for a failed forecast request.
pub fn user_message(err: &ForecastError) -> String {
    match err {
        ForecastError::InvalidSeries { entity, rows: 0, .. } => {
            format!("No data available for {}.", entity)
        }
        ForecastError::InvalidSeries { entity, got: 0, .. } => format!(
            "No valid data available for {} after filtering out zero values.",
            entity
        ),
        ForecastError::InvalidSeries {
            entity, needed, got, ..
        } => format!(
            "Not enough data to forecast {}: {} usable observation(s) after removing zero and missing values, at least {} needed.",
            entity, got, needed
        ),
        ForecastError::NoViableModel { entity, .. } => format!(
            "No forecast available for {}: no model could be fit to its history. The data may be too short or too irregular.",
            entity
        ),
        other => format!(
            "An error occurred while fitting the model or forecasting: {}",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::FitQuality;
    use crate::model::ModelCandidate;
    use crate::series::Observation;

    fn result() -> ForecastResult {
        ForecastResult {
            entity_id: "Chile".into(),
            chosen_model: ModelCandidate::Arima { p: 1, d: 1, q: 0 },
            projected_periods: vec![2019, 2020],
            projected_values: vec![140.0, 150.5],
            lower: vec![130.0, 135.0],
            upper: vec![150.0, 166.0],
            confidence_level: 0.95,
            quality: FitQuality {
                aic: 12.5,
                rmse: 1.0,
                mae: 0.8,
            },
            history: vec![
                Observation {
                    period: 2017,
                    value: 120.0,
                },
                Observation {
                    period: 2018,
                    value: 130.0,
                },
            ],
        }
    }

    #[test]
    fn test_markdown_table_has_row_per_projection() {
        let table = markdown_table(&result(), "GDP per capita");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| Year | GDP per capita |");
        assert_eq!(lines[2], "| 2019 | 140.00 |");
        assert_eq!(lines[3], "| 2020 | 150.50 |");
    }

    #[test]
    fn test_chart_points_order() {
        let points = chart_points(&result());
        assert_eq!(points.len(), 4);
        assert_eq!(points[1].segment, Segment::Historical);
        assert_eq!(points[2].segment, Segment::Forecast);
        assert_eq!(points[2].period, 2019);
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            summary(&result()),
            "ARIMA(1,1,0) forecast for Chile: 2 periods (2019-2020), AIC 12.50, in-sample RMSE 1.00"
        );
    }

    #[test]
    fn test_user_messages_name_entity() {
        let msg = user_message(&ForecastError::NoViableModel {
            entity: "Chad".into(),
            attempted: 27,
        });
        assert!(msg.contains("Chad"));
        assert!(msg.contains("irregular"));

        let msg = user_message(&ForecastError::InvalidSeries {
            entity: "Chad".into(),
            rows: 3,
            needed: 2,
            got: 1,
        });
        assert!(msg.contains("Chad"));
        assert!(msg.contains("1 usable"));

        let msg = user_message(&ForecastError::InvalidSeries {
            entity: "Atlantis".into(),
            rows: 0,
            needed: 2,
            got: 0,
        });
        assert_eq!(msg, "No data available for Atlantis.");

        let msg = user_message(&ForecastError::InvalidSeries {
            entity: "Tuvalu".into(),
            rows: 4,
            needed: 2,
            got: 0,
        });
        assert_eq!(
            msg,
            "No valid data available for Tuvalu after filtering out zero values."
        );
    }
}
