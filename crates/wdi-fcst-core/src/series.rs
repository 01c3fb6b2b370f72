//! Per-entity historical series and their preparation from raw rows.

use serde::{Deserialize, Serialize};

use crate::dataset::Row;
use crate::error::{ForecastError, Result};

/// Minimum number of usable observations `prepare` accepts.
pub const MIN_OBSERVATIONS: usize = 2;

/// Inclusive period window. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl PeriodRange {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    pub fn between(start: i32, end: i32) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// Unbounded on both sides.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, period: i32) -> bool {
        self.start.map_or(true, |s| period >= s) && self.end.map_or(true, |e| period <= e)
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ForecastError::invalid_parameter(
                    "period_range",
                    format!("{}..={}", start, end),
                    "start must not be after end",
                ));
            }
        }
        Ok(())
    }
}

/// A single `(period, value)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub period: i32,
    pub value: f64,
}

/// Ordered historical observations for one entity.
///
/// Periods are strictly increasing and every value is finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    entity_id: String,
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series from observations already in period order.
    pub fn new(entity_id: impl Into<String>, observations: Vec<Observation>) -> Result<Self> {
        let entity_id = entity_id.into();
        if observations.is_empty() {
            return Err(ForecastError::InvalidSeries {
                entity: entity_id,
                rows: 0,
                needed: 1,
                got: 0,
            });
        }
        if let Some(w) = observations.windows(2).find(|w| w[1].period <= w[0].period) {
            return Err(ForecastError::InvalidInput(format!(
                "periods for '{}' must be strictly increasing ({} followed by {})",
                entity_id, w[0].period, w[1].period
            )));
        }
        if let Some(o) = observations.iter().find(|o| !o.value.is_finite()) {
            return Err(ForecastError::InvalidInput(format!(
                "non-finite value for '{}' in period {}",
                entity_id, o.period
            )));
        }
        Ok(Self {
            entity_id,
            observations,
        })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn periods(&self) -> Vec<i32> {
        self.observations.iter().map(|o| o.period).collect()
    }

    pub fn first_period(&self) -> i32 {
        self.observations[0].period
    }

    pub fn last_period(&self) -> i32 {
        self.observations[self.observations.len() - 1].period
    }
}

fn is_usable(value: Option<f64>) -> bool {
    match value {
        Some(v) => v.is_finite() && v.abs() > f64::EPSILON,
        None => false,
    }
}

/// Filter raw rows to one entity and period window, dropping zero and missing
/// values, and sort by period.
///
/// Fails with [`ForecastError::InvalidSeries`] when fewer than
/// [`MIN_OBSERVATIONS`] usable observations remain.
pub fn prepare(raw_rows: &[Row], entity_id: &str, period_range: &PeriodRange) -> Result<TimeSeries> {
    period_range.validate()?;

    let in_window: Vec<&Row> = raw_rows
        .iter()
        .filter(|r| r.entity == entity_id && period_range.contains(r.period))
        .collect();

    let mut observations: Vec<Observation> = in_window
        .iter()
        .filter(|r| is_usable(r.value))
        .filter_map(|r| {
            r.value.map(|value| Observation {
                period: r.period,
                value,
            })
        })
        .collect();

    // Stable sort keeps input order among equal periods for the duplicate check
    observations.sort_by_key(|o| o.period);

    if let Some(w) = observations.windows(2).find(|w| w[0].period == w[1].period) {
        return Err(ForecastError::InvalidInput(format!(
            "'{}' has more than one value for period {}",
            entity_id, w[0].period
        )));
    }

    if observations.len() < MIN_OBSERVATIONS {
        return Err(ForecastError::InvalidSeries {
            entity: entity_id.to_string(),
            rows: in_window.len(),
            needed: MIN_OBSERVATIONS,
            got: observations.len(),
        });
    }

    tracing::debug!(
        entity = entity_id,
        observations = observations.len(),
        dropped = in_window.len() - observations.len(),
        "prepared series"
    );

    TimeSeries::new(entity_id, observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(entity: &str, data: &[(i32, Option<f64>)]) -> Vec<Row> {
        data.iter()
            .map(|&(p, v)| Row::new(entity, p, v))
            .collect()
    }

    #[test]
    fn test_prepare_drops_zero_values() {
        let raw = rows(
            "Chile",
            &[
                (2015, Some(100.0)),
                (2016, Some(110.0)),
                (2017, Some(0.0)),
                (2018, Some(130.0)),
            ],
        );
        let series = prepare(&raw, "Chile", &PeriodRange::all()).unwrap();
        assert_eq!(series.periods(), vec![2015, 2016, 2018]);
        assert_eq!(series.values(), vec![100.0, 110.0, 130.0]);
    }

    #[test]
    fn test_prepare_single_point_is_invalid() {
        let raw = rows("Chad", &[(2020, Some(50.0))]);
        let err = prepare(&raw, "Chad", &PeriodRange::all()).unwrap_err();
        match err {
            ForecastError::InvalidSeries {
                entity,
                rows,
                needed,
                got,
            } => {
                assert_eq!(rows, 1);
                assert_eq!(entity, "Chad");
                assert_eq!(needed, 2);
                assert_eq!(got, 1);
            }
            other => panic!("Expected InvalidSeries, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_filters_entity_range_and_missing() {
        let mut raw = rows(
            "Peru",
            &[
                (2019, Some(4.0)),
                (2010, Some(1.0)),
                (2012, None),
                (2011, Some(f64::NAN)),
                (2013, Some(3.0)),
                (2009, Some(9.0)),
            ],
        );
        raw.extend(rows("Chile", &[(2011, Some(7.0))]));

        let series = prepare(&raw, "Peru", &PeriodRange::between(2010, 2015)).unwrap();
        assert_eq!(series.entity_id(), "Peru");
        assert_eq!(series.periods(), vec![2010, 2013]);
        assert_eq!(series.first_period(), 2010);
        assert_eq!(series.last_period(), 2013);
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let raw = rows(
            "Peru",
            &[(2012, Some(2.0)), (2010, Some(1.0)), (2011, Some(0.0))],
        );
        let a = prepare(&raw, "Peru", &PeriodRange::all()).unwrap();
        let b = prepare(&raw, "Peru", &PeriodRange::all()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_prepare_rejects_duplicate_periods() {
        let raw = rows(
            "Peru",
            &[(2010, Some(1.0)), (2010, Some(2.0)), (2011, Some(3.0))],
        );
        let err = prepare(&raw, "Peru", &PeriodRange::all()).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn test_prepare_unknown_entity() {
        let raw = rows("Peru", &[(2010, Some(1.0)), (2011, Some(3.0))]);
        let err = prepare(&raw, "Atlantis", &PeriodRange::all()).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidSeries { rows: 0, got: 0, .. }
        ));
    }

    #[test]
    fn test_prepare_all_zero_values_counts_rows() {
        let raw = rows(
            "Peru",
            &[(2010, Some(0.0)), (2011, Some(0.0)), (2012, None)],
        );
        let err = prepare(&raw, "Peru", &PeriodRange::all()).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidSeries { rows: 3, got: 0, .. }
        ));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let err = prepare(&[], "Peru", &PeriodRange::between(2020, 2010)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter { .. }));
    }

    #[test]
    fn test_time_series_requires_increasing_periods() {
        let obs = vec![
            Observation {
                period: 2001,
                value: 1.0,
            },
            Observation {
                period: 2000,
                value: 2.0,
            },
        ];
        assert!(TimeSeries::new("x", obs).is_err());
        assert!(TimeSeries::new("x", vec![]).is_err());
    }
}
