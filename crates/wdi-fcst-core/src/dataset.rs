//! Reference tables of per-country indicator rows.
//!
//! A [`ReferenceTable`] is loaded once per process from a CSV file and is
//! read-only afterwards. The [`DatasetDescriptor`] names the columns that hold
//! the entity, the period and the metric value, so the same loader serves every
//! indicator (GDP per capita, income inequality, salary, deprivation index).

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::model::{ModelFamily, DEFAULT_POLYNOMIAL_DEGREE};
use crate::series::PeriodRange;

/// One raw observation as it appears in the reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Country or region name/code
    pub entity: String,
    /// Period ordinal (calendar year)
    pub period: i32,
    /// Metric value; `None` when the cell is blank
    pub value: Option<f64>,
}

impl Row {
    pub fn new(entity: impl Into<String>, period: i32, value: Option<f64>) -> Self {
        Self {
            entity: entity.into(),
            period,
            value,
        }
    }
}

/// Describes where an indicator lives inside a CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Short identifier
    pub name: String,
    /// Column holding the entity identifier
    pub entity_column: String,
    /// Column holding the period
    pub period_column: String,
    /// Column holding the metric value
    pub value_column: String,
    /// Human-readable metric label used in tables and charts
    pub metric_label: String,
    /// Period window the indicator is normally shown for
    pub default_range: PeriodRange,
    /// Period window forecasts are fit on and entities are offered from
    pub forecast_range: PeriodRange,
    /// Model family used when the caller does not pick one
    pub default_family: ModelFamily,
}

impl DatasetDescriptor {
    /// GDP per capita, 1950 to 2018, forecast with the ARIMA order search.
    pub fn gdp_per_capita() -> Self {
        Self {
            name: "gdp".to_string(),
            entity_column: "Country".to_string(),
            period_column: "Year".to_string(),
            value_column: "GDP per capita".to_string(),
            metric_label: "GDP per capita".to_string(),
            default_range: PeriodRange::between(1950, 2018),
            forecast_range: PeriodRange::between(1950, 2018),
            default_family: ModelFamily::Autoregressive,
        }
    }

    /// Income inequality. Maps show 2010 to 2021; forecasts use the full
    /// history with a quadratic trend.
    pub fn income_inequality() -> Self {
        Self {
            name: "income".to_string(),
            entity_column: "Country".to_string(),
            period_column: "Year".to_string(),
            value_column: "Value".to_string(),
            metric_label: "Income Value".to_string(),
            default_range: PeriodRange::between(2010, 2021),
            forecast_range: PeriodRange::all(),
            default_family: ModelFamily::Polynomial {
                degree: DEFAULT_POLYNOMIAL_DEGREE,
            },
        }
    }

    /// Median salary.
    pub fn median_salary() -> Self {
        Self {
            name: "salary".to_string(),
            entity_column: "Country".to_string(),
            period_column: "Year".to_string(),
            value_column: "Median Salary".to_string(),
            metric_label: "Median Salary".to_string(),
            default_range: PeriodRange::all(),
            forecast_range: PeriodRange::all(),
            default_family: ModelFamily::Autoregressive,
        }
    }

    /// Multidimensional poverty (deprivation) index.
    pub fn deprivation_index() -> Self {
        Self {
            name: "mpi".to_string(),
            entity_column: "Country".to_string(),
            period_column: "Year".to_string(),
            value_column: "MPI".to_string(),
            metric_label: "MPI".to_string(),
            default_range: PeriodRange::all(),
            forecast_range: PeriodRange::all(),
            default_family: ModelFamily::Autoregressive,
        }
    }

    /// Look up a preset by its short name.
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "gdp" | "gdp_per_capita" => Ok(Self::gdp_per_capita()),
            "income" | "income_inequality" => Ok(Self::income_inequality()),
            "salary" | "median_salary" => Ok(Self::median_salary()),
            "mpi" | "deprivation_index" => Ok(Self::deprivation_index()),
            _ => Err(ForecastError::invalid_parameter(
                "dataset",
                name,
                "expected one of gdp, income, salary, mpi",
            )),
        }
    }
}

/// Read-only handle over a loaded reference table.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    descriptor: DatasetDescriptor,
    rows: Vec<Row>,
}

impl ReferenceTable {
    /// Wrap rows that are already in memory.
    pub fn from_rows(descriptor: DatasetDescriptor, rows: Vec<Row>) -> Self {
        Self { descriptor, rows }
    }

    /// Load a table from a CSV file on disk.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, descriptor: DatasetDescriptor) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let table = Self::from_csv_reader(file, descriptor)?;
        tracing::info!(
            path = %path.as_ref().display(),
            dataset = %table.descriptor.name,
            rows = table.rows.len(),
            "loaded reference table"
        );
        Ok(table)
    }

    /// Load a table from any CSV source with a header row.
    pub fn from_csv_reader<R: Read>(reader: R, descriptor: DatasetDescriptor) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                ForecastError::Dataset(format!(
                    "column '{}' not found in dataset '{}'",
                    name, descriptor.name
                ))
            })
        };
        let entity_idx = column(&descriptor.entity_column)?;
        let period_idx = column(&descriptor.period_column)?;
        let value_idx = column(&descriptor.value_column)?;

        let mut rows = Vec::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = i + 2;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let period = parse_period(field(period_idx)).ok_or_else(|| {
                ForecastError::Dataset(format!(
                    "line {}: invalid period '{}'",
                    line,
                    field(period_idx)
                ))
            })?;

            let raw_value = field(value_idx);
            let value = if raw_value.is_empty() {
                None
            } else {
                Some(raw_value.replace(',', "").parse::<f64>().map_err(|_| {
                    ForecastError::Dataset(format!("line {}: invalid value '{}'", line, raw_value))
                })?)
            };

            rows.push(Row::new(field(entity_idx), period, value));
        }

        Ok(Self { descriptor, rows })
    }

    pub fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unique entities in first-seen order, restricted to `range`.
    pub fn entities(&self, range: &PeriodRange) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| range.contains(r.period))
            .filter(|r| seen.insert(r.entity.as_str()))
            .map(|r| r.entity.clone())
            .collect()
    }

    /// Smallest and largest period present, if any.
    pub fn period_bounds(&self) -> Option<(i32, i32)> {
        let min = self.rows.iter().map(|r| r.period).min()?;
        let max = self.rows.iter().map(|r| r.period).max()?;
        Some((min, max))
    }
}

/// Accepts "2018" and the float spelling "2018.0" some exports produce.
fn parse_period(raw: &str) -> Option<i32> {
    if let Ok(p) = raw.parse::<i32>() {
        return Some(p);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}
