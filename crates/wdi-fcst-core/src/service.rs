//! Long-lived forecast service over a shared, read-only reference table.

use std::sync::Arc;

use crate::dataset::ReferenceTable;
use crate::error::Result;
use crate::fit::{LibraryFitter, ModelFitter};
use crate::forecast::{
    evaluate_holdout, run_with, ForecastOptions, ForecastResult, HoldoutEvaluation,
};
use crate::model::ModelFamily;
use crate::series::{prepare, PeriodRange};

/// Forecasts entities of one reference table.
///
/// Holds no mutable state; clones share the same table.
#[derive(Debug, Clone)]
pub struct ForecastService<F = LibraryFitter> {
    table: Arc<ReferenceTable>,
    fitter: F,
    options: ForecastOptions,
}

impl ForecastService<LibraryFitter> {
    pub fn new(table: Arc<ReferenceTable>, options: ForecastOptions) -> Self {
        Self::with_fitter(table, LibraryFitter, options)
    }
}

impl<F: ModelFitter> ForecastService<F> {
    pub fn with_fitter(table: Arc<ReferenceTable>, fitter: F, options: ForecastOptions) -> Self {
        Self {
            table,
            fitter,
            options,
        }
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    /// Entities offered for selection, restricted to the dataset's forecast window.
    pub fn entities(&self) -> Vec<String> {
        self.table.entities(&self.table.descriptor().forecast_range)
    }

    /// Forecast one entity over `range`, or the dataset's forecast window.
    pub fn forecast_entity(
        &self,
        entity_id: &str,
        range: Option<PeriodRange>,
        family: ModelFamily,
    ) -> Result<ForecastResult> {
        let range = range.unwrap_or(self.table.descriptor().forecast_range);
        run_with(
            &self.fitter,
            self.table.rows(),
            entity_id,
            &range,
            family,
            &self.options,
        )
    }

    /// Score `family` on the trailing `holdout` observations of one entity.
    pub fn evaluate_entity(
        &self,
        entity_id: &str,
        range: Option<PeriodRange>,
        family: ModelFamily,
        holdout: usize,
    ) -> Result<HoldoutEvaluation> {
        let range = range.unwrap_or(self.table.descriptor().forecast_range);
        let series = prepare(self.table.rows(), entity_id, &range)?;
        evaluate_holdout(&self.fitter, &series, family, holdout, &self.options)
    }
}
