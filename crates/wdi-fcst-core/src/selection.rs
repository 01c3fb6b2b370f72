//! Brute-force model search over a small candidate grid.
//!
//! Every candidate is fit independently. A candidate whose fit returns an
//! error, a non-finite AIC, or panics inside the fitting library is skipped;
//! only exhausting the grid without a single success is an error.
//!
//! Ranking uses strict `<` on AIC, so when two candidates tie exactly the one
//! enumerated first wins. The outcome is deterministic for a given series and
//! grid.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{ForecastError, Result};
use crate::fit::{FittedModel, LibraryFitter, ModelFitter};
use crate::model::{candidate_grid, ModelCandidate, ModelFamily};
use crate::series::TimeSeries;

/// Search options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Wall-clock budget for the whole search. `None` means unbounded.
    pub budget: Option<Duration>,
}

impl SearchOptions {
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget: Some(budget),
        }
    }
}

/// Outcome of a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    /// Winning candidate
    pub candidate: ModelCandidate,
    /// Its AIC
    pub aic: f64,
    /// Candidates whose fit was attempted
    pub attempted: usize,
    /// Candidates that fit successfully
    pub succeeded: usize,
}

/// Choose the best candidate of `family` for `series` with the library fitter.
pub fn select_model(series: &TimeSeries, family: ModelFamily) -> Result<ModelCandidate> {
    search(&LibraryFitter, series, family, &SearchOptions::default()).map(|s| s.candidate)
}

/// Run the candidate search with an explicit fitter and options.
pub fn search<F: ModelFitter>(
    fitter: &F,
    series: &TimeSeries,
    family: ModelFamily,
    options: &SearchOptions,
) -> Result<Selection> {
    let needed = family.min_observations();
    if series.len() < needed {
        return Err(ForecastError::InvalidSeries {
            entity: series.entity_id().to_string(),
            rows: series.len(),
            needed,
            got: series.len(),
        });
    }

    let grid = candidate_grid(family);
    let deadline = options.budget.map(|b| Instant::now() + b);
    let mut best: Option<(ModelCandidate, f64)> = None;
    let mut attempted = 0;
    let mut succeeded = 0;

    for candidate in grid.iter().copied() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!(
                entity = series.entity_id(),
                attempted,
                remaining = grid.len() - attempted,
                "search budget exhausted, skipping remaining candidates"
            );
            break;
        }

        attempted += 1;
        let aic = match fit_isolated(fitter, series, candidate) {
            Ok(fitted) => fitted.aic(),
            Err(e) => {
                tracing::debug!(entity = series.entity_id(), %candidate, error = %e, "candidate skipped");
                continue;
            }
        };
        if !aic.is_finite() {
            tracing::debug!(entity = series.entity_id(), %candidate, aic, "candidate skipped: non-finite AIC");
            continue;
        }

        succeeded += 1;
        tracing::trace!(entity = series.entity_id(), %candidate, aic, "candidate fit");
        match best {
            Some((_, best_aic)) if aic >= best_aic => {}
            _ => best = Some((candidate, aic)),
        }
    }

    match best {
        Some((candidate, aic)) => {
            tracing::info!(
                entity = series.entity_id(),
                %candidate,
                aic,
                attempted,
                succeeded,
                "selected model"
            );
            Ok(Selection {
                candidate,
                aic,
                attempted,
                succeeded,
            })
        }
        None => Err(ForecastError::NoViableModel {
            entity: series.entity_id().to_string(),
            attempted,
        }),
    }
}

/// Fit one candidate, converting a panic inside the fitter into an error.
pub(crate) fn fit_isolated<F: ModelFitter>(
    fitter: &F,
    series: &TimeSeries,
    candidate: ModelCandidate,
) -> Result<FittedModel> {
    match catch_unwind(AssertUnwindSafe(|| fitter.fit(series, candidate))) {
        Ok(result) => result,
        Err(_) => Err(ForecastError::ComputationError(format!(
            "panic while fitting {}",
            candidate
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::Projection;
    use crate::series::Observation;
    use std::cell::Cell;

    struct Flat;

    impl Projection for Flat {
        fn project(&self, horizon: usize) -> Result<Vec<f64>> {
            Ok(vec![0.0; horizon])
        }
    }

    /// Fitter that scores candidates with a fixed function of the order.
    struct Scored<S: Fn(ModelCandidate) -> Option<f64>> {
        score: S,
        calls: Cell<usize>,
    }

    impl<S: Fn(ModelCandidate) -> Option<f64>> Scored<S> {
        fn new(score: S) -> Self {
            Self {
                score,
                calls: Cell::new(0),
            }
        }
    }

    impl<S: Fn(ModelCandidate) -> Option<f64>> ModelFitter for Scored<S> {
        fn fit(&self, _series: &TimeSeries, candidate: ModelCandidate) -> Result<FittedModel> {
            self.calls.set(self.calls.get() + 1);
            match (self.score)(candidate) {
                Some(aic) => Ok(FittedModel::new(
                    candidate,
                    aic,
                    vec![],
                    vec![],
                    Box::new(Flat),
                )),
                None => Err(ForecastError::ComputationError("did not converge".into())),
            }
        }
    }

    struct Panicking;

    impl ModelFitter for Panicking {
        fn fit(&self, _series: &TimeSeries, _candidate: ModelCandidate) -> Result<FittedModel> {
            panic!("singular matrix");
        }
    }

    fn series(n: usize) -> TimeSeries {
        TimeSeries::new(
            "Kenya",
            (0..n)
                .map(|i| Observation {
                    period: 2000 + i as i32,
                    value: 10.0 + i as f64,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_lowest_aic_wins() {
        let fitter = Scored::new(|c| match c {
            ModelCandidate::Arima { p: 1, d: 1, q: 0 } => Some(-5.0),
            _ => Some(10.0),
        });
        let sel = search(
            &fitter,
            &series(10),
            ModelFamily::Autoregressive,
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(sel.candidate, ModelCandidate::Arima { p: 1, d: 1, q: 0 });
        assert_eq!(sel.aic, -5.0);
        assert_eq!(sel.attempted, 27);
        assert_eq!(sel.succeeded, 27);
    }

    #[test]
    fn test_exact_tie_keeps_first_enumerated() {
        let fitter = Scored::new(|c| match c {
            ModelCandidate::Arima { p: 0, d: 2, q: 1 } | ModelCandidate::Arima { p: 2, d: 0, q: 0 } => {
                Some(1.0)
            }
            _ => Some(2.0),
        });
        let sel = search(
            &fitter,
            &series(10),
            ModelFamily::Autoregressive,
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(sel.candidate, ModelCandidate::Arima { p: 0, d: 2, q: 1 });
    }

    #[test]
    fn test_failures_are_skipped() {
        // Only one candidate out of 27 fits; partial degradation is accepted.
        let fitter = Scored::new(|c| match c {
            ModelCandidate::Arima { p: 2, d: 2, q: 2 } => Some(3.0),
            _ => None,
        });
        let sel = search(
            &fitter,
            &series(10),
            ModelFamily::Autoregressive,
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(sel.candidate, ModelCandidate::Arima { p: 2, d: 2, q: 2 });
        assert_eq!(sel.succeeded, 1);
    }

    #[test]
    fn test_non_finite_aic_is_skipped() {
        let fitter = Scored::new(|c| match c {
            ModelCandidate::Arima { p: 0, d: 0, q: 0 } => Some(f64::NEG_INFINITY),
            ModelCandidate::Arima { p: 0, d: 0, q: 1 } => Some(f64::NAN),
            _ => Some(7.0),
        });
        let sel = search(
            &fitter,
            &series(10),
            ModelFamily::Autoregressive,
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(sel.candidate, ModelCandidate::Arima { p: 0, d: 0, q: 2 });
        assert_eq!(sel.succeeded, 25);
    }

    #[test]
    fn test_all_failures_is_no_viable_model() {
        let fitter = Scored::new(|_| None);
        let err = search(
            &fitter,
            &series(10),
            ModelFamily::Autoregressive,
            &SearchOptions::default(),
        )
        .unwrap_err();
        match err {
            ForecastError::NoViableModel { entity, attempted } => {
                assert_eq!(entity, "Kenya");
                assert_eq!(attempted, 27);
            }
            other => panic!("Expected NoViableModel, got {:?}", other),
        }
    }

    #[test]
    fn test_panicking_fitter_is_contained() {
        let err = search(
            &Panicking,
            &series(10),
            ModelFamily::Autoregressive,
            &SearchOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::NoViableModel { attempted: 27, .. }));
    }

    #[test]
    fn test_zero_budget_attempts_nothing() {
        let fitter = Scored::new(|_| Some(1.0));
        let err = search(
            &fitter,
            &series(10),
            ModelFamily::Autoregressive,
            &SearchOptions::with_budget(Duration::ZERO),
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::NoViableModel { attempted: 0, .. }));
        assert_eq!(fitter.calls.get(), 0);
    }

    #[test]
    fn test_polynomial_needs_degree_plus_one_points() {
        let fitter = Scored::new(|_| Some(1.0));
        let err = search(
            &fitter,
            &series(2),
            ModelFamily::Polynomial { degree: 2 },
            &SearchOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidSeries {
                needed: 3,
                got: 2,
                ..
            }
        ));
        assert_eq!(fitter.calls.get(), 0);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let s = series(12);
        let fitter = Scored::new(|c| Some(c.n_params() as f64 * 1.5));
        let a = search(&fitter, &s, ModelFamily::Autoregressive, &SearchOptions::default()).unwrap();
        let b = search(&fitter, &s, ModelFamily::Autoregressive, &SearchOptions::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.candidate, ModelCandidate::Arima { p: 0, d: 0, q: 0 });
    }
}
