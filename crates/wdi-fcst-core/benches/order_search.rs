//! Timing of the 27-candidate ARIMA order search on annual-length series.
//!
//! Run with: cargo bench --bench order_search

use std::time::{Duration, Instant};

use wdi_fcst_core::{
    run, search, LibraryFitter, ModelFamily, Observation, PeriodRange, Row, SearchOptions,
    TimeSeries,
};

fn generate_annual_series(n: usize, seed: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let growth = 1000.0 * (1.0 + 0.02 * seed as f64).powf(i as f64 / 10.0);
            let cycle = 50.0 * (i as f64 * 0.7).sin();
            let noise = ((i * 17 + seed * 7) % 13) as f64 - 6.0; // deterministic "noise"
            growth + cycle + noise
        })
        .collect()
}

fn benchmark_fn<F, R>(name: &str, iterations: usize, mut f: F) -> Duration
where
    F: FnMut() -> R,
{
    // Warmup
    let _ = f();

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = std::hint::black_box(f());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "{}: total={:?}, per_iter={:?}, iters={}",
        name, elapsed, per_iter, iterations
    );
    elapsed
}

fn main() {
    println!("=== ARIMA Order Search Benchmark ===\n");

    // 1950-2018 is 69 annual points; 12 is the income map's window.
    for &n in &[12, 30, 69] {
        let values = generate_annual_series(n, 1);
        let series = TimeSeries::new(
            "bench",
            values
                .iter()
                .enumerate()
                .map(|(i, &value)| Observation {
                    period: 1950 + i as i32,
                    value,
                })
                .collect(),
        )
        .expect("generated series is valid");

        benchmark_fn(&format!("search(arima, n={})", n), 10, || {
            search(
                &LibraryFitter,
                &series,
                ModelFamily::Autoregressive,
                &SearchOptions::default(),
            )
        });
    }

    println!("\n--- Many entities ---\n");

    let rows: Vec<Row> = (0..50)
        .flat_map(|seed| {
            generate_annual_series(69, seed)
                .into_iter()
                .enumerate()
                .map(move |(i, v)| Row::new(format!("country-{}", seed), 1950 + i as i32, Some(v)))
        })
        .collect();

    benchmark_fn("run(arima) x50 entities", 1, || {
        (0..50)
            .map(|seed| {
                run(
                    &rows,
                    &format!("country-{}", seed),
                    &PeriodRange::between(1950, 2018),
                    ModelFamily::Autoregressive,
                    10,
                )
            })
            .collect::<Vec<_>>()
    });
}
