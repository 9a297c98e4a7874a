//! Criterion benchmarks for the screening hot paths.
//!
//! Benchmarks:
//! 1. Indicator builder over a multi-instrument table
//! 2. Typed backtest replay (window → indicators → per-day predicate)
//! 3. Frame-level snapshot screen including table validation

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use resonance_core::{
    backtest_rows, build_indicators, screen, BacktestWindow, Observation, ResonanceParams,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_rows(instruments: usize, days: usize) -> Vec<Observation> {
    let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut rows = Vec::with_capacity(instruments * days);
    for d in 0..days {
        for k in 0..instruments {
            let phase = k as f64 * 0.37;
            let close = 100.0 + ((d as f64 * 0.1) + phase).sin() * 10.0 + d as f64 * 0.05;
            let volume = 1_000_000.0 + ((d * 7 + k * 13) % 500) as f64 * 1_000.0;
            rows.push(Observation::new(
                format!("{:06}", k),
                Some(base_date + Duration::days(d as i64)),
                close,
                volume,
            ));
        }
    }
    rows
}

fn to_frame(rows: &[Observation]) -> DataFrame {
    df!(
        "code" => rows.iter().map(|r| r.code.as_str()).collect::<Vec<_>>(),
        "close" => rows.iter().map(|r| r.close).collect::<Vec<_>>(),
        "volume" => rows.iter().map(|r| r.volume).collect::<Vec<_>>(),
    )
    .unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_indicators");
    for instruments in [10usize, 100, 500] {
        let rows = make_rows(instruments, 90);
        group.bench_with_input(BenchmarkId::from_parameter(instruments), &rows, |b, rows| {
            b.iter(|| build_indicators(black_box(rows), &ResonanceParams::default()))
        });
    }
    group.finish();
}

fn bench_backtest(c: &mut Criterion) {
    let rows = make_rows(300, 120);
    let window = BacktestWindow::ending(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    c.bench_function("backtest_rows_300x120", |b| {
        b.iter(|| backtest_rows(black_box(&rows), &window, &ResonanceParams::default()).unwrap())
    });
}

fn bench_screen_frame(c: &mut Criterion) {
    let df = to_frame(&make_rows(300, 60));
    c.bench_function("screen_frame_300x60", |b| b.iter(|| screen(black_box(&df)).unwrap()));
}

criterion_group!(benches, bench_indicators, bench_backtest, bench_screen_frame);
criterion_main!(benches);
