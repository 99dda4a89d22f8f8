//! Criterion benchmarks for the analytics layer.
//!
//! Benchmarks:
//! 1. Metric reduction over position lists of increasing size
//! 2. Series drawdown over long close columns
//! 3. The full pipeline on a 10k-bar series

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sliver_core::{
    simulate, IndicatorSeries, PositionSide, StrategyDescriptor, StrategyType,
};
use sliver_runner::{backtest, compute_metrics, max_series_drawdown, BacktestRequest};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize, every: usize) -> IndicatorSeries {
    let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let mut s = IndicatorSeries::default();
    let mut z = Vec::with_capacity(n);
    for i in 0..n {
        let close = 100.0 + (i as f64 * 0.05).sin() * 15.0 + (i as f64 * 0.011).cos() * 4.0;
        s.time.push(base + Duration::minutes(i as i64 * 5));
        s.open.push(close - 0.2);
        s.high.push(close + 1.0);
        s.low.push(close - 1.0);
        s.close.push(close);
        s.buys.push(if i % every == 0 { close } else { 0.0 });
        s.sells.push(if i % every == every / 2 { close } else { 0.0 });
        z.push(if i < 20 { None } else { Some((i as f64 * 0.3).sin() * 2.0) });
    }
    s.aux.insert("z_score".to_string(), z);
    s
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_compute_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_metrics");
    for n in [10_000, 100_000] {
        let series = make_series(n, 10);
        let positions = simulate(&series, PositionSide::Long, None);
        group.bench_with_input(BenchmarkId::from_parameter(positions.len()), &positions, |b, p| {
            b.iter(|| compute_metrics(black_box(p), black_box(&series)))
        });
    }
    group.finish();
}

fn bench_series_drawdown(c: &mut Criterion) {
    let series = make_series(100_000, 10);
    c.bench_function("max_series_drawdown_100k", |b| {
        b.iter(|| max_series_drawdown(black_box(&series.close)))
    });
}

fn bench_backtest(c: &mut Criterion) {
    let series = make_series(10_000, 40);
    let request = BacktestRequest::new(StrategyDescriptor::new(
        StrategyType::Hypnox,
        PositionSide::Long,
    ));
    c.bench_function("backtest_10k", |b| {
        b.iter(|| backtest(black_box(&request), black_box(&series)))
    });
}

criterion_group!(
    benches,
    bench_compute_metrics,
    bench_series_drawdown,
    bench_backtest
);
criterion_main!(benches);
