//! Criterion benchmarks for the per-poll hot paths.
//!
//! Benchmarks:
//! 1. Indicator stack (snapshot engine over a full candle history)
//! 2. Single indicators (SuperTrend, Stochastic RSI, EMA-on-low)
//! 3. Entry and exit evaluation (what one confirmation poll costs)
//! 4. Double confirmation poll against in-memory candles

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use dualtrend_core::config::SignalConfig;
use dualtrend_core::confirmation::DoubleConfirmationController;
use dualtrend_core::domain::Candle;
use dualtrend_core::indicators::ema::ema_on_low;
use dualtrend_core::indicators::stoch_rsi::stochastic_rsi;
use dualtrend_core::indicators::{IndicatorEngine, IndicatorParams, StochRsiParams, Supertrend};
use dualtrend_core::signals::{SignalEvaluator, Timeframe};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candles(n: usize) -> Vec<Candle> {
    let start = NaiveDate::from_ymd_opt(2026, 1, 20)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 25_000.0 + (i as f64 * 0.1).sin() * 80.0 + i as f64 * 0.5;
            let open = close - 3.0;
            Candle {
                timestamp: start + Duration::minutes(2 * i as i64),
                open,
                high: close + 12.0,
                low: open - 12.0,
                close,
                volume: 50_000 + (i as u64 % 10_000),
                open_interest: None,
            }
        })
        .collect()
}

// ── 1. Indicator Stack ───────────────────────────────────────────────

fn bench_indicator_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_stack");
    let engine = IndicatorEngine::new(IndicatorParams::default());

    // One session of 2-minute bars, then a full week of history.
    for &bar_count in &[188, 940] {
        let candles = make_candles(bar_count);
        group.bench_with_input(
            BenchmarkId::new("snapshots", bar_count),
            &bar_count,
            |b, _| {
                b.iter(|| engine.compute(black_box(&candles)));
            },
        );
    }

    group.finish();
}

// ── 2. Single Indicators ─────────────────────────────────────────────

fn bench_single_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_indicator");
    let candles = make_candles(940);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    group.bench_function("supertrend_7_3", |b| {
        let st = Supertrend::new(7, 3.0);
        b.iter(|| st.states(black_box(&candles)));
    });

    group.bench_function("stoch_rsi_14_14_3_3", |b| {
        b.iter(|| stochastic_rsi(black_box(&closes), StochRsiParams::default()));
    });

    group.bench_function("ema_low_8_offset_9", |b| {
        b.iter(|| ema_on_low(black_box(&candles), 8, 9));
    });

    group.finish();
}

// ── 3. Signal Evaluation ─────────────────────────────────────────────

fn bench_signals(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_evaluation");
    let evaluator = SignalEvaluator::new(IndicatorParams::default(), SignalConfig::default());
    let candles = make_candles(940);

    group.bench_function("analyze_entry", |b| {
        b.iter(|| evaluator.analyze_entry(black_box(&candles)));
    });

    group.bench_function("analyze_exit", |b| {
        b.iter(|| evaluator.analyze_exit(black_box(&candles)));
    });

    group.finish();
}

// ── 4. Confirmation Poll ─────────────────────────────────────────────

fn bench_confirmation_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("confirmation_poll");
    let evaluator = SignalEvaluator::new(IndicatorParams::default(), SignalConfig::default());
    let primary = make_candles(376);
    let confirm = make_candles(940);
    let t0 = Utc.with_ymd_and_hms(2026, 1, 20, 5, 0, 0).unwrap();

    // Two polls: one refreshes both timeframes, one reuses the primary.
    group.bench_function("refresh_then_reuse", |b| {
        b.iter(|| {
            let mut controller = DoubleConfirmationController::new(Duration::seconds(10));
            let mut source = |tf: Timeframe| match tf {
                Timeframe::Primary => evaluator.analyze_entry(&primary),
                Timeframe::Confirmation => evaluator.analyze_entry(&confirm),
            };
            black_box(controller.poll(t0, &mut source));
            black_box(controller.poll(t0 + Duration::seconds(5), &mut source));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_indicator_stack,
    bench_single_indicators,
    bench_signals,
    bench_confirmation_poll,
);
criterion_main!(benches);
