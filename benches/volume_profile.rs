//! Benchmarks for volume profile and support/resistance computation

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowscan::analysis::{find_support_resistance, volume_profile};
use flowscan::data::Candle;

fn intraday_series(bars: usize) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
    (0..bars)
        .map(|i| {
            let drift = (i as f64 * 0.7).sin() * 0.4;
            let close = 8.0 + drift;
            Candle {
                timestamp: base + Duration::minutes(i as i64 * 15),
                open: close - 0.03,
                high: close + 0.08,
                low: close - 0.09,
                close,
                volume: 800_000 + (i as u64 % 7) * 150_000,
            }
        })
        .collect()
}

fn benchmark_volume_profile(c: &mut Criterion) {
    let week = intraday_series(130);

    c.bench_function("volume_profile_week_20_bins", |b| {
        b.iter(|| volume_profile(black_box(&week), 20, 0.70))
    });

    let quarter = intraday_series(1_600);
    c.bench_function("volume_profile_quarter_50_bins", |b| {
        b.iter(|| volume_profile(black_box(&quarter), 50, 0.70))
    });
}

fn benchmark_support_resistance(c: &mut Criterion) {
    let daily = intraday_series(252);

    c.bench_function("support_resistance_year", |b| {
        b.iter(|| find_support_resistance(black_box(&daily), 8.0, 5, 0.02))
    });
}

criterion_group!(
    benches,
    benchmark_volume_profile,
    benchmark_support_resistance
);
criterion_main!(benches);
