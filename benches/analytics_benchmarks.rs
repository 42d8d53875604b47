use bodyrs::{
    AssessmentSeries, AssessmentSnapshot, BodyFatMethod, Measurements, Metric, MetricsCalculator,
    ProgressAnalyzer, Sex,
};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Benchmarks for the metric derivation and progress analysis paths
///
/// Series sizes grow to cover long assessment histories.

fn create_benchmark_measurements(offset: i64) -> Measurements {
    let drift = Decimal::from(offset % 10) / dec!(10);
    let mut m = Measurements {
        weight: Some(dec!(82) - drift),
        height: Some(dec!(178)),
        age: Some(dec!(35)),
        sex: Some(Sex::Male),
        ..Measurements::default()
    };
    for site in ["triceps", "subscapular", "chest", "midaxillary", "suprailiac", "abdominal", "thigh"] {
        m.skinfolds.set(site, dec!(15) - drift);
    }
    m.circumferences.waist = Some(dec!(90) - drift);
    m.circumferences.neck = Some(dec!(39));
    m.circumferences.hip = Some(dec!(101));
    m.circumferences.set("arm_right", dec!(34) + drift);
    m
}

fn create_benchmark_series(size: usize) -> AssessmentSeries {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 8, 0, 0).unwrap();
    let snapshots = (0..size as i64)
        .map(|i| {
            AssessmentSnapshot::new(
                start + Duration::days(i * 30),
                create_benchmark_measurements(i),
                BodyFatMethod::JacksonPollock7,
            )
        })
        .collect();
    AssessmentSeries::new(snapshots)
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("Metric Derivation");
    let m = create_benchmark_measurements(3);

    for method in [
        BodyFatMethod::JacksonPollock7,
        BodyFatMethod::JacksonPollock3,
        BodyFatMethod::Navy,
    ] {
        group.bench_with_input(BenchmarkId::new("derive", method), &m, |b, m| {
            b.iter(|| MetricsCalculator::derive(black_box(m), method));
        });
    }

    group.finish();
}

fn bench_trend(c: &mut Criterion) {
    let mut group = c.benchmark_group("Trend Fitting");

    for &size in &[10, 100, 1000] {
        let series = create_benchmark_series(size);
        let values = series.values(&Metric::Weight);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("fit_trend", size), &values, |b, values| {
            b.iter(|| ProgressAnalyzer::fit_trend(black_box(values)));
        });
        group.bench_with_input(BenchmarkId::new("summarize", size), &values, |b, values| {
            b.iter(|| ProgressAnalyzer::summarize(black_box(values)));
        });
    }

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let series = create_benchmark_series(2);
    let analyzer = ProgressAnalyzer::new();

    c.bench_function("compare_latest", |b| {
        b.iter(|| analyzer.compare_latest(black_box(&series)));
    });
}

criterion_group!(benches, bench_derive, bench_trend, bench_compare);
criterion_main!(benches);
