//! Benchmarks for the preprocessing, feature, and model stages.

use aqi_forecast::core::{Measurement, Observation, ObservationTable};
use aqi_forecast::features::FeatureEngineer;
use aqi_forecast::models::{GradientBoosting, RandomForest, Regressor, RidgeRegression};
use aqi_forecast::preprocess::{impute, ImputeMethod};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn generate_table(hours: usize, stations: usize) -> ObservationTable {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let rows = (0..hours)
        .flat_map(|h| {
            (0..stations).map(move |s| {
                let phase = 2.0 * std::f64::consts::PI * (h % 24) as f64 / 24.0;
                let mut obs = Observation::new(format!("S{}", s), "Delhi", base + Duration::hours(h as i64))
                    .with(Measurement::Pm25, 60.0 + 20.0 * phase.sin() + s as f64)
                    .with(Measurement::Pm10, 110.0 + 30.0 * phase.cos())
                    .with(Measurement::No2, 25.0 + (h % 7) as f64)
                    .with(Measurement::Temperature, 22.0 + 6.0 * phase.sin())
                    .with(Measurement::Humidity, 55.0 + 10.0 * phase.cos())
                    .with(Measurement::Aqi, 120.0 + 30.0 * phase.sin());
                if (h + s) % 9 == 0 {
                    obs.set(Measurement::Pm25, None);
                }
                obs
            })
        })
        .collect();
    ObservationTable::new(rows).unwrap()
}

fn generate_matrix(n: usize, k: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let x: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..k).map(|j| ((i * (j + 1)) % 23) as f64 / 23.0).collect())
        .collect();
    let y = x
        .iter()
        .map(|r| r.iter().enumerate().map(|(j, v)| v * (j + 1) as f64).sum())
        .collect();
    (x, y)
}

fn bench_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("imputation");

    for hours in [48, 168, 336].iter() {
        let table = generate_table(*hours, 4);

        group.bench_with_input(BenchmarkId::new("knn", hours), hours, |b, _| {
            b.iter(|| impute(black_box(&table), ImputeMethod::Knn { k: 5 }))
        });

        group.bench_with_input(BenchmarkId::new("interpolate", hours), hours, |b, _| {
            b.iter(|| impute(black_box(&table), ImputeMethod::Interpolate))
        });
    }

    group.finish();
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_engineering");
    let engineer = FeatureEngineer::default();

    for hours in [168, 720].iter() {
        let table = generate_table(*hours, 4);
        group.bench_with_input(BenchmarkId::new("engineer", hours), hours, |b, _| {
            b.iter(|| engineer.engineer(black_box(&table)))
        });
    }

    group.finish();
}

fn bench_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_fit");
    group.sample_size(10);

    for n in [200, 800].iter() {
        let (x, y) = generate_matrix(*n, 12);

        group.bench_with_input(BenchmarkId::new("ridge", n), n, |b, _| {
            b.iter(|| {
                let mut model = RidgeRegression::default();
                model.fit(black_box(&x), black_box(&y))
            })
        });

        group.bench_with_input(BenchmarkId::new("random_forest", n), n, |b, _| {
            b.iter(|| {
                let mut model = RandomForest::default().with_n_estimators(20);
                model.fit(black_box(&x), black_box(&y))
            })
        });

        group.bench_with_input(BenchmarkId::new("gradient_boosting", n), n, |b, _| {
            b.iter(|| {
                let mut model = GradientBoosting::default().with_n_estimators(50);
                model.fit(black_box(&x), black_box(&y))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_preprocess, bench_features, bench_models);
criterion_main!(benches);
