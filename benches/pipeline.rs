//! Pipeline macrobenchmarks
//!
//! Run with: cargo bench --bench pipeline
//!
//! Covers the three execution shapes:
//! - full-scan fusion (filter + project + fold in one pass)
//! - early termination (take bounds stop source consumption)
//! - grouping (partition + broadcast aggregate)

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use perch::{Pipeline, Table, Value};

const ROWS: usize = 100_000;

fn synthetic_table(rows: usize) -> Table {
    let data = (0..rows)
        .map(|i| {
            vec![
                Value::Int((i % 16) as i64),
                Value::Float(i as f64 * 0.25),
                Value::Int(i as i64),
            ]
        })
        .collect();
    Table::with_names(data, ["bucket", "price", "seq"]).expect("uniform synthetic rows")
}

fn bench_full_scan(c: &mut Criterion) {
    let pipeline = Pipeline::new(synthetic_table(ROWS)).expect("indexed table");

    let mut group = c.benchmark_group("full_scan");
    group.throughput(Throughput::Elements(ROWS as u64));

    group.bench_function("filter_col_sum", |b| {
        b.iter(|| {
            let total = pipeline
                .filter_by("bucket", |v| *v != Value::Int(0))
                .expect("bucket exists")
                .col("price")
                .expect("price exists")
                .sum();
            black_box(total)
        })
    });

    group.bench_function("cols_stats", |b| {
        b.iter(|| {
            let narrowed = pipeline.cols(&["price", "seq"]).expect("both exist");
            black_box(narrowed.sum())
        })
    });

    group.finish();
}

fn bench_early_termination(c: &mut Criterion) {
    let pipeline = Pipeline::new(synthetic_table(ROWS)).expect("indexed table");

    let mut group = c.benchmark_group("early_termination");

    // take(64) must cost ~64 rows, not ~ROWS.
    group.bench_function("take_64", |b| {
        b.iter(|| black_box(pipeline.take(64).to_vec()))
    });

    group.bench_function("drop_then_take", |b| {
        b.iter(|| black_box(pipeline.drop(32).take(64).to_vec()))
    });

    group.finish();
}

fn bench_group_by(c: &mut Criterion) {
    let pipeline = Pipeline::new(synthetic_table(ROWS)).expect("indexed table");

    let mut group = c.benchmark_group("group_by");
    group.throughput(Throughput::Elements(ROWS as u64));

    group.bench_function("partition_and_mean", |b| {
        b.iter(|| {
            let means = pipeline
                .group_by("bucket")
                .expect("bucket exists")
                .col("price")
                .expect("price exists")
                .mean();
            black_box(means)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_full_scan, bench_early_termination, bench_group_by);
criterion_main!(benches);
