//! Benchmarks for query compilation and result tabulation.

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use plotwise::column::{dimension_candidates, metric_candidates};
use plotwise::execute::tabulate;
use plotwise::query::compile;
use std::hint::black_box;
use std::sync::Arc;

fn covid_columns() -> Vec<String> {
    vec![
        "date::timestamp without time zone".to_string(),
        "country::text".to_string(),
        "region::text".to_string(),
        "cases::integer".to_string(),
        "deaths::integer".to_string(),
    ]
}

fn bench_compile(c: &mut Criterion) {
    let columns = covid_columns();
    let dimensions = vec!["date::month".to_string(), "country".to_string()];
    let metrics = vec!["SUM(cases)".to_string()];

    let mut group = c.benchmark_group("compile");
    for filter_count in [0usize, 1, 5, 20] {
        let filters: Vec<String> = (0..filter_count)
            .map(|i| match i % 3 {
                0 => "country/IN/US,CA,MX".to_string(),
                1 => format!("cases/>/{i}"),
                _ => "region/LIKE/north".to_string(),
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("filters", filter_count),
            &filters,
            |b, filters| {
                b.iter(|| {
                    compile(
                        black_box("public.covid"),
                        black_box(&dimensions),
                        black_box(&metrics),
                        black_box(filters),
                        black_box(&columns),
                    )
                });
            },
        );
    }
    group.finish();
}

fn bench_candidates(c: &mut Criterion) {
    let columns = covid_columns();
    c.bench_function("candidates", |b| {
        b.iter(|| {
            (
                dimension_candidates(black_box(&columns)),
                metric_candidates(black_box(&columns)),
            )
        });
    });
}

fn bench_tabulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("tabulate");

    for rows in [100usize, 10_000] {
        let schema = Arc::new(Schema::new(vec![
            Field::new("country", DataType::Utf8, false),
            Field::new("month", DataType::Utf8, false),
            Field::new("cases", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(
                    (0..rows).map(|i| format!("c{}", i % 50)).collect::<Vec<_>>(),
                )),
                Arc::new(StringArray::from(
                    (0..rows).map(|i| format!("2021-{:02}-01", i % 12 + 1)).collect::<Vec<_>>(),
                )),
                Arc::new(Float64Array::from(
                    (0..rows).map(|i| i as f64).collect::<Vec<_>>(),
                )),
            ],
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::new("rows", rows), &batch, |b, batch| {
            b.iter(|| tabulate(black_box(std::slice::from_ref(batch)), 2, 1));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_candidates, bench_tabulate);
criterion_main!(benches);
