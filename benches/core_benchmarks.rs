use std::collections::HashMap;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use backoffice_api::services::aggregation::{aggregate, SubmittedLine};
use backoffice_api::services::numbering::{format_number, trailing_sequence};

// Benchmark for line-item aggregation across bill sizes
fn aggregation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_aggregation");

    for size in [5usize, 20, 100, 500].iter() {
        // Ten distinct catalog items submitted over and over, so merging
        // actually has duplicates to collapse.
        let catalog: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
        let prices: HashMap<Uuid, Decimal> =
            catalog.iter().map(|id| (*id, dec!(42.50))).collect();
        let lines: Vec<SubmittedLine> = (0..*size)
            .map(|i| SubmittedLine {
                item_id: Some(catalog[i % catalog.len()]),
                custom_name: None,
                price: None,
                quantity: (i % 5) as i32 + 1,
                delete: false,
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let result = aggregate(black_box(&lines), black_box(&prices));
                black_box(result)
            });
        });
    }

    group.finish();
}

// Benchmark for mixed catalog and free-form lines
fn mixed_lines_benchmark(c: &mut Criterion) {
    let item = Uuid::new_v4();
    let prices: HashMap<Uuid, Decimal> = HashMap::from([(item, dec!(30))]);
    let lines = vec![
        SubmittedLine {
            item_id: Some(item),
            custom_name: None,
            price: None,
            quantity: 2,
            delete: false,
        },
        SubmittedLine {
            item_id: None,
            custom_name: Some("Special order".to_string()),
            price: Some(dec!(450)),
            quantity: 1,
            delete: false,
        },
        SubmittedLine {
            item_id: Some(item),
            custom_name: None,
            price: Some(dec!(25)),
            quantity: 3,
            delete: false,
        },
    ];

    c.bench_function("aggregate_mixed_lines", |b| {
        b.iter(|| {
            let result = aggregate(black_box(&lines), black_box(&prices));
            black_box(result)
        });
    });
}

// Benchmark for document number formatting and parsing
fn numbering_benchmark(c: &mut Criterion) {
    let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();

    c.bench_function("format_document_number", |b| {
        b.iter(|| {
            let number = format_number(black_box("SB"), black_box(date), black_box(417));
            black_box(number)
        });
    });

    c.bench_function("parse_trailing_sequence", |b| {
        let number = format_number("SB", date, 9999);
        b.iter(|| {
            let seq = trailing_sequence(black_box(&number));
            black_box(seq)
        });
    });
}

criterion_group!(
    benches,
    aggregation_benchmark,
    mixed_lines_benchmark,
    numbering_benchmark
);
criterion_main!(benches);
