//! dockside benchmark suite.
//!
//! - Sector classification and SLA evaluation throughput
//! - Second-max tracking over timestamp streams
//! - Watermark scan of a Parquet file

use std::fs::File;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use dockside::classify::{ColumnNames, ShipmentColumns};
use dockside::rules::{DEFAULT_SECTOR, STORE_SUPPLY, sector_rules, sla_rules};
use dockside::watermark::SecondMaxTracker;
use dockside::{classify, evaluate_sla, second_distinct_max};

const BASE_MICROS: i64 = 1_717_200_000_000_000;
const HOUR_MICROS: i64 = 3_600_000_000;

fn shipment_batch(rows: usize, seed: u64) -> RecordBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    let order_types = [
        "S01 - ENTREGA A CLIENTES",
        "S02 - RETIRA CLIENTE DEPOSITO",
        STORE_SUPPLY[0],
        "S39 - EXPEDICAO LEVES",
        "S99 - OUTROS",
    ];

    let boxes: Vec<i64> = (0..rows).map(|_| rng.gen_range(1..700)).collect();
    let types: Vec<&str> = (0..rows)
        .map(|_| order_types[rng.gen_range(0..order_types.len())])
        .collect();
    let statuses: Vec<&str> = (0..rows)
        .map(|_| if rng.gen_bool(0.8) { "Expedido" } else { "Pendente" })
        .collect();
    let placed: Vec<i64> = (0..rows)
        .map(|_| BASE_MICROS + rng.gen_range(0..24 * 30) * HOUR_MICROS)
        .collect();
    let updated: Vec<i64> = placed
        .iter()
        .map(|p| p + rng.gen_range(0..48) * HOUR_MICROS)
        .collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("box", DataType::Int64, false),
        Field::new("order_type", DataType::Utf8, false),
        Field::new("shipment_status", DataType::Utf8, false),
        Field::new(
            "order_placed_at",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
        Field::new(
            "last_update_at",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(boxes)) as ArrayRef,
            Arc::new(StringArray::from(types)),
            Arc::new(StringArray::from(statuses)),
            Arc::new(TimestampMicrosecondArray::from(placed)),
            Arc::new(TimestampMicrosecondArray::from(updated)),
        ],
    )
    .unwrap()
}

/// Benchmarks for the rule engines over extracted columns.
fn engine_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("engines");
    let sectors = sector_rules();
    let deadlines = sla_rules();

    for size in [1_000, 10_000, 100_000] {
        let batch = shipment_batch(size, 7);
        let columns = ShipmentColumns::from_batch(&batch, &ColumnNames::default());
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("extract", size), &batch, |b, batch| {
            b.iter(|| ShipmentColumns::from_batch(batch, &ColumnNames::default()));
        });

        group.bench_with_input(BenchmarkId::new("classify", size), &columns, |b, columns| {
            b.iter(|| classify(columns, &sectors, DEFAULT_SECTOR));
        });

        group.bench_with_input(BenchmarkId::new("evaluate_sla", size), &columns, |b, columns| {
            b.iter(|| evaluate_sla(columns, &deadlines, "Expedido"));
        });
    }

    group.finish();
}

/// Benchmarks for second-max tracking, in memory and over a file.
fn watermark_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("watermark");

    for size in [10_000, 1_000_000] {
        let mut rng = StdRng::seed_from_u64(11);
        let values: Vec<i64> = (0..size).map(|_| rng.gen_range(0..5_000)).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("tracker", size), &values, |b, values| {
            b.iter(|| {
                let mut tracker = SecondMaxTracker::new();
                tracker.extend(values.iter().copied());
                tracker.second_max()
            });
        });
    }

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gold.parquet");
    let rows = 200_000;
    let batch = shipment_batch(rows, 3);
    let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    group.throughput(Throughput::Elements(rows as u64));
    for batch_size in [8_192, 65_536] {
        group.bench_with_input(
            BenchmarkId::new("scan_file", batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| second_distinct_max(&path, "order_placed_at", batch_size));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, engine_benchmarks, watermark_benchmarks);
criterion_main!(benches);
