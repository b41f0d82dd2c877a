//! SBOR Codec Benchmark
//!
//! Measures the two halves of the boundary codec:
//! 1. Encoding host-built value trees into payload bytes
//! 2. Decoding (untrusted) payload bytes back into value trees
//!
//! # Running
//! ```bash
//! cargo bench --package vellum-core --bench sbor_codec
//! ```

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use vellum_core::sbor::{decode, encode, SborValue, ValueKind};
use vellum_core::slice::Slice;

// ============================================================================
// Test Data Generation
// ============================================================================

/// A tuple of `field_count` mixed-kind fields.
fn generate_flat_tuple(field_count: usize) -> SborValue {
    let fields = (0..field_count)
        .map(|i| match i % 4 {
            0 => SborValue::U64(i as u64),
            1 => SborValue::String(format!("field_{}", i)),
            2 => SborValue::Bool(i % 8 == 2),
            _ => SborValue::byte_array(&[i as u8; 16]),
        })
        .collect();
    SborValue::Tuple { fields }
}

/// Tuples nested `depth` levels deep, one leaf at the bottom.
fn generate_nested_tuple(depth: usize) -> SborValue {
    let mut value = SborValue::U32(0);
    for _ in 0..depth {
        value = SborValue::Tuple {
            fields: vec![value],
        };
    }
    value
}

/// A string-keyed map with `entry_count` entries.
fn generate_map(entry_count: usize) -> SborValue {
    SborValue::Map {
        key_kind: ValueKind::String,
        value_kind: ValueKind::U64,
        entries: (0..entry_count)
            .map(|i| {
                (
                    SborValue::String(format!("key_{}", i)),
                    SborValue::U64(i as u64),
                )
            })
            .collect(),
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sbor_encode");
    group.measurement_time(Duration::from_secs(5));

    for field_count in [4, 32, 256] {
        let value = generate_flat_tuple(field_count);
        let encoded_len = encode(&value).unwrap().len() as u64;
        group.throughput(Throughput::Bytes(encoded_len));
        group.bench_with_input(
            BenchmarkId::new("flat_tuple", field_count),
            &value,
            |b, value| b.iter(|| encode(black_box(value)).unwrap()),
        );
    }

    let nested = generate_nested_tuple(48);
    group.bench_function("nested_tuple_48", |b| {
        b.iter(|| encode(black_box(&nested)).unwrap())
    });

    let map = generate_map(64);
    group.bench_function("map_64", |b| b.iter(|| encode(black_box(&map)).unwrap()));

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sbor_decode");
    group.measurement_time(Duration::from_secs(5));

    for field_count in [4, 32, 256] {
        let bytes = encode(&generate_flat_tuple(field_count)).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("flat_tuple", field_count),
            &bytes,
            |b, bytes| b.iter(|| decode(black_box(bytes)).unwrap()),
        );
    }

    let nested = encode(&generate_nested_tuple(48)).unwrap();
    group.bench_function("nested_tuple_48", |b| {
        b.iter(|| decode(black_box(&nested)).unwrap())
    });

    let map = encode(&generate_map(64)).unwrap();
    group.bench_function("map_64", |b| b.iter(|| decode(black_box(&map)).unwrap()));

    group.finish();
}

fn bench_slice_words(c: &mut Criterion) {
    c.bench_function("slice_pack_unpack", |b| {
        b.iter(|| {
            let word = Slice::new(black_box(0x1000), black_box(0x200)).to_word();
            black_box(Slice::from_word(word))
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_slice_words);
criterion_main!(benches);
