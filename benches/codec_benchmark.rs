// codec_benchmark.rs - Performance benchmarks for the CIP codecs
// =========================================================================
//
// Benchmarks the hot protocol paths: path segment encoding, tag value
// decoding and symbol-table page parsing.

use bytes::BufMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cip_client::segment::{build_logical, build_port, paths, LogicalType};
use cip_client::tag::parse_symbol_page;
use cip_client::value::decode;
use cip_client::TypeDescriptor;

/// Builds a symbol-table page with `count` records.
fn create_symbol_page(count: u32) -> Vec<u8> {
    let mut page = Vec::new();
    for i in 0..count {
        let name = format!("Tag_{i:05}");
        page.put_u32_le(i + 1);
        page.put_u16_le(name.len() as u16);
        page.put_slice(name.as_bytes());
        page.put_u16_le(0x00C4);
        page.put_u32_le(0);
        page.put_u32_le(0);
        page.put_u32_le(0);
    }
    page
}

/// Benchmark path construction for a symbol instance read
fn benchmark_segment_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_encoding");

    group.bench_function("symbol_path", |b| {
        b.iter(|| {
            paths(&[
                build_logical(LogicalType::ClassId, black_box(0x6B), true),
                build_logical(LogicalType::InstanceId, black_box(0x1234), true),
            ])
        })
    });

    group.bench_function("port_segment", |b| {
        b.iter(|| build_port(black_box(&[1]), black_box(1), true))
    });

    group.finish();
}

/// Benchmark rank-1 DINT array decoding at several sizes
fn benchmark_value_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_decode");
    let descriptor = TypeDescriptor::new(0x20C4);

    for element_count in [10u32, 100, 1000].iter() {
        let mut payload = Vec::new();
        for i in 0..*element_count {
            payload.put_i32_le(i as i32);
        }

        group.bench_with_input(
            BenchmarkId::new("dint_array", element_count),
            element_count,
            |b, &count| {
                b.iter(|| decode(black_box(&payload), descriptor, count, 0, 0).unwrap())
            },
        );
    }

    group.finish();
}

/// Benchmark symbol page parsing at several page sizes
fn benchmark_symbol_page_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbol_page_parsing");

    for record_count in [10u32, 100, 1000].iter() {
        let page = create_symbol_page(*record_count);

        group.bench_with_input(
            BenchmarkId::new("parse_page", record_count),
            record_count,
            |b, _| b.iter(|| parse_symbol_page(black_box(&page)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_segment_encoding,
    benchmark_value_decode,
    benchmark_symbol_page_parsing
);
criterion_main!(benches);
