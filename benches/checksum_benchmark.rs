//! Checksum pass benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use omics_uploadr::upload::checksum::md5_hex;
use omics_uploadr::upload::MemorySource;

fn benchmark_checksum_chunk_sizes(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let size = 16 * 1024 * 1024;
    let source = MemorySource::new("bench.bin", vec![0xA5u8; size]);

    let mut group = c.benchmark_group("checksum_chunk_sizes");
    group.throughput(Throughput::Bytes(size as u64));

    for chunk_size in [64 * 1024u64, 1024 * 1024, 8 * 1024 * 1024].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            chunk_size,
            |b, &chunk_size| {
                b.to_async(&runtime)
                    .iter(|| async { black_box(md5_hex(&source, chunk_size).await.unwrap()) });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_checksum_chunk_sizes);
criterion_main!(benches);
