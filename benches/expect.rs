//! Expectation and digest benchmarks

use bootprobe_core::core::expect::{scan, ExpectPattern};
use bootprobe_core::sha256_hex_bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn expect_benchmark(c: &mut Criterion) {
    let mut console: Vec<u8> = Vec::new();
    for i in 0..512 {
        console.extend_from_slice(format!("I (1{i:03}) boot: loading segment {i}\r\n").as_bytes());
    }
    console.extend_from_slice(b"Hello world!\r\n");

    let mut group = c.benchmark_group("expect");
    group.throughput(Throughput::Bytes(console.len() as u64));

    group.bench_function("text_scan", |b| {
        let pattern = ExpectPattern::Text("Hello world!".to_string());
        b.iter(|| {
            let found = scan(black_box(&console), &pattern).unwrap();
            black_box(found)
        })
    });

    group.bench_function("regex_scan", |b| {
        let pattern = ExpectPattern::Regex(r"ELF file SHA256:\s+([a-f0-9]+)".to_string());
        b.iter(|| {
            let found = scan(black_box(&console), &pattern).unwrap();
            black_box(found)
        })
    });

    group.finish();
}

fn digest_benchmark(c: &mut Criterion) {
    // Typical hello-world ELF is a few hundred KiB
    let elf: Vec<u8> = (0..262_144).map(|i| (i % 256) as u8).collect();

    let mut group = c.benchmark_group("digest");
    group.throughput(Throughput::Bytes(elf.len() as u64));

    group.bench_function("sha256_hex", |b| {
        b.iter(|| {
            let digest = sha256_hex_bytes(black_box(&elf));
            black_box(digest)
        })
    });

    group.finish();
}

criterion_group!(benches, expect_benchmark, digest_benchmark);
criterion_main!(benches);
