//! 短码生成性能基准测试

use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use tinylinker::shortcode::{CodeAllocator, Hasher, Md5Hasher, encode_digest};
use tinylinker::storage::{MappingStore, MemoryStore, UrlMapping};

const LONG_URL: &str = "https://example.com/very/long/path/to/resource?with=query&and=more";

fn bench_hash_and_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortcode/hash");
    group.throughput(Throughput::Elements(1));

    group.bench_function("md5_digest", |b| {
        b.iter(|| Md5Hasher.digest(black_box(LONG_URL)));
    });

    let digest = Md5Hasher.digest(LONG_URL);
    group.bench_function("encode_digest", |b| {
        b.iter(|| encode_digest(black_box(&digest)));
    });

    group.bench_function("candidates", |b| {
        let allocator = CodeAllocator::new(6);
        b.iter(|| allocator.candidates(black_box(&digest)));
    });

    group.finish();
}

fn bench_allocate(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let mut group = c.benchmark_group("shortcode/allocate");
    group.throughput(Throughput::Elements(1));

    let allocator = CodeAllocator::new(6);
    let digest = Md5Hasher.digest(LONG_URL);

    // 空存储：第一个偏移即可用
    let empty = Arc::new(MemoryStore::new(Duration::days(30)));
    group.bench_function("vacant", |b| {
        b.to_async(&runtime).iter(|| async {
            allocator
                .allocate(LONG_URL, &digest, empty.as_ref(), Utc::now())
                .await
        });
    });

    // 前 8 个偏移都被其他 URL 占用
    let crowded = Arc::new(MemoryStore::new(Duration::days(30)));
    runtime.block_on(async {
        for (i, code) in allocator.candidates(&digest).iter().take(8).enumerate() {
            let _ = crowded
                .insert(&UrlMapping::new(
                    code.clone(),
                    format!("https://other{}.example", i),
                    Utc::now(),
                ))
                .await;
        }
    });
    group.bench_function("eight_collisions", |b| {
        b.to_async(&runtime).iter(|| async {
            allocator
                .allocate(LONG_URL, &digest, crowded.as_ref(), Utc::now())
                .await
        });
    });

    group.finish();
}

criterion_group!(benches, bench_hash_and_encode, bench_allocate);
criterion_main!(benches);
