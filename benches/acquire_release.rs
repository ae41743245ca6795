use criterion::{Criterion, black_box, criterion_group, criterion_main};
use limiting_pool::{PoolConfiguration, ResourceLimitingPool};
use std::time::Duration;

fn acquire_release(c: &mut Criterion) {
    let lenient = ResourceLimitingPool::from_fn(|| vec![0u8; 256], PoolConfiguration::default());
    c.bench_function("acquire_release_lenient", |b| {
        b.iter(|| {
            let obj = lenient.acquire().unwrap();
            black_box(obj.len());
        })
    });

    let strict = ResourceLimitingPool::from_fn(
        || vec![0u8; 256],
        PoolConfiguration::new()
            .with_max_size(8)
            .with_max_strict(true)
            .with_blocking(true)
            .with_trim_interval(Duration::from_secs(1)),
    );
    c.bench_function("acquire_release_strict_trimming", |b| {
        b.iter(|| {
            let obj = strict.acquire().unwrap();
            black_box(obj.len());
        })
    });
}

criterion_group!(benches, acquire_release);
criterion_main!(benches);
