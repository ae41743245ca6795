//! Async acquisition on the tokio runtime

mod common;

use std::time::Duration;

use common::CountingFactory;
use limiting_pool::{PoolConfiguration, PoolError, ResourceLimitingPool};

fn blocking_pool(timeout: Duration) -> ResourceLimitingPool<CountingFactory> {
    ResourceLimitingPool::new(
        CountingFactory::default(),
        PoolConfiguration::new()
            .with_max_size(1)
            .with_max_strict(true)
            .with_blocking(true)
            .with_block_timeout(timeout),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn async_get_waits_for_release() {
    let pool = blocking_pool(Duration::from_secs(2));
    let held = pool.acquire_async().await.unwrap();
    let held_id = held.id();

    let releaser = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);
    });

    let obj = pool.acquire_async().await.unwrap();
    assert_eq!(obj.id(), held_id);
    releaser.await.unwrap();
}

#[tokio::test]
async fn async_get_times_out() {
    let pool = blocking_pool(Duration::from_millis(50));
    let _held = pool.acquire_async().await.unwrap();

    let result = pool.acquire_async().await;
    assert!(matches!(result, Err(PoolError::Timeout(_))));
}
