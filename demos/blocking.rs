//! Several threads sharing a strict, blocking pool

use std::thread;
use std::time::Duration;

use limiting_pool::{PoolConfiguration, PoolError, ResourceLimitingPool};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_thread_names(true)
        .init();

    let pool = ResourceLimitingPool::from_fn(
        || vec![0u8; 1024],
        PoolConfiguration::new()
            .with_name("frames")
            .with_max_size(2)
            .with_max_strict(true)
            .with_blocking(true)
            .with_block_timeout(Duration::from_millis(500))
            .with_tracing(true),
    );

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let pool = pool.clone();
            thread::Builder::new()
                .name(format!("worker-{n}"))
                .spawn(move || -> Result<(), PoolError> {
                    let mut frame = pool.acquire()?;
                    frame[0] = n;
                    thread::sleep(Duration::from_millis(100));
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    if let Ok(state) = pool.state() {
        for checkout in &state.outstanding {
            println!("object #{} held by {:?} for {:?}", checkout.id, checkout.thread, checkout.held_for());
        }
    }

    for worker in workers {
        match worker.join().unwrap() {
            Ok(()) => {}
            Err(err) => println!("worker failed: {err}"),
        }
    }

    let metrics = pool.metrics();
    println!(
        "gets={} blocks={} creates={} size={}",
        metrics.gets, metrics.blocks, metrics.creates, metrics.size
    );

    pool.dispose();
}
