//! # Example: driver_loop
//!
//! Demonstrates the standalone shape: a [`TickDriver`] task drains the
//! scheduler periodically while plain OS threads mutate observables.
//!
//! Shows how to:
//! - Spawn the driver and stop it with its [`CancellationToken`].
//! - Mutate an [`Observable`] from background writer threads.
//! - Register a memory-reclaim hook and trigger the pressure lever.
//!
//! ## Flow
//! ```text
//! writer threads ──► temperature.set(...) ──► Scheduler queue
//! TickDriver (tokio task) ──► drain_once() every 20ms ──► subscriber
//! main ──► on_memory_pressure() ──► batch halved + reclaim hook
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example driver_loop
//! ```

use std::time::Duration;

use tickbus::{Config, Observable, Scheduler, SubscriberKey, TickDriver};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let scheduler = Scheduler::builder(Config::default())
        .with_reclaim_hook(|| println!("[host] reclaim pass requested"))
        .build();

    let driver = TickDriver::new(&scheduler, Duration::from_millis(20));
    let token = driver.cancellation_token();
    let handle = driver.spawn();

    let temperature = Observable::new(&scheduler, 20.0f64);
    temperature.subscribe(SubscriberKey::next(), |v: &f64| {
        println!("[sensor] temperature now {v:.1}");
    });

    // Background writers: the observable is thread-safe, so ordinary OS
    // threads can feed it while the driver task drains.
    let writers: Vec<_> = (0..2u32)
        .map(|id| {
            let temperature = temperature.clone();
            std::thread::spawn(move || {
                for step in 1..=5u32 {
                    temperature.set(20.0 + f64::from(id * 10 + step));
                    std::thread::sleep(Duration::from_millis(35));
                }
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(120)).await;

    println!("[host] simulating a low-memory signal");
    scheduler.on_memory_pressure();
    println!("[host] batch size now {}", scheduler.batch_size());

    for w in writers {
        let _ = w.join();
    }
    tokio::time::sleep(Duration::from_millis(60)).await;

    token.cancel();
    handle.await?;

    let stats = scheduler.stats();
    println!(
        "[host] done: enqueued={} delivered={} backlog={}",
        stats.enqueued, stats.delivered, stats.backlog
    );
    scheduler.shutdown();
    Ok(())
}
