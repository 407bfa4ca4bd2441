//! # Example: counter
//!
//! Demonstrates the manual game-loop shape: the host owns the scheduler and
//! calls `drain_once` once per frame.
//!
//! Shows how to:
//! - Build a [`Scheduler`] and wire [`Observable`] values to it.
//! - Subscribe with a [`SubscriberKey`] and with broadcast `listen`.
//! - Observe equality-skip, coalescing, and urgent preemption per frame.
//!
//! ## Flow
//! ```text
//! frame N:   score.set(...) / health.set(...)    (writers)
//! frame N:   scheduler.drain_once()              (host loop)
//!              └─► subscribers see the latest value, once
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example counter
//! ```

use tickbus::{Observable, Scheduler, SubscriberKey};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let scheduler = Scheduler::with_defaults();

    let score = Observable::new(&scheduler, 0u32);
    let health = Observable::new(&scheduler, 100u32);

    score.subscribe(SubscriberKey::next(), |v: &u32| {
        println!("[score]  now {v}");
    });
    health.subscribe(SubscriberKey::next(), |v: &u32| {
        println!("[health] now {v}");
    });
    health.listen(|v: &u32| {
        if *v < 30 {
            println!("[health] LOW WARNING ({v})");
        }
    });

    println!("frame 1: several writes coalesce into one delivery each");
    score.set(10);
    score.set(25);
    score.set(40); // only 40 is delivered
    health.set(100); // equal value: skipped entirely
    scheduler.drain_once();

    println!("\nframe 2: urgent health drop preempts the score update");
    score.set(55);
    health.set_urgent(20);
    scheduler.drain_once();

    println!("\nframe 3: nothing changed, nothing delivered");
    let delivered = scheduler.drain_once();
    println!("(drained {delivered} actions)");

    let stats = scheduler.stats();
    println!(
        "\nstats: enqueued={} delivered={} panicked={}",
        stats.enqueued, stats.delivered, stats.panicked
    );

    scheduler.shutdown();
    Ok(())
}
