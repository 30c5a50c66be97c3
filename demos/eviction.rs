//! Background eviction and min-idle replenishment

use keyedpool::{FactoryError, KeyedPool, KeyedPoolFactory, PoolConfig};
use std::thread;
use std::time::Duration;

struct SessionFactory;

impl KeyedPoolFactory<&'static str, String> for SessionFactory {
    fn make(&self, key: &&'static str) -> Result<String, FactoryError> {
        Ok(format!("session for {key}"))
    }
}

fn main() {
    println!("=== keyedpool - Eviction ===\n");

    let mut config = PoolConfig::new()
        .with_min_idle_per_key(2)
        .with_time_between_eviction_runs(Duration::from_millis(50));
    config.min_evictable_idle = Some(Duration::from_millis(200));
    let pool: KeyedPool<&'static str, String> = KeyedPool::new(SessionFactory, config);

    // Seed the sub-pool and let the evictor keep it warm.
    pool.prepare_pool(&"tenant-a").unwrap();
    println!("After prepare_pool: idle = {}", pool.num_idle_key(&"tenant-a"));

    // Hold one instance so the key stays registered while idles expire.
    let held = pool.borrow(&"tenant-a").unwrap();
    println!("Borrowed: {}", *held);

    thread::sleep(Duration::from_millis(400));
    let metrics = pool.metrics();
    println!(
        "After idling: destroyed_by_evictor = {}, idle = {}",
        metrics.destroyed_by_evictor,
        pool.num_idle_key(&"tenant-a")
    );
    println!("(expired instances were retired and the minimum re-created)");

    drop(held);
    pool.close();
    println!("\nClosed; idle = {}", pool.num_idle());
}
