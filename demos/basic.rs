//! Basic usage: borrowing, automatic return, and capacity limits

use keyedpool::{FactoryError, KeyedPool, KeyedPoolFactory, PoolConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    host: String,
    id: u64,
}

#[derive(Default)]
struct ConnectionFactory {
    next_id: AtomicU64,
}

impl KeyedPoolFactory<String, Connection> for ConnectionFactory {
    fn make(&self, key: &String) -> Result<Connection, FactoryError> {
        Ok(Connection {
            host: key.clone(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        })
    }

    fn validate(&self, _key: &String, conn: &Connection) -> bool {
        !conn.host.is_empty()
    }
}

fn main() {
    println!("=== keyedpool - Basic Usage ===\n");

    let config = PoolConfig::new()
        .with_max_total_per_key(2)
        .with_max_wait(Duration::from_millis(100));
    let pool: KeyedPool<String, Connection> = KeyedPool::new(ConnectionFactory::default(), config);

    // Borrow and return via RAII
    println!("1. Borrow with automatic return:");
    {
        let conn = pool.borrow(&"db-primary".to_string()).unwrap();
        println!("   Using {:?}", *conn);
    }
    println!("   Idle after scope exit: {}", pool.num_idle());
    println!();

    // The same instance is reused (LIFO by default)
    println!("2. Reuse:");
    let conn = pool.borrow(&"db-primary".to_string()).unwrap();
    println!("   Got connection id {}", conn.id);
    pool.return_object(conn).unwrap();
    println!();

    // Each key owns its own sub-pool
    println!("3. Per-key sub-pools:");
    let primary = pool.borrow(&"db-primary".to_string()).unwrap();
    let replica = pool.borrow(&"db-replica".to_string()).unwrap();
    println!("   primary -> {:?}", *primary);
    println!("   replica -> {:?}", *replica);
    drop(primary);
    drop(replica);
    println!();

    // Exhaustion
    println!("4. Capacity limit (2 per key):");
    let a = pool.borrow(&"db-primary".to_string()).unwrap();
    let b = pool.borrow(&"db-primary".to_string()).unwrap();
    match pool.borrow(&"db-primary".to_string()) {
        Ok(_) => println!("   unexpected third borrow"),
        Err(e) => println!("   third borrow failed after timeout: {e}"),
    }
    drop(a);
    drop(b);

    let metrics = pool.metrics();
    println!(
        "\nMetrics: borrowed={} returned={} created={} destroyed={}",
        metrics.borrowed, metrics.returned, metrics.created, metrics.destroyed
    );

    pool.close();
}
