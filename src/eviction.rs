//! Idle-object eviction: policy, background sweep, and min-idle upkeep

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use tracing::debug;

use crate::errors::PoolResult;
use crate::object::PooledObject;
use crate::pool::PoolInner;

/// Inputs to an eviction decision for one idle instance.
#[derive(Debug, Clone)]
pub struct EvictionContext {
    /// How long the instance has sat idle.
    pub idle_time: Duration,
    /// Configured hard idle threshold.
    pub min_evictable_idle: Option<Duration>,
    /// Configured soft idle threshold.
    pub soft_min_evictable_idle: Option<Duration>,
    /// Replenishment target for the instance's key.
    pub min_idle_per_key: usize,
    /// Idle instances currently under the instance's key.
    pub idle_count: usize,
}

/// Decides whether the examined instance should be destroyed.
pub type EvictionPolicyFn = fn(&EvictionContext) -> bool;

/// Evict once the hard threshold is exceeded, or once the soft threshold is
/// exceeded while more than `min_idle_per_key` instances are idle.
pub fn default_eviction_policy(ctx: &EvictionContext) -> bool {
    if let Some(min) = ctx.min_evictable_idle {
        if ctx.idle_time > min {
            return true;
        }
    }
    if let Some(soft) = ctx.soft_min_evictable_idle {
        if ctx.idle_time > soft && ctx.idle_count > ctx.min_idle_per_key {
            return true;
        }
    }
    false
}

/// Round-robin position of the eviction sweep, persisted across runs.
pub(crate) struct EvictionCursor<K, T> {
    keys: Vec<K>,
    pos: usize,
    current_key: Option<K>,
    instances: VecDeque<Arc<PooledObject<T>>>,
}

impl<K, T> EvictionCursor<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            keys: Vec::new(),
            pos: 0,
            current_key: None,
            instances: VecDeque::new(),
        }
    }
}

impl<K, T> PoolInner<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    /// One eviction sweep: examine up to the configured quota of idle
    /// instances, oldest first within each key, cycling through keys in
    /// insertion order.
    pub(crate) fn evict(&self) -> PoolResult<()> {
        self.assert_open()?;
        if self.num_idle() == 0 {
            return Ok(());
        }

        let mut cursor = self.eviction.lock();
        let quota = self.config.tests_per_run.quota(self.num_idle());
        let policy = self.config.eviction_policy;
        let mut performed = 0;
        let mut refreshed = false;

        while performed < quota {
            if cursor.instances.is_empty() && !self.advance_cursor(&mut cursor, &mut refreshed) {
                return Ok(());
            }
            let Some(wrapper) = cursor.instances.pop_front() else {
                continue;
            };
            let Some(key) = cursor.current_key.clone() else {
                continue;
            };
            if !wrapper.start_eviction_test() {
                // Borrowed since the snapshot; not a test.
                continue;
            }
            performed += 1;

            let idle_count = self.registry.get(&key).map_or(0, |sub| sub.idle_count());
            let ctx = EvictionContext {
                idle_time: wrapper.idle_time(),
                min_evictable_idle: self.config.min_evictable_idle,
                soft_min_evictable_idle: self.config.soft_min_evictable_idle,
                min_idle_per_key: self.config.effective_min_idle(),
                idle_count,
            };
            if policy(&ctx) {
                self.destroy(&key, &wrapper, true, None);
                self.destroyed_by_evictor_count.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            if self.config.test_while_idle && !self.test_idle_object(&key, &wrapper) {
                continue;
            }
            if !wrapper.end_eviction_test() {
                if let Some(sub) = self.registry.get(&key) {
                    sub.idle.offer_first(wrapper);
                }
            }
        }
        Ok(())
    }

    /// Move the cursor to the next key holding idle instances. Re-snapshots
    /// the key list at most once per sweep; returns false once every key has
    /// been tried.
    fn advance_cursor(&self, cursor: &mut EvictionCursor<K, T>, refreshed: &mut bool) -> bool {
        loop {
            while cursor.pos < cursor.keys.len() {
                let key = cursor.keys[cursor.pos].clone();
                cursor.pos += 1;
                let Some(sub) = self.registry.get(&key) else {
                    continue;
                };
                let snapshot = if self.config.lifo {
                    sub.idle.snapshot_desc()
                } else {
                    sub.idle.snapshot()
                };
                if !snapshot.is_empty() {
                    cursor.current_key = Some(key);
                    cursor.instances = VecDeque::from(snapshot);
                    return true;
                }
            }
            if *refreshed {
                return false;
            }
            cursor.keys = self.registry.keys();
            cursor.pos = 0;
            *refreshed = true;
            if cursor.keys.is_empty() {
                return false;
            }
        }
    }

    /// Activate/validate/passivate an idle instance. Returns false when the
    /// instance failed and was destroyed.
    fn test_idle_object(&self, key: &K, wrapper: &Arc<PooledObject<T>>) -> bool {
        let Some(mut obj) = wrapper.take_slot() else {
            // Destroyed concurrently; nothing left to test.
            return true;
        };
        if let Err(e) = self.factory.activate(key, &mut obj) {
            self.swallowed.push("activate during idle test", &e);
            self.destroy(key, wrapper, true, Some(obj));
            self.destroyed_by_evictor_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if !self.factory.validate(key, &obj) {
            self.destroy(key, wrapper, true, Some(obj));
            self.destroyed_by_evictor_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if let Err(e) = self.factory.passivate(key, &mut obj) {
            self.swallowed.push("passivate during idle test", &e);
            self.destroy(key, wrapper, true, Some(obj));
            self.destroyed_by_evictor_count.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        wrapper.store_slot(obj);
        true
    }

    /// Top every key's idle set up to the replenishment target.
    pub(crate) fn ensure_min_idle(&self) -> PoolResult<()> {
        if self.config.effective_min_idle() == 0 {
            return Ok(());
        }
        for key in self.registry.keys() {
            self.ensure_min_idle_key(&key)?;
        }
        Ok(())
    }

    pub(crate) fn ensure_min_idle_key(&self, key: &K) -> PoolResult<()> {
        // The deficit is recomputed inside the loop so concurrent returns
        // stop the replenishment early.
        let limit = self.calculate_deficit(key);
        for _ in 0..limit {
            if self.calculate_deficit(key) == 0 {
                break;
            }
            self.add_object(key)?;
        }
        Ok(())
    }

    /// Idle instances missing under `key`, clamped by the per-key and global
    /// capacity still available.
    fn calculate_deficit(&self, key: &K) -> usize {
        let min_idle = self.config.effective_min_idle();
        let (idle, live) = match self.registry.get(key) {
            Some(sub) => (sub.idle_count(), sub.live_count()),
            None => (0, 0),
        };
        let mut deficit = min_idle.saturating_sub(idle);
        if let Some(cap) = self.config.max_total_per_key {
            deficit = deficit.min(cap.saturating_sub(live));
        }
        if let Some(cap) = self.config.max_total {
            deficit = deficit.min(cap.saturating_sub(self.num_total.load(Ordering::Acquire)));
        }
        deficit
    }
}

/// Handle to the background evictor thread.
pub(crate) struct EvictorHandle {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

impl EvictorHandle {
    /// Signal the thread and wait for it to finish its current sweep.
    pub(crate) fn stop(self) {
        drop(self.shutdown);
        let _ = self.thread.join();
    }
}

/// Start the evictor thread. Each tick runs one eviction sweep followed by
/// min-idle replenishment; every failure is swallowed so the thread
/// outlives any factory mishap.
pub(crate) fn spawn_evictor<K, T>(inner: &Arc<PoolInner<K, T>>, period: Duration) -> EvictorHandle
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    let (shutdown, ticks) = channel::bounded::<()>(0);
    let pool = Arc::downgrade(inner);
    let thread = thread::Builder::new()
        .name("keyedpool-evictor".into())
        .spawn(move || run_evictor(pool, ticks, period))
        .expect("failed to spawn evictor thread");
    debug!(period_ms = period.as_millis() as u64, "evictor started");
    EvictorHandle { shutdown, thread }
}

fn run_evictor<K, T>(
    pool: Weak<PoolInner<K, T>>,
    ticks: channel::Receiver<()>,
    period: Duration,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    loop {
        match ticks.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        let Some(pool) = pool.upgrade() else {
            break;
        };
        if let Err(e) = pool.evict() {
            pool.swallowed.push("eviction sweep", &e);
        }
        if let Err(e) = pool.ensure_min_idle() {
            pool.swallowed.push("min-idle replenishment", &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(idle_ms: u64, idle_count: usize) -> EvictionContext {
        EvictionContext {
            idle_time: Duration::from_millis(idle_ms),
            min_evictable_idle: Some(Duration::from_millis(100)),
            soft_min_evictable_idle: Some(Duration::from_millis(20)),
            min_idle_per_key: 2,
            idle_count,
        }
    }

    #[test]
    fn hard_threshold_always_evicts() {
        assert!(default_eviction_policy(&ctx(150, 0)));
        assert!(!default_eviction_policy(&ctx(90, 0)));
    }

    #[test]
    fn soft_threshold_respects_min_idle() {
        // Past the soft threshold but the key is at its replenishment floor.
        assert!(!default_eviction_policy(&ctx(50, 2)));
        // Surplus idle instance past the soft threshold.
        assert!(default_eviction_policy(&ctx(50, 3)));
    }

    #[test]
    fn unset_thresholds_never_evict() {
        let ctx = EvictionContext {
            idle_time: Duration::from_secs(3600),
            min_evictable_idle: None,
            soft_min_evictable_idle: None,
            min_idle_per_key: 0,
            idle_count: 10,
        };
        assert!(!default_eviction_policy(&ctx));
    }
}
