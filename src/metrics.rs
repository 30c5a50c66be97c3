//! Counter snapshots and the swallowed-error history

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

/// Point-in-time view of the pool's counters.
///
/// Obtained from [`KeyedPool::metrics`](crate::KeyedPool::metrics). Counter
/// fields are cumulative since the pool was created; gauge fields reflect
/// the moment of the snapshot.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Successful borrows.
    pub borrowed: u64,

    /// Successful returns.
    pub returned: u64,

    /// Instances created by the factory.
    pub created: u64,

    /// Instances destroyed, for any reason.
    pub destroyed: u64,

    /// Instances destroyed by the background evictor.
    pub destroyed_by_evictor: u64,

    /// Instances destroyed because borrow-time validation failed.
    pub destroyed_by_borrow_validation: u64,

    /// Instances currently checked out.
    pub num_active: usize,

    /// Instances currently idle across all keys.
    pub num_idle: usize,

    /// Threads currently blocked in `borrow` (monitoring-only estimate).
    pub num_waiters: usize,

    /// Longest time any borrow spent waiting for an instance.
    pub max_borrow_wait: Duration,

    /// Mean time borrows spent waiting for an instance.
    pub mean_borrow_wait: Duration,

    /// Mean time returned instances spent checked out.
    pub mean_active_time: Duration,
}

/// Bounded history of errors the pool swallowed instead of surfacing
/// (destroy and passivate failures, evictor mishaps).
pub(crate) struct SwallowedLog {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl SwallowedLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub(crate) fn push(&self, context: &str, error: &dyn std::fmt::Display) {
        let entry = format!("{context}: {error}");
        warn!(context, %error, "swallowed pool error");
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Oldest-first copy of the retained history.
    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.entries.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_only_the_newest_entries() {
        let log = SwallowedLog::new(3);
        for i in 0..5 {
            log.push("destroy", &format!("boom {i}"));
        }
        let history = log.snapshot();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], "destroy: boom 2");
        assert_eq!(history[2], "destroy: boom 4");
    }
}
