//! Pool configuration options

use std::time::Duration;

use crate::eviction::{EvictionPolicyFn, default_eviction_policy};

/// How many idle instances a single evictor run examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestsPerRun {
    /// Examine up to this many instances per run.
    Absolute(usize),
    /// Examine `ceil(total_idle / n)` instances per run.
    Fraction(u32),
}

impl TestsPerRun {
    pub(crate) fn quota(&self, total_idle: usize) -> usize {
        match *self {
            TestsPerRun::Absolute(n) => n.min(total_idle),
            TestsPerRun::Fraction(0) => 0,
            TestsPerRun::Fraction(n) => total_idle.div_ceil(n as usize),
        }
    }
}

/// Configuration for a [`KeyedPool`](crate::KeyedPool).
///
/// Held by value in the pool; the pool's behaviour is fixed once it is
/// constructed. `None` means "unlimited" for the capacity fields and
/// "indefinite" for `max_wait`.
///
/// # Examples
///
/// ```
/// use keyedpool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_max_total_per_key(4)
///     .with_max_total(16)
///     .with_max_wait(Duration::from_secs(5));
///
/// assert_eq!(config.max_total_per_key, Some(4));
/// assert_eq!(config.max_total, Some(16));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Cap on live instances (idle + allocated) per key.
    pub max_total_per_key: Option<usize>,

    /// Cap on live instances across all keys.
    pub max_total: Option<usize>,

    /// A returning instance is destroyed once this many are already idle
    /// under its key.
    pub max_idle_per_key: Option<usize>,

    /// The evictor replenishes each key up to this many idle instances
    /// (never above `max_idle_per_key`).
    pub min_idle_per_key: usize,

    /// Default wait for `borrow`; `None` waits indefinitely.
    pub max_wait: Option<Duration>,

    /// When false, an exhausted borrow fails immediately instead of
    /// blocking.
    pub block_when_exhausted: bool,

    /// Serve the most recently returned idle instance first.
    pub lifo: bool,

    /// Validate instances as they are borrowed.
    pub test_on_borrow: bool,

    /// Validate instances as they are returned.
    pub test_on_return: bool,

    /// Activate/validate/passivate instances during eviction sweeps.
    pub test_while_idle: bool,

    /// Eviction-test quota per run.
    pub tests_per_run: TestsPerRun,

    /// Idle time after which an instance is always evicted.
    pub min_evictable_idle: Option<Duration>,

    /// Idle time after which an instance is evicted if more than
    /// `min_idle_per_key` instances are idle under its key.
    pub soft_min_evictable_idle: Option<Duration>,

    /// Evictor period; `None` (or zero) disables background eviction.
    pub time_between_eviction_runs: Option<Duration>,

    /// Decides whether an examined instance should be evicted.
    pub eviction_policy: EvictionPolicyFn,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total_per_key: Some(8),
            max_total: None,
            max_idle_per_key: Some(8),
            min_idle_per_key: 0,
            max_wait: None,
            block_when_exhausted: true,
            lifo: true,
            test_on_borrow: false,
            test_on_return: false,
            test_while_idle: false,
            tests_per_run: TestsPerRun::Absolute(3),
            min_evictable_idle: Some(Duration::from_secs(30 * 60)),
            soft_min_evictable_idle: None,
            time_between_eviction_runs: None,
            eviction_policy: default_eviction_policy,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// The replenishment target, capped at `max_idle_per_key`.
    pub fn effective_min_idle(&self) -> usize {
        match self.max_idle_per_key {
            Some(max_idle) => self.min_idle_per_key.min(max_idle),
            None => self.min_idle_per_key,
        }
    }

    pub fn with_max_total_per_key(mut self, cap: usize) -> Self {
        self.max_total_per_key = Some(cap);
        self
    }

    pub fn with_max_total(mut self, cap: usize) -> Self {
        self.max_total = Some(cap);
        self
    }

    pub fn with_max_idle_per_key(mut self, cap: usize) -> Self {
        self.max_idle_per_key = Some(cap);
        self
    }

    pub fn with_min_idle_per_key(mut self, target: usize) -> Self {
        self.min_idle_per_key = target;
        self
    }

    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = Some(wait);
        self
    }

    pub fn with_block_when_exhausted(mut self, block: bool) -> Self {
        self.block_when_exhausted = block;
        self
    }

    pub fn with_lifo(mut self, lifo: bool) -> Self {
        self.lifo = lifo;
        self
    }

    pub fn with_test_on_borrow(mut self, test: bool) -> Self {
        self.test_on_borrow = test;
        self
    }

    pub fn with_test_on_return(mut self, test: bool) -> Self {
        self.test_on_return = test;
        self
    }

    pub fn with_test_while_idle(mut self, test: bool) -> Self {
        self.test_while_idle = test;
        self
    }

    pub fn with_tests_per_run(mut self, tests: TestsPerRun) -> Self {
        self.tests_per_run = tests;
        self
    }

    pub fn with_min_evictable_idle(mut self, idle: Duration) -> Self {
        self.min_evictable_idle = Some(idle);
        self
    }

    pub fn with_soft_min_evictable_idle(mut self, idle: Duration) -> Self {
        self.soft_min_evictable_idle = Some(idle);
        self
    }

    pub fn with_time_between_eviction_runs(mut self, period: Duration) -> Self {
        self.time_between_eviction_runs = Some(period);
        self
    }

    pub fn with_eviction_policy(mut self, policy: EvictionPolicyFn) -> Self {
        self.eviction_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PoolConfig::default();
        assert_eq!(config.max_total_per_key, Some(8));
        assert_eq!(config.max_total, None);
        assert_eq!(config.max_idle_per_key, Some(8));
        assert!(config.block_when_exhausted);
        assert!(config.lifo);
        assert_eq!(config.tests_per_run, TestsPerRun::Absolute(3));
        assert_eq!(config.time_between_eviction_runs, None);
    }

    #[test]
    fn min_idle_is_capped_by_max_idle() {
        let config = PoolConfig::new()
            .with_max_idle_per_key(2)
            .with_min_idle_per_key(5);
        assert_eq!(config.effective_min_idle(), 2);

        let mut unlimited = config.clone();
        unlimited.max_idle_per_key = None;
        assert_eq!(unlimited.effective_min_idle(), 5);
    }

    #[test]
    fn tests_per_run_quota() {
        assert_eq!(TestsPerRun::Absolute(3).quota(10), 3);
        assert_eq!(TestsPerRun::Absolute(3).quota(2), 2);
        assert_eq!(TestsPerRun::Fraction(2).quota(5), 3);
        assert_eq!(TestsPerRun::Fraction(3).quota(9), 3);
        assert_eq!(TestsPerRun::Fraction(2).quota(0), 0);
        assert_eq!(TestsPerRun::Fraction(0).quota(5), 0);
    }
}
