//! The keyed pool engine

use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::deque::Interrupted;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::{EvictionCursor, EvictorHandle, spawn_evictor};
use crate::factory::KeyedPoolFactory;
use crate::metrics::{PoolMetrics, SwallowedLog};
use crate::object::PooledObject;
use crate::registry::{KeyRegistry, SubPool};

const SWALLOWED_HISTORY_SIZE: usize = 10;

/// An object checked out of a [`KeyedPool`].
///
/// Dereferences to the pooled value. Dropping the guard returns the object
/// to its sub-pool; [`KeyedPool::return_object`] and
/// [`KeyedPool::invalidate_object`] do the same explicitly with error
/// reporting.
#[derive(Debug)]
pub struct Pooled<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    pool: Weak<PoolInner<K, T>>,
    pool_key: K,
    object_id: u64,
    object: Option<T>,
}

impl<K, T> Pooled<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    /// The key this object was borrowed under.
    pub fn key(&self) -> &K {
        &self.pool_key
    }

    /// Stable identity of the underlying pooled instance.
    pub fn instance_id(&self) -> u64 {
        self.object_id
    }
}

impl<K, T> Deref for Pooled<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        self.object.as_ref().expect("pooled object already consumed")
    }
}

impl<K, T> DerefMut for Pooled<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn deref_mut(&mut self) -> &mut T {
        self.object.as_mut().expect("pooled object already consumed")
    }
}

impl<K, T> Drop for Pooled<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn drop(&mut self) {
        if let Some(obj) = self.object.take() {
            if let Some(pool) = self.pool.upgrade() {
                if let Err(e) = pool.return_parts(&self.pool_key, self.object_id, obj) {
                    pool.swallowed.push("return on drop", &e);
                }
            }
        }
    }
}

/// A pool of reusable objects partitioned by key.
///
/// Each key owns an independent sub-pool of instances produced by the
/// factory. Borrowers take an idle instance or trigger creation, subject to
/// per-key and global capacity caps; when a sub-pool is exhausted, borrows
/// block in FIFO order (or fail fast, per configuration). An optional
/// background evictor retires stale idle instances and keeps a minimum
/// number warm.
///
/// Cloning the handle is cheap and shares the same pool.
pub struct KeyedPool<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    inner: Arc<PoolInner<K, T>>,
}

impl<K, T> Clone for KeyedPool<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct PoolInner<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    pub(crate) factory: Box<dyn KeyedPoolFactory<K, T>>,
    pub(crate) config: PoolConfig,
    pub(crate) registry: KeyRegistry<K, T>,
    /// Live instances across all keys, including those still being created.
    /// May transiently overshoot `max_total`; `create` rolls the overshoot
    /// back.
    pub(crate) num_total: AtomicUsize,
    next_object_id: AtomicU64,
    created_count: AtomicU64,
    destroyed_count: AtomicU64,
    pub(crate) destroyed_by_evictor_count: AtomicU64,
    destroyed_by_borrow_validation_count: AtomicU64,
    borrowed_count: AtomicU64,
    returned_count: AtomicU64,
    borrow_wait_total_ms: AtomicU64,
    borrow_wait_max_ms: AtomicU64,
    active_time_total_ms: AtomicU64,
    closed: AtomicBool,
    close_lock: Mutex<()>,
    pub(crate) eviction: Mutex<EvictionCursor<K, T>>,
    pub(crate) swallowed: SwallowedLog,
    evictor: Mutex<Option<EvictorHandle>>,
}

impl<K, T> KeyedPool<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Create a pool around `factory`. When the configuration enables
    /// background eviction, the evictor thread starts immediately.
    pub fn new<F>(factory: F, config: PoolConfig) -> Self
    where
        F: KeyedPoolFactory<K, T> + 'static,
    {
        let inner = Arc::new(PoolInner {
            factory: Box::new(factory),
            config,
            registry: KeyRegistry::new(),
            num_total: AtomicUsize::new(0),
            next_object_id: AtomicU64::new(0),
            created_count: AtomicU64::new(0),
            destroyed_count: AtomicU64::new(0),
            destroyed_by_evictor_count: AtomicU64::new(0),
            destroyed_by_borrow_validation_count: AtomicU64::new(0),
            borrowed_count: AtomicU64::new(0),
            returned_count: AtomicU64::new(0),
            borrow_wait_total_ms: AtomicU64::new(0),
            borrow_wait_max_ms: AtomicU64::new(0),
            active_time_total_ms: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            close_lock: Mutex::new(()),
            eviction: Mutex::new(EvictionCursor::new()),
            swallowed: SwallowedLog::new(SWALLOWED_HISTORY_SIZE),
            evictor: Mutex::new(None),
        });
        let period = inner.config.time_between_eviction_runs;
        if let Some(period) = period.filter(|p| !p.is_zero()) {
            *inner.evictor.lock() = Some(spawn_evictor(&inner, period));
        }
        Self { inner }
    }

    /// Borrow an object for `key`, waiting up to the configured `max_wait`.
    pub fn borrow(&self, key: &K) -> PoolResult<Pooled<K, T>> {
        self.borrow_timeout(key, self.inner.config.max_wait)
    }

    /// Borrow an object for `key` with an explicit wait limit; `None` waits
    /// indefinitely. The limit only applies when the pool is configured to
    /// block on exhaustion.
    pub fn borrow_timeout(&self, key: &K, max_wait: Option<Duration>) -> PoolResult<Pooled<K, T>> {
        let (id, obj) = self.inner.borrow_parts(key, max_wait)?;
        Ok(Pooled {
            pool: Arc::downgrade(&self.inner),
            pool_key: key.clone(),
            object_id: id,
            object: Some(obj),
        })
    }

    /// Return a borrowed object to its sub-pool.
    pub fn return_object(&self, mut pooled: Pooled<K, T>) -> PoolResult<()> {
        let obj = pooled.object.take().expect("pooled object already consumed");
        self.inner.return_parts(&pooled.pool_key, pooled.object_id, obj)
    }

    /// Destroy a borrowed object instead of returning it. Never consults
    /// capacity limits.
    pub fn invalidate_object(&self, mut pooled: Pooled<K, T>) -> PoolResult<()> {
        let obj = pooled.object.take().expect("pooled object already consumed");
        self.inner.invalidate_parts(&pooled.pool_key, pooled.object_id, obj)
    }

    /// Create one instance for `key`, passivate it and add it to the idle
    /// set. Useful for pre-loading a sub-pool.
    pub fn add_object(&self, key: &K) -> PoolResult<()> {
        self.inner.add_object(key)
    }

    /// Bring the sub-pool for `key` up to the configured minimum idle count.
    pub fn prepare_pool(&self, key: &K) -> PoolResult<()> {
        self.inner.assert_open()?;
        if self.inner.config.effective_min_idle() == 0 {
            return Ok(());
        }
        self.inner.ensure_min_idle_key(key)
    }

    /// Destroy every idle instance in every sub-pool. Checked-out instances
    /// are unaffected.
    pub fn clear(&self) {
        self.inner.clear_all();
    }

    /// Destroy every idle instance under `key`.
    pub fn clear_key(&self, key: &K) {
        self.inner.clear_key(key);
    }

    /// Destroy the oldest idle instances across all keys to free capacity.
    pub fn clear_oldest(&self) {
        self.inner.clear_oldest();
    }

    /// Close the pool: stop the evictor, destroy all idle instances and wake
    /// every blocked borrower. Subsequent borrows fail with
    /// [`PoolError::Closed`]; returns and invalidations keep working and
    /// destroy their object on the spot.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Instances currently checked out, across all keys.
    pub fn num_active(&self) -> usize {
        self.inner.num_active()
    }

    /// Instances currently checked out under `key`.
    pub fn num_active_key(&self, key: &K) -> usize {
        self.inner
            .registry
            .get(key)
            .map_or(0, |sub| sub.active_count())
    }

    /// Idle instances across all keys.
    pub fn num_idle(&self) -> usize {
        self.inner.num_idle()
    }

    /// Idle instances under `key`.
    pub fn num_idle_key(&self, key: &K) -> usize {
        self.inner.registry.get(key).map_or(0, |sub| sub.idle_count())
    }

    /// Estimate of threads blocked in `borrow`, summed across keys. A thread
    /// moving between sub-pools may be counted twice; monitoring only.
    pub fn num_waiters(&self) -> usize {
        self.inner.num_waiters()
    }

    /// Estimate of threads blocked in `borrow` for `key`; monitoring only.
    pub fn num_waiters_key(&self, key: &K) -> usize {
        if !self.inner.config.block_when_exhausted {
            return 0;
        }
        self.inner
            .registry
            .get(key)
            .map_or(0, |sub| sub.idle.take_queue_length())
    }

    /// Snapshot of the keys with a current sub-pool, in insertion order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.registry.keys()
    }

    /// Snapshot of the pool's counters.
    pub fn metrics(&self) -> PoolMetrics {
        self.inner.metrics()
    }

    /// Recent errors the pool swallowed (destroy/passivate failures and
    /// evictor mishaps), oldest first.
    pub fn swallowed_errors(&self) -> Vec<String> {
        self.inner.swallowed.snapshot()
    }
}

impl<K, T> PoolInner<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn assert_open(&self) -> PoolResult<()> {
        if self.is_closed() {
            Err(PoolError::Closed)
        } else {
            Ok(())
        }
    }

    fn borrow_parts(&self, key: &K, max_wait: Option<Duration>) -> PoolResult<(u64, T)> {
        self.assert_open()?;
        let block = self.config.block_when_exhausted;
        let sub = self.registry.register(key);
        let result = self.borrow_loop(key, &sub, block, max_wait);
        self.registry.deregister(key);
        result
    }

    fn borrow_loop(
        &self,
        key: &K,
        sub: &Arc<SubPool<T>>,
        block: bool,
        max_wait: Option<Duration>,
    ) -> PoolResult<(u64, T)> {
        let mut waited = Duration::ZERO;
        loop {
            let mut created = false;
            let mut candidate = sub.idle.poll_first();
            if candidate.is_none() {
                candidate = self.create(key, sub)?;
                created = candidate.is_some();
            }
            if candidate.is_none() {
                if !block {
                    return Err(PoolError::Exhausted);
                }
                // A close racing this borrow has already interrupted its
                // waiters; do not park after the fact.
                self.assert_open()?;
                let started = Instant::now();
                let polled = match max_wait {
                    Some(limit) => sub.idle.poll_first_timeout(limit),
                    None => sub.idle.take_first().map(Some),
                };
                waited += started.elapsed();
                candidate = match polled {
                    Ok(Some(wrapper)) => Some(wrapper),
                    Ok(None) => return Err(PoolError::Exhausted),
                    Err(Interrupted) => return Err(PoolError::Closed),
                };
            }
            let Some(wrapper) = candidate else {
                continue;
            };
            if !wrapper.allocate() {
                // Lost a race with the evictor or an invalidation; the
                // wrapper re-enters the idle set on its own if still usable.
                continue;
            }
            let mut obj = wrapper
                .take_slot()
                .expect("allocated instance has no object in its slot");

            if let Err(e) = self.factory.activate(key, &mut obj) {
                self.destroy(key, &wrapper, true, Some(obj));
                if created {
                    return Err(PoolError::ActivationFailed(e));
                }
                continue;
            }
            if self.config.test_on_borrow && !self.factory.validate(key, &obj) {
                self.destroy(key, &wrapper, true, Some(obj));
                self.destroyed_by_borrow_validation_count
                    .fetch_add(1, Ordering::Relaxed);
                if created {
                    return Err(PoolError::ValidationFailed);
                }
                continue;
            }

            self.record_borrow(waited);
            return Ok((wrapper.id(), obj));
        }
    }

    /// Create one instance for `key`, enforcing the global and per-key caps.
    ///
    /// `Ok(None)` means capacity denied the creation and the caller should
    /// wait or fail; factory failures roll back both counters before
    /// propagating.
    fn create(&self, key: &K, sub: &Arc<SubPool<T>>) -> PoolResult<Option<Arc<PooledObject<T>>>> {
        loop {
            let new_total = self.num_total.fetch_add(1, Ordering::SeqCst) + 1;
            match self.config.max_total {
                Some(cap) if new_total > cap => {
                    self.num_total.fetch_sub(1, Ordering::SeqCst);
                    if self.num_idle() == 0 {
                        return Ok(None);
                    }
                    self.clear_oldest();
                }
                _ => break,
            }
        }

        let new_count = sub.create_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(cap) = self.config.max_total_per_key {
            if new_count > cap {
                sub.create_count.fetch_sub(1, Ordering::SeqCst);
                self.num_total.fetch_sub(1, Ordering::SeqCst);
                return Ok(None);
            }
        }

        let obj = match self.factory.make(key) {
            Ok(obj) => obj,
            Err(e) => {
                sub.create_count.fetch_sub(1, Ordering::SeqCst);
                self.num_total.fetch_sub(1, Ordering::SeqCst);
                return Err(PoolError::MakeFailed(e));
            }
        };
        let id = self.next_object_id.fetch_add(1, Ordering::Relaxed);
        let wrapper = Arc::new(PooledObject::new(id, obj));
        self.created_count.fetch_add(1, Ordering::Relaxed);
        sub.live.insert(id, Arc::clone(&wrapper));
        debug!(id, "created pooled instance");
        Ok(Some(wrapper))
    }

    /// Destroy an instance. Without `always`, only instances still sitting
    /// idle are destroyed (the quota accounting of `clear_oldest` relies on
    /// that). `taken` carries the user object when the caller already holds
    /// it; otherwise it is pulled from the wrapper's slot.
    pub(crate) fn destroy(
        &self,
        key: &K,
        wrapper: &Arc<PooledObject<T>>,
        always: bool,
        taken: Option<T>,
    ) -> bool {
        let sub = self.registry.register(key);
        let was_idle = sub.idle.remove_where(|w| Arc::ptr_eq(w, wrapper));
        // The invalidate transition settles racing destroy paths on one
        // winner, keeping every counter decremented exactly once.
        let destroyed = if (was_idle || always) && wrapper.invalidate() {
            sub.live.remove(&wrapper.id());
            let obj = taken.or_else(|| wrapper.take_slot());
            if let Some(obj) = obj {
                if let Err(e) = self.factory.destroy(key, obj) {
                    self.swallowed.push("factory destroy", &e);
                }
            }
            sub.create_count.fetch_sub(1, Ordering::SeqCst);
            self.num_total.fetch_sub(1, Ordering::SeqCst);
            self.destroyed_count.fetch_add(1, Ordering::Relaxed);
            debug!(id = wrapper.id(), "destroyed pooled instance");
            true
        } else {
            false
        };
        self.registry.deregister(key);
        destroyed
    }

    fn return_parts(&self, key: &K, id: u64, mut obj: T) -> PoolResult<()> {
        let sub = self.registry.get(key).ok_or(PoolError::NotOwned)?;
        let wrapper = sub
            .live
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PoolError::NotOwned)?;
        let active_time = wrapper.active_time();

        if self.config.test_on_return && !self.factory.validate(key, &obj) {
            self.destroy(key, &wrapper, true, Some(obj));
            self.record_return(active_time);
            return Ok(());
        }
        if let Err(e) = self.factory.passivate(key, &mut obj) {
            self.swallowed.push("passivate on return", &e);
            self.destroy(key, &wrapper, true, Some(obj));
            self.record_return(active_time);
            return Ok(());
        }

        wrapper.store_slot(obj);
        if !wrapper.deallocate() {
            wrapper.take_slot();
            return Err(PoolError::AlreadyReturned);
        }

        let at_idle_cap = self
            .config
            .max_idle_per_key
            .is_some_and(|cap| sub.idle_count() >= cap);
        if self.is_closed() || at_idle_cap {
            self.destroy(key, &wrapper, true, None);
        } else if self.config.lifo {
            sub.idle.offer_first(wrapper);
        } else {
            sub.idle.offer_last(wrapper);
        }

        if self.has_borrow_waiters() {
            self.reuse_capacity();
        }
        self.record_return(active_time);
        Ok(())
    }

    fn invalidate_parts(&self, key: &K, id: u64, obj: T) -> PoolResult<()> {
        let sub = self.registry.get(key).ok_or(PoolError::NotOwned)?;
        let wrapper = sub
            .live
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PoolError::NotOwned)?;
        self.destroy(key, &wrapper, true, Some(obj));
        Ok(())
    }

    pub(crate) fn add_object(&self, key: &K) -> PoolResult<()> {
        self.assert_open()?;
        let sub = self.registry.register(key);
        let result = match self.create(key, &sub) {
            Ok(Some(wrapper)) => {
                self.passivate_and_enqueue(key, &sub, wrapper);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        self.registry.deregister(key);
        result
    }

    /// Passivate a freshly created instance and place it in the idle set.
    fn passivate_and_enqueue(&self, key: &K, sub: &Arc<SubPool<T>>, wrapper: Arc<PooledObject<T>>) {
        let Some(mut obj) = wrapper.take_slot() else {
            return;
        };
        if let Err(e) = self.factory.passivate(key, &mut obj) {
            self.swallowed.push("passivate on add", &e);
            self.destroy(key, &wrapper, true, Some(obj));
            return;
        }
        wrapper.store_slot(obj);
        if self.config.lifo {
            sub.idle.offer_first(wrapper);
        } else {
            sub.idle.offer_last(wrapper);
        }
    }

    fn clear_all(&self) {
        for key in self.registry.keys() {
            self.clear_key(&key);
        }
    }

    fn clear_key(&self, key: &K) {
        let sub = self.registry.register(key);
        for wrapper in sub.idle.drain() {
            self.destroy(key, &wrapper, true, None);
        }
        self.registry.deregister(key);
    }

    /// Destroy the oldest idle instances across all keys: 15% of the idle
    /// population, plus one. Only successful destructions count toward the
    /// quota.
    pub(crate) fn clear_oldest(&self) {
        let mut idle: Vec<(K, Arc<PooledObject<T>>)> = Vec::new();
        for (key, sub) in self.registry.subpools() {
            for wrapper in sub.idle.snapshot() {
                idle.push((key.clone(), wrapper));
            }
        }
        idle.sort_by_key(|(_, wrapper)| wrapper.sort_key());

        let mut quota = idle.len() * 15 / 100 + 1;
        for (key, wrapper) in idle {
            if quota == 0 {
                break;
            }
            if self.destroy(&key, &wrapper, false, None) {
                quota -= 1;
            }
        }
    }

    fn has_borrow_waiters(&self) -> bool {
        self.registry
            .subpools()
            .iter()
            .any(|(_, sub)| sub.idle.has_take_waiters())
    }

    /// Hand freed capacity to the sub-pool with the most blocked borrowers.
    ///
    /// Keeps waiters under one key live when capacity is released under
    /// another. Best-effort: concurrent mutation can make the selection
    /// stale, in which case some later return repeats the attempt.
    fn reuse_capacity(&self) {
        let mut most_loaded: Option<(K, usize)> = None;
        for (key, sub) in self.registry.subpools() {
            let queue_length = sub.idle.take_queue_length();
            let under_cap = self
                .config
                .max_total_per_key
                .is_none_or(|cap| sub.active_count() < cap);
            if under_cap && queue_length > most_loaded.as_ref().map_or(0, |(_, len)| *len) {
                most_loaded = Some((key, queue_length));
            }
        }

        if let Some((key, _)) = most_loaded {
            let sub = self.registry.register(&key);
            match self.create(&key, &sub) {
                Ok(Some(wrapper)) => self.passivate_and_enqueue(&key, &sub, wrapper),
                Ok(None) => {}
                Err(e) => self.swallowed.push("create for waiting borrower", &e),
            }
            self.registry.deregister(&key);
        }
    }

    fn close(&self) {
        if self.is_closed() {
            return;
        }
        let _guard = self.close_lock.lock();
        if self.is_closed() {
            return;
        }
        // The evictor must stop first; its sweeps refuse closed pools.
        if let Some(handle) = self.evictor.lock().take() {
            handle.stop();
        }
        self.closed.store(true, Ordering::SeqCst);
        self.clear_all();
        for (_, sub) in self.registry.subpools() {
            sub.idle.interrupt_take_waiters();
        }
        // Waiters have drained their registrations; reap what remains.
        self.clear_all();
        info!("keyed pool closed");
    }

    pub(crate) fn num_idle(&self) -> usize {
        self.registry
            .subpools()
            .iter()
            .map(|(_, sub)| sub.idle_count())
            .sum()
    }

    fn num_active(&self) -> usize {
        self.num_total.load(Ordering::SeqCst).saturating_sub(self.num_idle())
    }

    fn num_waiters(&self) -> usize {
        if !self.config.block_when_exhausted {
            return 0;
        }
        self.registry
            .subpools()
            .iter()
            .map(|(_, sub)| sub.idle.take_queue_length())
            .sum()
    }

    fn record_borrow(&self, waited: Duration) {
        self.borrowed_count.fetch_add(1, Ordering::Relaxed);
        let waited_ms = waited.as_millis() as u64;
        self.borrow_wait_total_ms.fetch_add(waited_ms, Ordering::Relaxed);
        self.borrow_wait_max_ms.fetch_max(waited_ms, Ordering::Relaxed);
    }

    fn record_return(&self, active_time: Duration) {
        self.returned_count.fetch_add(1, Ordering::Relaxed);
        self.active_time_total_ms
            .fetch_add(active_time.as_millis() as u64, Ordering::Relaxed);
    }

    fn metrics(&self) -> PoolMetrics {
        let borrowed = self.borrowed_count.load(Ordering::Relaxed);
        let returned = self.returned_count.load(Ordering::Relaxed);
        let mean_borrow_wait = if borrowed == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(self.borrow_wait_total_ms.load(Ordering::Relaxed) / borrowed)
        };
        let mean_active_time = if returned == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(self.active_time_total_ms.load(Ordering::Relaxed) / returned)
        };
        PoolMetrics {
            borrowed,
            returned,
            created: self.created_count.load(Ordering::Relaxed),
            destroyed: self.destroyed_count.load(Ordering::Relaxed),
            destroyed_by_evictor: self.destroyed_by_evictor_count.load(Ordering::Relaxed),
            destroyed_by_borrow_validation: self
                .destroyed_by_borrow_validation_count
                .load(Ordering::Relaxed),
            num_active: self.num_active(),
            num_idle: self.num_idle(),
            num_waiters: self.num_waiters(),
            max_borrow_wait: Duration::from_millis(self.borrow_wait_max_ms.load(Ordering::Relaxed)),
            mean_borrow_wait,
            mean_active_time,
        }
    }
}
