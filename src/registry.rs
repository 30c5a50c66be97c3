//! Per-key sub-pools and the registry coordinating their lifetime

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::deque::FairDeque;
use crate::object::PooledObject;

/// Everything the pool holds for one key: the idle deque, the authoritative
/// map of live instances, and the two counters gating sub-pool reclamation.
///
/// Pure container; the engine owns all the logic.
pub(crate) struct SubPool<T> {
    pub(crate) idle: FairDeque<Arc<PooledObject<T>>>,
    pub(crate) live: DashMap<u64, Arc<PooledObject<T>>>,
    /// Instances created minus instances destroyed under this key.
    pub(crate) create_count: AtomicUsize,
    /// Engine operations currently holding a registration for this key.
    interested: AtomicUsize,
}

impl<T> SubPool<T> {
    fn new() -> Self {
        Self {
            idle: FairDeque::new(),
            live: DashMap::new(),
            create_count: AtomicUsize::new(0),
            interested: AtomicUsize::new(0),
        }
    }

    pub(crate) fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.live.len().saturating_sub(self.idle.len())
    }

    #[cfg(test)]
    pub(crate) fn interest(&self) -> usize {
        self.interested.load(Ordering::Acquire)
    }
}

/// Maps keys to sub-pools and keeps the parallel insertion-ordered key list
/// in step with the map. Both are only mutated together, under the write
/// lock.
pub(crate) struct KeyRegistry<K, T> {
    inner: RwLock<RegistryInner<K, T>>,
}

struct RegistryInner<K, T> {
    map: HashMap<K, Arc<SubPool<T>>>,
    keys: Vec<K>,
}

impl<K, T> KeyRegistry<K, T>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                map: HashMap::new(),
                keys: Vec::new(),
            }),
        }
    }

    /// Declare interest in `key`, creating its sub-pool on first use.
    ///
    /// Every call must be paired with a [`deregister`](Self::deregister);
    /// a sub-pool with registered interest is never reclaimed.
    pub(crate) fn register(&self, key: &K) -> Arc<SubPool<T>> {
        {
            let inner = self.inner.read();
            if let Some(sub) = inner.map.get(key) {
                sub.interested.fetch_add(1, Ordering::AcqRel);
                return Arc::clone(sub);
            }
        }
        let mut inner = self.inner.write();
        if let Some(sub) = inner.map.get(key) {
            sub.interested.fetch_add(1, Ordering::AcqRel);
            return Arc::clone(sub);
        }
        let sub = Arc::new(SubPool::new());
        sub.interested.fetch_add(1, Ordering::AcqRel);
        inner.map.insert(key.clone(), Arc::clone(&sub));
        inner.keys.push(key.clone());
        sub
    }

    /// Drop one registration for `key`, reclaiming the sub-pool when no
    /// interest and no live instances remain.
    pub(crate) fn deregister(&self, key: &K) {
        let Some(sub) = self.get(key) else {
            return;
        };
        let remaining = sub.interested.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 && sub.create_count.load(Ordering::Acquire) == 0 {
            let mut inner = self.inner.write();
            // Re-check under the write lock; another thread may have
            // registered in the meantime.
            if let Some(current) = inner.map.get(key) {
                if current.interested.load(Ordering::Acquire) == 0
                    && current.create_count.load(Ordering::Acquire) == 0
                {
                    inner.map.remove(key);
                    inner.keys.retain(|k| k != key);
                }
            }
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<SubPool<T>>> {
        self.inner.read().map.get(key).map(Arc::clone)
    }

    /// Snapshot of the current keys in insertion order.
    pub(crate) fn keys(&self) -> Vec<K> {
        self.inner.read().keys.clone()
    }

    /// Snapshot of every (key, sub-pool) pairing in insertion order.
    pub(crate) fn subpools(&self) -> Vec<(K, Arc<SubPool<T>>)> {
        let inner = self.inner.read();
        inner
            .keys
            .iter()
            .filter_map(|k| inner.map.get(k).map(|s| (k.clone(), Arc::clone(s))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_creates_and_deregister_reclaims() {
        let registry: KeyRegistry<String, ()> = KeyRegistry::new();
        let key = "alpha".to_string();

        let sub = registry.register(&key);
        assert_eq!(sub.interest(), 1);
        assert_eq!(registry.keys(), vec![key.clone()]);

        registry.deregister(&key);
        assert!(registry.get(&key).is_none());
        assert!(registry.keys().is_empty());
    }

    #[test]
    fn nested_registrations_share_one_subpool() {
        let registry: KeyRegistry<String, ()> = KeyRegistry::new();
        let key = "alpha".to_string();

        let first = registry.register(&key);
        let second = registry.register(&key);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.interest(), 2);

        registry.deregister(&key);
        assert!(registry.get(&key).is_some());
        registry.deregister(&key);
        assert!(registry.get(&key).is_none());
    }

    #[test]
    fn live_instances_pin_the_subpool() {
        let registry: KeyRegistry<String, ()> = KeyRegistry::new();
        let key = "alpha".to_string();

        let sub = registry.register(&key);
        sub.create_count.fetch_add(1, Ordering::AcqRel);
        registry.deregister(&key);
        assert!(registry.get(&key).is_some(), "sub-pool with live instances must survive");

        sub.create_count.fetch_sub(1, Ordering::AcqRel);
        let _ = registry.register(&key);
        registry.deregister(&key);
        assert!(registry.get(&key).is_none());
    }

    #[test]
    fn key_list_tracks_insertion_order() {
        let registry: KeyRegistry<&'static str, ()> = KeyRegistry::new();
        for key in ["c", "a", "b"] {
            let sub = registry.register(&key);
            sub.create_count.fetch_add(1, Ordering::AcqRel);
            registry.deregister(&key);
        }
        assert_eq!(registry.keys(), vec!["c", "a", "b"]);
        assert_eq!(
            registry.subpools().iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec!["c", "a", "b"]
        );
    }
}
