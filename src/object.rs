//! Wrapper tracking the lifecycle of a single pooled instance

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Lifecycle tag of a pooled instance.
///
/// Transitions are compare-and-swap on an atomic; the wrapper itself never
/// takes a lock for a state change.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectState {
    /// In the idle deque, claimable by a borrower.
    Idle = 0,
    /// Checked out to a client.
    Allocated = 1,
    /// Under examination by the evictor.
    EvictionTest = 2,
    /// A borrower tried to claim it mid-eviction-test; it must go back to
    /// the head of the idle deque once the test completes.
    EvictionReturnToHead = 3,
    /// Destroyed, or queued for destruction.
    Invalid = 4,
}

impl ObjectState {
    #[cfg(test)]
    fn from_u8(raw: u8) -> ObjectState {
        match raw {
            0 => ObjectState::Idle,
            1 => ObjectState::Allocated,
            2 => ObjectState::EvictionTest,
            3 => ObjectState::EvictionReturnToHead,
            _ => ObjectState::Invalid,
        }
    }
}

/// One user object plus the pool-side bookkeeping for it.
///
/// The user object lives in a slot and is moved *out* whenever it is checked
/// out or handed to a factory method, so factory calls never observe a
/// pool-internal lock. Timestamps are millisecond offsets from `created_at`.
pub(crate) struct PooledObject<T> {
    id: u64,
    state: AtomicU8,
    created_at: Instant,
    last_borrow: AtomicU64,
    last_return: AtomicU64,
    slot: Mutex<Option<T>>,
}

impl<T> PooledObject<T> {
    pub(crate) fn new(id: u64, obj: T) -> Self {
        Self {
            id,
            state: AtomicU8::new(ObjectState::Idle as u8),
            created_at: Instant::now(),
            last_borrow: AtomicU64::new(0),
            last_return: AtomicU64::new(0),
            slot: Mutex::new(Some(obj)),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn now_millis(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    fn cas(&self, from: ObjectState, to: ObjectState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ObjectState {
        ObjectState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claim the instance for a borrower.
    ///
    /// Returns false when the instance is under eviction test; in that case
    /// the claim is deferred by flagging it for re-enqueue at the head.
    pub(crate) fn allocate(&self) -> bool {
        if self.cas(ObjectState::Idle, ObjectState::Allocated) {
            self.last_borrow.store(self.now_millis(), Ordering::Release);
            true
        } else {
            let _ = self.cas(ObjectState::EvictionTest, ObjectState::EvictionReturnToHead);
            false
        }
    }

    /// Release a checked-out instance back to idle.
    pub(crate) fn deallocate(&self) -> bool {
        if self.cas(ObjectState::Allocated, ObjectState::Idle) {
            self.last_return.store(self.now_millis(), Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Terminal transition; the instance will never be handed out again.
    /// Returns whether this call performed the transition, so racing destroy
    /// paths settle on a single winner.
    pub(crate) fn invalidate(&self) -> bool {
        self.state.swap(ObjectState::Invalid as u8, Ordering::AcqRel) != ObjectState::Invalid as u8
    }

    pub(crate) fn start_eviction_test(&self) -> bool {
        self.cas(ObjectState::Idle, ObjectState::EvictionTest)
    }

    /// Finish an eviction test. Returns false when the instance must be
    /// re-enqueued at the head of the idle deque because a borrower tried to
    /// claim it while the test ran.
    pub(crate) fn end_eviction_test(&self) -> bool {
        if self.cas(ObjectState::EvictionTest, ObjectState::Idle) {
            true
        } else if self.cas(ObjectState::EvictionReturnToHead, ObjectState::Idle) {
            false
        } else {
            // Invalidated underneath the test; nothing left to re-enqueue.
            true
        }
    }

    /// Time since the last borrow.
    pub(crate) fn active_time(&self) -> Duration {
        let now = self.now_millis();
        Duration::from_millis(now.saturating_sub(self.last_borrow.load(Ordering::Acquire)))
    }

    /// Time since the last return (or creation, for a never-borrowed
    /// instance).
    pub(crate) fn idle_time(&self) -> Duration {
        let now = self.now_millis();
        Duration::from_millis(now.saturating_sub(self.last_return.load(Ordering::Acquire)))
    }

    /// Ordering key for oldest-first sweeps: last-return offset ascending,
    /// creation id as the tie-break.
    pub(crate) fn sort_key(&self) -> (u64, u64) {
        (self.last_return.load(Ordering::Acquire), self.id)
    }

    pub(crate) fn take_slot(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub(crate) fn store_slot(&self, obj: T) {
        *self.slot.lock() = Some(obj);
    }
}
