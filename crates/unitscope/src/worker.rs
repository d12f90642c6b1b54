//! Worker identity and worker-keyed storage.
//!
//! Every piece of per-worker state in this crate lives in a [`WorkerMap`]
//! keyed by [`WorkerId`]. A worker only ever touches its own key, so the map's
//! mutex guards the table structure and nothing else; it never serialises
//! work between workers.
//!
//! # Examples
//!
//! ```
//! use unitscope::worker::{WorkerId, WorkerMap};
//!
//! let map = WorkerMap::new();
//! let worker = WorkerId::new(7);
//! assert!(map.insert(worker, "session").is_none());
//! assert_eq!(map.get(worker), Some("session"));
//! assert_eq!(map.remove(worker), Some("session"));
//! assert!(map.is_empty());
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use hashbrown::HashMap;

/// First identifier handed out to threads. Kept well above the small values
/// tests and custom runners tend to pick for explicit identifiers.
const FIRST_THREAD_WORKER: u64 = 1 << 32;

static NEXT_THREAD_WORKER: AtomicU64 = AtomicU64::new(FIRST_THREAD_WORKER);

thread_local! {
    static CURRENT_WORKER: Cell<Option<WorkerId>> = const { Cell::new(None) };
}

/// Identity of one concurrent worker.
///
/// Threads obtain a stable identity through [`WorkerId::current`]. Runners
/// that multiplex several logical workers onto one thread construct explicit
/// identities with [`WorkerId::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::From)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Wrap an explicit identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Identity of the calling thread, assigned on first use.
    ///
    /// # Examples
    ///
    /// ```
    /// use unitscope::worker::WorkerId;
    ///
    /// let here = WorkerId::current();
    /// assert_eq!(here, WorkerId::current());
    /// let there = std::thread::spawn(WorkerId::current).join().unwrap();
    /// assert_ne!(here, there);
    /// ```
    #[must_use]
    pub fn current() -> Self {
        CURRENT_WORKER.with(|slot| {
            slot.get().unwrap_or_else(|| {
                let id = Self(NEXT_THREAD_WORKER.fetch_add(1, Ordering::Relaxed));
                slot.set(Some(id));
                id
            })
        })
    }

    /// Raw numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map from [`WorkerId`] to a worker-exclusive value.
pub struct WorkerMap<T> {
    slots: Mutex<HashMap<WorkerId, T>>,
}

impl<T> WorkerMap<T> {
    /// Construct an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<WorkerId, T>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store `value` for `worker`, returning the previous value if any.
    pub fn insert(&self, worker: WorkerId, value: T) -> Option<T> {
        self.lock().insert(worker, value)
    }

    /// Remove and return the value stored for `worker`.
    pub fn remove(&self, worker: WorkerId) -> Option<T> {
        self.lock().remove(&worker)
    }

    /// Whether `worker` currently has an entry.
    #[must_use]
    pub fn contains(&self, worker: WorkerId) -> bool {
        self.lock().contains_key(&worker)
    }

    /// Clone the value stored for `worker`.
    #[must_use]
    pub fn get(&self, worker: WorkerId) -> Option<T>
    where
        T: Clone,
    {
        self.lock().get(&worker).cloned()
    }

    /// Apply `update` to the worker's value, inserting `init()` first when the
    /// worker has no entry.
    ///
    /// The map stays locked while `update` runs, so `update` must not call
    /// back into the same map.
    pub fn with_entry<R>(
        &self,
        worker: WorkerId,
        init: impl FnOnce() -> T,
        update: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut slots = self.lock();
        update(slots.entry(worker).or_insert_with(init))
    }

    /// Apply `update` to the worker's value if one exists.
    pub fn with_mut<R>(&self, worker: WorkerId, update: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.lock().get_mut(&worker).map(update)
    }

    /// Number of workers with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no worker has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for WorkerMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for WorkerMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut workers: Vec<WorkerId> = self.lock().keys().copied().collect();
        workers.sort_unstable();
        f.debug_struct("WorkerMap").field("workers", &workers).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn current_is_stable_within_a_thread() {
        assert_eq!(WorkerId::current(), WorkerId::current());
    }

    #[test]
    fn threads_receive_distinct_identities() {
        let handles: Vec<_> = (0..4).map(|_| thread::spawn(WorkerId::current)).collect();
        let mut ids: Vec<WorkerId> = handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .collect();
        ids.push(WorkerId::current());
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| id.get() >= FIRST_THREAD_WORKER));
    }

    #[test]
    fn with_entry_initialises_once() {
        let map = WorkerMap::new();
        let worker = WorkerId::new(1);
        map.with_entry(worker, Vec::new, |list| list.push("a"));
        map.with_entry(worker, || vec!["never"], |list| list.push("b"));
        assert_eq!(map.get(worker), Some(vec!["a", "b"]));
    }

    #[test]
    fn with_mut_skips_missing_workers() {
        let map: WorkerMap<u8> = WorkerMap::new();
        assert_eq!(map.with_mut(WorkerId::new(3), |value| *value + 1), None);
    }

    #[test]
    fn entries_stay_isolated_between_workers() {
        let map = Arc::new(WorkerMap::new());
        let handles: Vec<_> = (0..8u64)
            .map(|n| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    let worker = WorkerId::current();
                    map.insert(worker, n);
                    let seen = map.get(worker);
                    map.remove(worker);
                    seen
                })
            })
            .collect();
        let mut seen: Vec<u64> = handles
            .into_iter()
            .filter_map(|handle| handle.join().ok().flatten())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        assert!(map.is_empty());
    }

    #[test]
    fn debug_lists_workers_in_order() {
        let map = WorkerMap::new();
        map.insert(WorkerId::new(9), ());
        map.insert(WorkerId::new(2), ());
        assert_eq!(format!("{map:?}"), "WorkerMap { workers: [WorkerId(2), WorkerId(9)] }");
    }
}
