use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::debug;

/// Marks which alert sources are currently being handled.
///
/// The in-memory store only covers one warm Lambda instance: a cold start or
/// a concurrent instance starts with nothing marked.
pub trait DebounceStore: Send + Sync {
    /// Marks `key` as in flight. Returns false if it already was.
    fn try_acquire(&self, key: &str) -> bool;

    fn release(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    in_flight: Mutex<HashSet<String>>,
}

impl InMemoryStore {
    fn entries(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.entries().contains(key)
    }
}

impl DebounceStore for InMemoryStore {
    fn try_acquire(&self, key: &str) -> bool {
        self.entries().insert(key.to_string())
    }

    fn release(&self, key: &str) {
        self.entries().remove(key);
    }
}

type PendingReleases = Arc<Mutex<HashMap<String, AbortHandle>>>;

fn lock_pending(pending: &PendingReleases) -> MutexGuard<'_, HashMap<String, AbortHandle>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drops repeated alerts from one source until a cool-down has passed.
///
/// `should_process` is a plain synchronous check-and-set so overlapping
/// invocations on the same instance cannot both get through.
pub struct SourceDebouncer {
    store: Arc<dyn DebounceStore>,
    cool_down: Duration,
    pending: PendingReleases,
}

impl SourceDebouncer {
    pub fn new(store: Arc<dyn DebounceStore>, cool_down: Duration) -> Self {
        Self {
            store,
            cool_down,
            pending: Arc::default(),
        }
    }

    pub fn in_memory(cool_down: Duration) -> Self {
        Self::new(Arc::new(InMemoryStore::default()), cool_down)
    }

    pub fn should_process(&self, key: &str) -> bool {
        self.store.try_acquire(key)
    }

    /// Releases `key` once the cool-down has elapsed, without waiting for it.
    pub fn release_after_cool_down(&self, key: &str) {
        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        let cool_down = self.cool_down;
        let task_key = key.to_string();

        // held across the spawn so the task cannot remove its entry before it is inserted
        let mut releases = lock_pending(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(cool_down).await;
            lock_pending(&pending).remove(&task_key);
            store.release(&task_key);
            debug!("cool-down over for {}", task_key);
        });
        if let Some(previous) = releases.insert(key.to_string(), handle.abort_handle()) {
            previous.abort();
        }
    }

    /// Releases `key` right away and cancels any scheduled release.
    pub fn release_now(&self, key: &str) {
        if let Some(scheduled) = lock_pending(&self.pending).remove(key) {
            scheduled.abort();
        }
        self.store.release(key);
    }

    pub fn pending_releases(&self) -> usize {
        lock_pending(&self.pending).len()
    }
}
