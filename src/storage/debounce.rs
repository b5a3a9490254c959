//! Debounced persistence: callers mark entities dirty cheaply and often (on
//! every proxy-health update, every pattern-use), and a background timer
//! coalesces those marks into a single flush per window, the way the
//! engine's other self-correcting loops prefer a short delay over persisting
//! on every event (compare the exponential backoff in the dead-letter retry
//! path).

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::interval;

/// Tracks keys that need to be flushed to a backing store, coalescing bursts
/// of writes into a periodic batch.
pub struct DirtyTracker<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    dirty: Arc<Mutex<HashSet<K>>>,
}

impl<K> DirtyTracker<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            dirty: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn mark_dirty(&self, key: K) {
        self.dirty.lock().await.insert(key);
    }

    /// Drain the current dirty set, leaving it empty for the next window.
    pub async fn drain(&self) -> Vec<K> {
        let mut dirty = self.dirty.lock().await;
        dirty.drain().collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.dirty.lock().await.is_empty()
    }
}

impl<K> Default for DirtyTracker<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns a background task that periodically drains a [`DirtyTracker`] and
/// invokes `flush` with the batch of dirty keys. Returns a handle; dropping
/// the returned [`DebounceHandle`] stops the loop.
pub fn spawn_debounced_flush<K, F, Fut>(
    tracker: Arc<DirtyTracker<K>>,
    period: Duration,
    mut flush: F,
) -> DebounceHandle
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: FnMut(Vec<K>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let batch = tracker.drain().await;
                    if !batch.is_empty() {
                        flush(batch).await;
                    }
                }
                _ = stop_rx.recv() => break,
            }
        }
    });

    DebounceHandle {
        stop_tx,
        task: Some(handle),
    }
}

pub struct DebounceHandle {
    stop_tx: mpsc::Sender<()>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl DebounceHandle {
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
