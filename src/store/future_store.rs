//! # Future store: tracks spawned futures until they finish.
//!
//! [`FutureStore`] spawns futures onto the tokio runtime and keeps a handle to each one
//! while it runs, so callers can wait for or cancel everything in bulk.
//!
//! ## Architecture
//! ```text
//! add(fut)
//!   ├─► insert Entry { cancel, done } under a fresh id
//!   ├─► tokio::spawn(select! { cancel.cancelled() → None, fut → Some(out) })
//!   │        └─ Untrack guard (dropped on completion, panic or abort):
//!   │              remove entry ──► done.cancel()
//!   └─► Tracked<T>  (await → Ok(out) | Err(Cancelled); task panics resume here)
//!
//! wait(wait_new)
//!   ├─► snapshot every entry's `done` token ──► join all
//!   └─► wait_new && store non-empty → next pass (bounded by Config::wait_passes)
//!
//! clear()
//!   └─► drain entries ──► cancel every task (cooperative, at its next await point)
//! ```
//!
//! ## Rules
//! - The entry exists before the spawned task can run; it is gone once the task ends.
//! - Dropping a [`Tracked`] detaches the task; it stays tracked until it finishes.
//! - The store lock is never held across `.await` or `tokio::spawn`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::HookError;

/// Handle to a tracked task.
struct Entry {
    /// Stops the task at its next await point.
    cancel: CancellationToken,
    /// Cancelled once the task has ended, whatever the reason.
    done: CancellationToken,
}

struct Inner {
    entries: Mutex<HashMap<u64, Entry>>,
    next_id: AtomicU64,
    wait_passes: Option<usize>,
}

/// Removes the entry when the spawned task ends.
struct Untrack {
    inner: Arc<Inner>,
    id: u64,
    done: CancellationToken,
}

impl Drop for Untrack {
    fn drop(&mut self) {
        self.inner.entries.lock().remove(&self.id);
        self.done.cancel();
    }
}

/// Store of running futures. Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct FutureStore {
    inner: Arc<Inner>,
}

impl FutureStore {
    /// Creates an empty store with unbounded `wait(true)`.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Creates an empty store using [`Config::wait_passes`].
    pub fn with_config(cfg: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                wait_passes: cfg.wait_pass_limit(),
            }),
        }
    }

    /// Spawns `fut` and tracks it until it finishes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add<F>(&self, fut: F) -> Tracked<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();

        self.inner.entries.lock().insert(
            id,
            Entry {
                cancel: cancel.clone(),
                done: done.clone(),
            },
        );

        let guard = Untrack {
            inner: Arc::clone(&self.inner),
            id,
            done,
        };
        let join = tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                out = fut => Some(out),
            }
        });

        Tracked { join }
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// True if no task is running.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Waits until every task present at the call has ended.
    ///
    /// With `wait_new`, keeps waiting for tasks added meanwhile until the store is empty,
    /// or until [`Config::wait_passes`] passes have been made.
    pub async fn wait(&self, wait_new: bool) {
        let mut passes = 0usize;
        loop {
            let done: Vec<CancellationToken> = self
                .inner
                .entries
                .lock()
                .values()
                .map(|entry| entry.done.clone())
                .collect();
            if done.is_empty() {
                return;
            }

            join_all(done.iter().map(CancellationToken::cancelled)).await;
            passes += 1;

            if !wait_new {
                return;
            }
            if self.inner.wait_passes.is_some_and(|limit| passes >= limit) {
                let remaining = self.len();
                if remaining > 0 {
                    tracing::warn!(passes, remaining, "future store wait stopped at pass limit");
                }
                return;
            }
        }
    }

    /// Cancels every tracked task and empties the store.
    ///
    /// Their [`Tracked`] handles resolve with [`HookError::Cancelled`].
    pub fn clear(&self) {
        let drained: Vec<Entry> = {
            let mut entries = self.inner.entries.lock();
            entries.drain().map(|(_, entry)| entry).collect()
        };
        if !drained.is_empty() {
            tracing::debug!(tasks = drained.len(), "cancelling tracked futures");
        }
        for entry in drained {
            entry.cancel.cancel();
        }
    }
}

impl Default for FutureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FutureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureStore")
            .field("len", &self.len())
            .field("wait_passes", &self.inner.wait_passes)
            .finish()
    }
}

/// Handle returned by [`FutureStore::add`].
///
/// Resolves with the future's output, or [`HookError::Cancelled`] if the task was cancelled
/// through [`FutureStore::clear`] or [`Tracked::abort`]. A panic inside the task is resumed
/// when this handle is awaited.
#[must_use = "dropping a Tracked detaches the task"]
pub struct Tracked<T> {
    join: JoinHandle<Option<T>>,
}

impl<T> Tracked<T> {
    /// Aborts the task.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// True once the task has ended.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T> Future for Tracked<T> {
    type Output = Result<T, HookError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.join).poll(cx) {
            Poll::Ready(Ok(Some(out))) => Poll::Ready(Ok(out)),
            Poll::Ready(Ok(None)) => Poll::Ready(Err(HookError::Cancelled)),
            Poll::Ready(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Poll::Ready(Err(_)) => Poll::Ready(Err(HookError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("finished", &self.join.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::time::{Instant, sleep};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_add_tracks_until_done() {
        let store = FutureStore::new();
        let task = store.add(async {
            sleep(Duration::from_millis(100)).await;
            42
        });
        assert_eq!(store.len(), 1);

        assert_eq!(task.await.unwrap(), 42);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_finished_future() {
        let store = FutureStore::new();
        let task = store.add(std::future::ready("done"));
        assert_eq!(task.await.unwrap(), "done");
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_new_only_waits_existing() {
        let store = FutureStore::new();
        let late_store = store.clone();
        let start = Instant::now();

        let _first = store.add(async move {
            sleep(Duration::from_millis(100)).await;
            let _late = late_store.add(sleep(Duration::from_millis(500)));
        });

        store.wait(false).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(start.elapsed() < Duration::from_millis(600));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_new_follows_chained_additions() {
        let store = FutureStore::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let chain_store = store.clone();
        let counter = Arc::clone(&finished);
        let _first = store.add(async move {
            sleep(Duration::from_millis(100)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            let counter = Arc::clone(&counter);
            let _second = chain_store.add(async move {
                sleep(Duration::from_millis(100)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        store.wait(true).await;
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_pass_limit_stops_early() {
        let cfg = Config {
            wait_passes: 1,
            ..Config::default()
        };
        let store = FutureStore::with_config(&cfg);
        let chain_store = store.clone();
        let _first = store.add(async move {
            sleep(Duration::from_millis(10)).await;
            let _second = chain_store.add(sleep(Duration::from_millis(1_000)));
        });

        store.wait(true).await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_everything() {
        let store = FutureStore::new();
        let a = store.add(sleep(Duration::from_secs(10)));
        let b = store.add(async {
            sleep(Duration::from_secs(10)).await;
            1
        });
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
        assert!(a.await.unwrap_err().is_cancelled());
        assert!(b.await.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_removes_entry() {
        let store = FutureStore::new();
        let task = store.add(sleep(Duration::from_secs(10)));
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_wait_on_empty_store_returns() {
        let store = FutureStore::new();
        store.wait(true).await;
        store.wait(false).await;
    }

    #[tokio::test]
    #[should_panic(expected = "task exploded")]
    async fn test_task_panic_resumes_on_await() {
        let store = FutureStore::new();
        let task = store.add(async {
            if store_is_broken() {
                panic!("task exploded");
            }
            0u8
        });
        let _ = task.await;
    }

    fn store_is_broken() -> bool {
        true
    }
}
