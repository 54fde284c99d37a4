//! # Emitter: listener broadcast plus one-shot waits.
//!
//! [`Emitter`] owns a listener list and a wait set.
//!
//! ## Architecture
//! ```text
//! emit(args)
//!   ├─► msg = M::from(args)
//!   ├─► dispatch listeners snapshot (isolated, concurrent, results discarded)
//!   └─► resolve every pending wait with msg.clone()
//!
//! wait()  ──► register oneshot in wait set ──► suspend ──► Ok(msg) | Err(Cancelled) | Err(Aborted)
//!              (entry removed on resolution, abort, or when the Wait future is dropped)
//!
//! abort(None)       ──► every pending wait → Err(HookError::Cancelled)
//! abort(Some(err))  ──► every pending wait → Err(HookError::Aborted { source: err })
//! ```
//!
//! ## Rules
//! - The listener list and the wait set are independent: emitting with zero listeners
//!   still resolves waits; waiting with zero listeners is valid.
//! - A wait is resolved at most once.
//! - A wait is registered when [`Emitter::wait`] is called, not when it is first polled.
//! - A [`Wait`] borrows its emitter, so no wait outlives the emitter that issued it.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{AbortError, HookError};
use crate::handlers::{HandlerList, HandlerRef};
use crate::hooks::dispatch;

type WaitTx<M> = oneshot::Sender<Result<M, HookError>>;

struct WaitSet<M> {
    next_id: u64,
    pending: HashMap<u64, WaitTx<M>>,
}

impl<M> WaitSet<M> {
    fn new() -> Self {
        Self {
            next_id: 0,
            pending: HashMap::new(),
        }
    }
}

/// Broadcast point with listeners and one-shot waiters.
///
/// ## Example
/// ```rust
/// use hookvisor::{Emitter, HandlerFn, HandlerRef};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Ping(u32);
///
/// impl From<u32> for Ping {
///     fn from(n: u32) -> Self { Ping(n) }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source: Emitter<Ping> = Emitter::new("pings");
/// let log: HandlerRef<Ping, ()> = HandlerFn::arc("log", |p: &Ping| {
///     println!("got {p:?}");
///     Ok(())
/// });
/// source.register_listener(log);
///
/// let next = source.wait();
/// source.emit(7u32).await.unwrap();
/// assert_eq!(next.await.unwrap(), Ping(7));
/// # }
/// ```
pub struct Emitter<M> {
    name: Arc<str>,
    listeners: Arc<HandlerList<M, ()>>,
    waiters: Mutex<WaitSet<M>>,
}

impl<M> Emitter<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Creates an emitter with no listeners and no waiters.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            listeners: Arc::new(HandlerList::new()),
            waiters: Mutex::new(WaitSet::new()),
        }
    }

    /// Emitter name, used in failure logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The listener list. Shared (not copied) with virtual emitters bound to this emitter.
    pub fn listeners(&self) -> &Arc<HandlerList<M, ()>> {
        &self.listeners
    }

    /// Appends a listener. Chainable.
    pub fn register_listener(&self, listener: HandlerRef<M, ()>) -> &Self {
        self.listeners.push(listener);
        self
    }

    /// Removes the first registration of `listener`.
    pub fn remove_listener(&self, listener: &HandlerRef<M, ()>) -> bool {
        self.listeners.remove(listener)
    }

    /// Shorthand for [`register_listener`](Self::register_listener).
    pub fn on(&self, listener: HandlerRef<M, ()>) -> &Self {
        self.register_listener(listener)
    }

    /// Shorthand for [`remove_listener`](Self::remove_listener).
    pub fn off(&self, listener: &HandlerRef<M, ()>) -> bool {
        self.remove_listener(listener)
    }

    /// Number of waits currently pending.
    pub fn pending_waits(&self) -> usize {
        self.waiters.lock().pending.len()
    }

    /// Registers a one-shot wait for the next emitted event.
    ///
    /// The returned future resolves with:
    /// - `Ok(msg)` on the next successful [`emit`](Self::emit)
    /// - `Err(HookError::Cancelled)` on `abort(None)`
    /// - `Err(HookError::Aborted { .. })` on `abort(Some(err))`
    pub fn wait(&self) -> Wait<'_, M> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut set = self.waiters.lock();
            let id = set.next_id;
            set.next_id = set.next_id.wrapping_add(1);
            set.pending.insert(id, tx);
            id
        };
        Wait {
            waiters: &self.waiters,
            id,
            rx,
        }
    }

    /// Builds the event from `args`, runs every listener, then resolves every pending wait.
    ///
    /// Listener failures are isolated and logged. If a listener raises cancellation the
    /// dispatch stops, `Err(HookError::Cancelled)` is returned and pending waits stay pending.
    pub async fn emit(&self, args: impl Into<M>) -> Result<(), HookError> {
        let msg: M = args.into();
        let snapshot = self.listeners.snapshot();
        dispatch::gather(&self.name, &snapshot, &msg).await?;
        self.resolve(msg);
        Ok(())
    }

    /// Resolves every pending wait immediately and empties the wait set.
    ///
    /// `None` resolves them with [`HookError::Cancelled`]; `Some(err)` with
    /// [`HookError::Aborted`] carrying `err`.
    pub fn abort(&self, error: Option<AbortError>) {
        let pending = std::mem::take(&mut self.waiters.lock().pending);
        if !pending.is_empty() {
            tracing::debug!(
                emitter = %self.name,
                waits = pending.len(),
                with_error = error.is_some(),
                "aborting pending waits"
            );
        }
        for (_, tx) in pending {
            let outcome = match &error {
                None => HookError::Cancelled,
                Some(err) => HookError::Aborted {
                    source: Arc::clone(err),
                },
            };
            let _ = tx.send(Err(outcome));
        }
    }

    /// Shorthand for `abort(Some(Arc::new(err)))`.
    pub fn abort_with<E>(&self, err: E)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.abort(Some(Arc::new(err)));
    }

    fn resolve(&self, msg: M) {
        let pending = std::mem::take(&mut self.waiters.lock().pending);
        for (_, tx) in pending {
            let _ = tx.send(Ok(msg.clone()));
        }
    }
}

impl<M> Default for Emitter<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(std::any::type_name::<M>())
    }
}

impl<M: 'static> fmt::Debug for Emitter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("name", &self.name)
            .field("listeners", &self.listeners)
            .field("pending_waits", &self.waiters.lock().pending.len())
            .finish()
    }
}

/// Future returned by [`Emitter::wait`].
///
/// Dropping it before resolution removes it from the emitter's wait set.
#[must_use = "a wait only observes an event when awaited"]
pub struct Wait<'a, M> {
    waiters: &'a Mutex<WaitSet<M>>,
    id: u64,
    rx: oneshot::Receiver<Result<M, HookError>>,
}

impl<M> Future for Wait<'_, M> {
    type Output = Result<M, HookError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            Poll::Ready(Err(_closed)) => Poll::Ready(Err(HookError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<M> Drop for Wait<'_, M> {
    fn drop(&mut self) {
        self.waiters.lock().pending.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::error::HandlerError;
    use crate::handlers::{AsyncHandlerFn, HandlerFn};

    #[derive(Clone, Debug, PartialEq)]
    struct Msg {
        a: i32,
    }

    impl From<i32> for Msg {
        fn from(a: i32) -> Self {
            Msg { a }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_suspends_until_emit() {
        let source: Emitter<Msg> = Emitter::new("test");
        let start = Instant::now();

        let emit = async {
            tokio::time::sleep(Duration::from_millis(400)).await;
            source.emit(1).await.unwrap();
        };
        let (_, msg) = tokio::join!(emit, source.wait());

        assert_eq!(msg.unwrap(), Msg { a: 1 });
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert_eq!(source.pending_waits(), 0);
    }

    #[tokio::test]
    async fn test_listeners_run_despite_failures() {
        let source: Emitter<Msg> = Emitter::new("test");
        let sync_calls = Arc::new(AtomicUsize::new(0));
        let async_calls = Arc::new(AtomicUsize::new(0));

        let sc = Arc::clone(&sync_calls);
        let ac = Arc::clone(&async_calls);
        source
            .register_listener(AsyncHandlerFn::arc("aboom", |_: Msg| async {
                Err::<(), _>(HandlerError::from("aboom"))
            }))
            .register_listener(HandlerFn::arc("boom", |_: &Msg| Err::<(), _>(HandlerError::from("boom"))))
            .register_listener(AsyncHandlerFn::arc("async", move |m: Msg| {
                let ac = Arc::clone(&ac);
                async move {
                    assert_eq!(m.a, 1);
                    ac.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(())
                }
            }))
            .register_listener(HandlerFn::arc("sync", move |_: &Msg| {
                sc.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));

        let next = source.wait();
        source.emit(1).await.unwrap();

        assert_eq!(next.await.unwrap(), Msg { a: 1 });
        assert_eq!(sync_calls.load(Ordering::SeqCst), 1);
        assert_eq!(async_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_emit_without_listeners_resolves_all_waits() {
        let source: Emitter<Msg> = Emitter::new("test");
        let first = source.wait();
        let second = source.wait();
        assert_eq!(source.pending_waits(), 2);

        source.emit(5).await.unwrap();
        assert_eq!(first.await.unwrap(), Msg { a: 5 });
        assert_eq!(second.await.unwrap(), Msg { a: 5 });
        assert_eq!(source.pending_waits(), 0);
    }

    #[tokio::test]
    async fn test_wait_is_resolved_once() {
        let source: Emitter<Msg> = Emitter::new("test");
        let next = source.wait();
        source.emit(1).await.unwrap();
        source.emit(2).await.unwrap();
        assert_eq!(next.await.unwrap(), Msg { a: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_without_error_cancels_waits() {
        let source: Emitter<Msg> = Emitter::new("test");
        let abort = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            source.abort(None);
        };
        let (_, res) = tokio::join!(abort, source.wait());
        assert!(res.unwrap_err().is_cancelled());
        assert_eq!(source.pending_waits(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_with_error_delivers_it_verbatim() {
        let source: Emitter<Msg> = Emitter::new("test");
        let err: AbortError = Arc::new(std::io::Error::other("io failure"));
        let sent = Arc::clone(&err);

        let abort = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            source.abort(Some(sent));
        };
        let (_, a, b) = tokio::join!(abort, source.wait(), source.wait());

        for res in [a, b] {
            match res {
                Err(HookError::Aborted { source }) => assert!(Arc::ptr_eq(&source, &err)),
                other => panic!("unexpected: {other:?}"),
            }
        }
        assert_eq!(source.pending_waits(), 0);
    }

    #[tokio::test]
    async fn test_dropped_wait_leaves_the_set() {
        let source: Emitter<Msg> = Emitter::new("test");
        let next = source.wait();
        assert_eq!(source.pending_waits(), 1);
        drop(next);
        assert_eq!(source.pending_waits(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_leaves_the_set() {
        let source: Emitter<Msg> = Emitter::new("test");
        let res = tokio::time::timeout(Duration::from_millis(10), source.wait()).await;
        assert!(res.is_err());
        assert_eq!(source.pending_waits(), 0);
    }

    #[tokio::test]
    async fn test_listener_cancellation_keeps_waits_pending() {
        let source: Emitter<Msg> = Emitter::new("test");
        source.register_listener(HandlerFn::arc("cancel", |_: &Msg| Err::<(), _>(HandlerError::Cancelled)));
        let _next = source.wait();
        assert!(source.emit(1).await.unwrap_err().is_cancelled());
        assert_eq!(source.pending_waits(), 1);
    }

    #[tokio::test]
    async fn test_remove_listener() {
        let source: Emitter<Msg> = Emitter::new("test");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let listener: HandlerRef<Msg, ()> = HandlerFn::arc("count", move |_: &Msg| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        source.register_listener(listener.clone());
        source.emit(1).await.unwrap();
        assert!(source.remove_listener(&listener));
        source.emit(2).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        source.on(listener.clone());
        source.emit(3).await.unwrap();
        assert!(source.off(&listener));
        assert!(!source.off(&listener));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_debug_shows_name_listeners_and_waits() {
        let source: Emitter<Msg> = Emitter::new("debugged");
        source.on(HandlerFn::arc("log", |_: &Msg| Ok(())));
        let _wait = source.wait();
        let out = format!("{source:?}");
        assert!(out.contains("debugged"));
        assert!(out.contains("log"));
        assert!(out.contains("pending_waits: 1"));
    }
}
