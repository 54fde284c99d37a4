//! # Virtual emitters: weak proxies for a real [`Emitter`].
//!
//! A [`VirtualEmitter`] can be created before the emitter it stands for exists. Code can
//! hold it, register connect observers, and later bind it with [`VirtualEmitter::connect`].
//!
//! ```text
//! VirtualEmitter ──(Weak)──► Emitter
//!    │                         ▲
//!    ├─ wait()      ───────────┘  upgrade; None when unbound or dropped
//!    ├─ listeners() ──► same Arc<HandlerList> as the emitter (shared, not copied)
//!    └─ connect(&emitter) ──► store Weak ──► run connect observers (isolated)
//! ```
//!
//! [`MultiVirtualEmitter`] links several emitters weakly; its `wait` completes with the
//! first event from any live source.
//!
//! ## Rules
//! - The link never keeps the emitter alive. A wait in progress holds it only until the wait resolves.
//! - Connect observer failures (errors and panics) are logged and never escape `connect`.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::future::select_all;
use parking_lot::{Mutex, RwLock};

use crate::error::{HandlerError, HookError};
use crate::events::emitter::Emitter;
use crate::handlers::HandlerList;
use crate::hooks::dispatch::{self, Point};

/// Callback run when a virtual emitter is bound to a real one.
pub type ConnectObserver<M> =
    Arc<dyn Fn(&VirtualEmitter<M>, &Arc<Emitter<M>>) -> Result<(), HandlerError> + Send + Sync>;

const OBSERVER: &str = "connect_observer";

/// Weak proxy for an [`Emitter`], bindable after creation.
pub struct VirtualEmitter<M> {
    link: RwLock<Option<Weak<Emitter<M>>>>,
    observers: Mutex<Vec<ConnectObserver<M>>>,
}

impl<M> VirtualEmitter<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Creates an unbound virtual emitter.
    pub fn new() -> Self {
        Self {
            link: RwLock::new(None),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a callback run on every subsequent [`connect`](Self::connect). Chainable.
    pub fn on_connect<F>(&self, observer: F) -> &Self
    where
        F: Fn(&VirtualEmitter<M>, &Arc<Emitter<M>>) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.observers.lock().push(Arc::new(observer));
        self
    }

    /// Binds to `emitter` (replacing any previous binding) and runs the connect observers.
    pub fn connect(&self, emitter: &Arc<Emitter<M>>) {
        *self.link.write() = Some(Arc::downgrade(emitter));

        let observers = self.observers.lock().clone();
        for observer in observers {
            match std::panic::catch_unwind(AssertUnwindSafe(|| observer(self, emitter))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => dispatch::report(emitter.name(), OBSERVER, Point::Connect, &err),
                Err(payload) => dispatch::report(
                    emitter.name(),
                    OBSERVER,
                    Point::Connect,
                    &dispatch::panic_message(&*payload),
                ),
            }
        }
    }

    /// True while bound to an emitter that is still alive.
    pub fn connected(&self) -> bool {
        self.link
            .read()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// The bound emitter, if it is still alive.
    pub fn emitter(&self) -> Option<Arc<Emitter<M>>> {
        self.link.read().as_ref().and_then(Weak::upgrade)
    }

    /// Waits for the bound emitter's next event.
    ///
    /// Returns `Ok(None)` immediately when unbound or when the emitter is gone.
    pub async fn wait(&self) -> Result<Option<M>, HookError> {
        let Some(emitter) = self.emitter() else {
            return Ok(None);
        };
        emitter.wait().await.map(Some)
    }

    /// The bound emitter's listener list (the same list, not a copy).
    pub fn listeners(&self) -> Option<Arc<HandlerList<M, ()>>> {
        self.emitter().map(|e| Arc::clone(e.listeners()))
    }
}

impl<M> Default for VirtualEmitter<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for VirtualEmitter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = self
            .link
            .read()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0);
        f.debug_struct("VirtualEmitter")
            .field("connected", &bound)
            .field("observers", &self.observers.lock().len())
            .finish()
    }
}

/// Weak fan-in over several emitters.
pub struct MultiVirtualEmitter<M> {
    links: Mutex<Vec<Weak<Emitter<M>>>>,
}

impl<M> MultiVirtualEmitter<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Creates a multi-source emitter with no links.
    pub fn new() -> Self {
        Self {
            links: Mutex::new(Vec::new()),
        }
    }

    /// Adds a weak link to `emitter`. Linking the same emitter twice is a no-op.
    pub fn attach(&self, emitter: &Arc<Emitter<M>>) -> &Self {
        let mut links = self.links.lock();
        links.retain(|weak| weak.strong_count() > 0);
        let target = Arc::as_ptr(emitter);
        if !links.iter().any(|weak| std::ptr::eq(weak.as_ptr(), target)) {
            links.push(Arc::downgrade(emitter));
        }
        self
    }

    /// Removes the link to `emitter`.
    pub fn detach(&self, emitter: &Arc<Emitter<M>>) -> bool {
        let mut links = self.links.lock();
        let before = links.len();
        let target = Arc::as_ptr(emitter);
        links.retain(|weak| weak.strong_count() > 0 && !std::ptr::eq(weak.as_ptr(), target));
        links.len() != before
    }

    /// Live sources, pruning dead links.
    pub fn sources(&self) -> Vec<Arc<Emitter<M>>> {
        let mut links = self.links.lock();
        links.retain(|weak| weak.strong_count() > 0);
        links.iter().filter_map(Weak::upgrade).collect()
    }

    /// True if at least one source is alive.
    pub fn connected(&self) -> bool {
        self.links.lock().iter().any(|weak| weak.strong_count() > 0)
    }

    /// Waits for the next event from any live source.
    ///
    /// Returns `Ok(None)` when no source is alive. The waits registered on the other
    /// sources are withdrawn once one resolves.
    pub async fn wait(&self) -> Result<Option<M>, HookError> {
        let sources = self.sources();
        if sources.is_empty() {
            return Ok(None);
        }
        let (res, _index, _rest) = select_all(sources.iter().map(|e| e.wait())).await;
        res.map(Some)
    }
}

impl<M> Default for MultiVirtualEmitter<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for MultiVirtualEmitter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let links = self.links.lock();
        let live = links.iter().filter(|weak| weak.strong_count() > 0).count();
        f.debug_struct("MultiVirtualEmitter")
            .field("links", &links.len())
            .field("live", &live)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::handlers::{HandlerFn, HandlerRef};

    type Source = Arc<Emitter<u32>>;

    fn source(name: &str) -> Source {
        Arc::new(Emitter::new(name))
    }

    #[tokio::test]
    async fn test_unbound_virtual_emitter() {
        let virt: VirtualEmitter<u32> = VirtualEmitter::new();
        assert!(!virt.connected());
        assert!(virt.emitter().is_none());
        assert!(virt.listeners().is_none());
        assert_eq!(virt.wait().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connect_runs_observers_and_isolates_failures() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let virt: VirtualEmitter<u32> = VirtualEmitter::new();
        virt.on_connect(|_, _| Err(HandlerError::from("observer failed")))
            .on_connect(|_, _| panic!("observer panicked"))
            .on_connect(move |v, e| {
                assert!(v.connected());
                assert_eq!(e.name(), "real");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let real = source("real");
        virt.connect(&real);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(virt.connected());
    }

    #[tokio::test]
    async fn test_listeners_are_shared_with_the_emitter() {
        let real = source("real");
        let virt: VirtualEmitter<u32> = VirtualEmitter::new();
        virt.connect(&real);

        let listeners = virt.listeners().unwrap();
        assert!(Arc::ptr_eq(&listeners, real.listeners()));

        let listener: HandlerRef<u32, ()> = HandlerFn::arc("noop", |_: &u32| Ok(()));
        listeners.push(listener.clone());
        assert!(real.listeners().contains(&listener));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_delegates_to_the_emitter() {
        let real = source("real");
        let virt: VirtualEmitter<u32> = VirtualEmitter::new();
        virt.connect(&real);

        let emit = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            real.emit(9u32).await.unwrap();
        };
        let (_, got) = tokio::join!(emit, virt.wait());
        assert_eq!(got.unwrap(), Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_latest_emitter_wins() {
        let a = source("a");
        let b = source("b");
        let virt: VirtualEmitter<u32> = VirtualEmitter::new();
        virt.connect(&a);
        virt.connect(&b);

        assert!(Arc::ptr_eq(&virt.emitter().unwrap(), &b));

        let emit = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(a.pending_waits(), 0);
            assert_eq!(b.pending_waits(), 1);
            b.emit(7u32).await.unwrap();
        };
        let (_, got) = tokio::join!(emit, virt.wait());

        assert_eq!(got.unwrap(), Some(7));
        assert_eq!(a.pending_waits(), 0);
        assert_eq!(b.pending_waits(), 0);
    }

    #[tokio::test]
    async fn test_link_does_not_keep_emitter_alive() {
        let real = source("real");
        let virt: VirtualEmitter<u32> = VirtualEmitter::new();
        virt.connect(&real);
        drop(real);

        assert!(!virt.connected());
        assert!(virt.listeners().is_none());
        assert_eq!(virt.wait().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_wait_takes_first_source() {
        let a = source("a");
        let b = source("b");
        let multi: MultiVirtualEmitter<u32> = MultiVirtualEmitter::new();
        multi.attach(&a).attach(&b).attach(&a);
        assert_eq!(multi.sources().len(), 2);

        let emit = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            b.emit(2u32).await.unwrap();
        };
        let (_, got) = tokio::join!(emit, multi.wait());

        assert_eq!(got.unwrap(), Some(2));
        assert_eq!(a.pending_waits(), 0);
        assert_eq!(b.pending_waits(), 0);
    }

    #[tokio::test]
    async fn test_multi_prunes_dead_sources() {
        let a = source("a");
        let multi: MultiVirtualEmitter<u32> = MultiVirtualEmitter::new();
        multi.attach(&a);
        assert!(multi.connected());

        drop(a);
        assert!(!multi.connected());
        assert!(multi.sources().is_empty());
        assert_eq!(multi.wait().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multi_detach() {
        let a = source("a");
        let multi: MultiVirtualEmitter<u32> = MultiVirtualEmitter::new();
        multi.attach(&a);
        assert!(multi.detach(&a));
        assert!(!multi.detach(&a));
        assert!(!multi.connected());
    }
}
