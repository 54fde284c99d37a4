//! # Dispatch engine: run one handler snapshot against one argument set.
//!
//! Every consumption mode (`gather`, `first`, the lazy [`ResultStream`]) is built on the
//! same isolation step, [`start`], which normalizes a handler's [`Reply`] into either a
//! settled outcome or a pending future that settles later.
//!
//! ## Flow
//! ```text
//! snapshot[0..n] ──► start(handler, &args)          (in list order, synchronously)
//!                      ├─ Ready(Ok(v))         → Value(v)
//!                      ├─ Ready(Err(Failed))   → log "handler failed" → Skipped
//!                      ├─ panic                → log "handler failed" → Skipped
//!                      ├─ Ready(Err(Cancelled))→ Cancelled (stop, propagate)
//!                      └─ Pending(fut)         → settle(fut) polled concurrently
//!                                                 └─ same mapping once it completes
//! ```
//!
//! ## Rules
//! - Handlers are invoked once each, in snapshot order.
//! - Results keep snapshot order regardless of completion order.
//! - Failures (errors and panics) are isolated: logged, never retried, never propagated.
//! - Cancellation is never isolated: it aborts the dispatch and drops every
//!   in-flight handler future.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture};
use futures::stream::{FuturesOrdered, FuturesUnordered};
use futures::{FutureExt, Stream, StreamExt};

use crate::error::{HandlerError, HookError};
use crate::handlers::{HandlerRef, Reply};

/// Where an isolated failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Point {
    /// During the synchronous handler call.
    Sync,
    /// While awaiting a handler's pending future.
    Async,
    /// Inside the hook definition used as fallback.
    Fallback,
    /// Inside a virtual emitter connect observer.
    Connect,
}

impl Point {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Point::Sync => "sync",
            Point::Async => "async",
            Point::Fallback => "fallback",
            Point::Connect => "connect",
        }
    }
}

/// Final outcome of a single handler.
pub(crate) enum Settled<T> {
    Value(T),
    Skipped,
    Cancelled,
}

/// Outcome of invoking a handler.
pub(crate) enum Started<T> {
    Settled(Settled<T>),
    Pending(BoxFuture<'static, Settled<T>>),
}

/// Emits the structured "handler failed" record.
pub(crate) fn report(hook: &str, handler: &str, point: Point, error: &dyn fmt::Display) {
    tracing::error!(
        hook = hook,
        handler = handler,
        point = point.as_str(),
        error = %error,
        "handler failed"
    );
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Invokes one handler and isolates its synchronous failure.
pub(crate) fn start<A, T>(hook: &Arc<str>, handler: &HandlerRef<A, T>, args: &A) -> Started<T>
where
    A: 'static,
    T: Send + 'static,
{
    let reply = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(args))) {
        Ok(reply) => reply,
        Err(payload) => {
            report(hook, handler.name(), Point::Sync, &panic_message(&*payload));
            return Started::Settled(Settled::Skipped);
        }
    };

    match reply {
        Reply::Ready(Ok(value)) => Started::Settled(Settled::Value(value)),
        Reply::Ready(Err(HandlerError::Cancelled)) => Started::Settled(Settled::Cancelled),
        Reply::Ready(Err(err)) => {
            report(hook, handler.name(), Point::Sync, &err);
            Started::Settled(Settled::Skipped)
        }
        Reply::Pending(fut) => {
            Started::Pending(settle(Arc::clone(hook), Arc::clone(handler), fut).boxed())
        }
    }
}

/// Awaits a pending handler future and isolates its failure.
async fn settle<A, T>(
    hook: Arc<str>,
    handler: HandlerRef<A, T>,
    fut: BoxFuture<'static, Result<T, HandlerError>>,
) -> Settled<T>
where
    A: 'static,
    T: 'static,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Settled::Value(value),
        Ok(Err(HandlerError::Cancelled)) => Settled::Cancelled,
        Ok(Err(err)) => {
            report(&hook, handler.name(), Point::Async, &err);
            Settled::Skipped
        }
        Err(payload) => {
            report(&hook, handler.name(), Point::Async, &panic_message(&*payload));
            Settled::Skipped
        }
    }
}

/// Realizes every successful result, in snapshot order.
///
/// Pending handlers run concurrently; a cancellation from any of them returns
/// [`HookError::Cancelled`] as soon as it is observed.
pub(crate) async fn gather<A, T>(
    hook: &Arc<str>,
    handlers: &[HandlerRef<A, T>],
    args: &A,
) -> Result<Vec<T>, HookError>
where
    A: 'static,
    T: Send + 'static,
{
    let mut slots: Vec<Option<T>> = Vec::with_capacity(handlers.len());
    let mut pending = FuturesUnordered::new();

    for (idx, handler) in handlers.iter().enumerate() {
        match start(hook, handler, args) {
            Started::Settled(Settled::Value(value)) => slots.push(Some(value)),
            Started::Settled(Settled::Skipped) => slots.push(None),
            Started::Settled(Settled::Cancelled) => return Err(HookError::Cancelled),
            Started::Pending(fut) => {
                slots.push(None);
                pending.push(fut.map(move |settled| (idx, settled)));
            }
        }
    }

    while let Some((idx, settled)) = pending.next().await {
        match settled {
            Settled::Value(value) => slots[idx] = Some(value),
            Settled::Skipped => {}
            Settled::Cancelled => return Err(HookError::Cancelled),
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Returns the earliest successful result in snapshot order.
///
/// Handlers are tried one at a time; the first success stops the dispatch, so
/// later handlers are never invoked.
pub(crate) async fn first<A, T>(
    hook: &Arc<str>,
    handlers: &[HandlerRef<A, T>],
    args: &A,
) -> Result<T, HookError>
where
    A: 'static,
    T: Send + 'static,
{
    for handler in handlers {
        let settled = match start(hook, handler, args) {
            Started::Settled(settled) => settled,
            Started::Pending(fut) => fut.await,
        };
        match settled {
            Settled::Value(value) => return Ok(value),
            Settled::Skipped => continue,
            Settled::Cancelled => return Err(HookError::Cancelled),
        }
    }
    Err(HookError::NoValidResult)
}

/// Invokes the hook definition as fallback. Its failures are not isolated.
pub(crate) async fn fallback<A, T>(
    hook: &Arc<str>,
    definition: &HandlerRef<A, T>,
    args: &A,
) -> Result<T, HookError>
where
    A: 'static,
    T: 'static,
{
    let res = match definition.call(args) {
        Reply::Ready(res) => res,
        Reply::Pending(fut) => fut.await,
    };
    match res {
        Ok(value) => Ok(value),
        Err(HandlerError::Cancelled) => Err(HookError::Cancelled),
        Err(err) => {
            report(hook, definition.name(), Point::Fallback, &err);
            Err(HookError::Fallback {
                source: Arc::new(err),
            })
        }
    }
}

type Pending<T> = FuturesOrdered<BoxFuture<'static, Settled<T>>>;
type Launch<T> = Box<dyn FnOnce() -> Pending<T> + Send>;

/// Lazy, isolated sequence of successful results in snapshot order.
///
/// Created by [`Hook::stream`](crate::Hook::stream). The handler snapshot is taken when the
/// stream is created, but no handler is invoked until the first poll; a stream dropped
/// unpolled runs nothing. Pending handlers make progress while the stream is polled.
/// A cancellation yields one `Err(HookError::Cancelled)` and ends the stream,
/// dropping the remaining handler futures.
#[must_use = "streams do nothing unless polled"]
pub struct ResultStream<T> {
    launch: Option<Launch<T>>,
    inner: Pending<T>,
    done: bool,
}

impl<T: Send + 'static> ResultStream<T> {
    pub(crate) fn new<A>(hook: &Arc<str>, handlers: Vec<HandlerRef<A, T>>, args: A) -> Self
    where
        A: Send + 'static,
    {
        let hook = Arc::clone(hook);
        Self {
            launch: Some(Box::new(move || launch(&hook, &handlers, &args))),
            inner: FuturesOrdered::new(),
            done: false,
        }
    }
}

/// Invokes every handler in order, stopping after a synchronous cancellation.
fn launch<A, T>(hook: &Arc<str>, handlers: &[HandlerRef<A, T>], args: &A) -> Pending<T>
where
    A: 'static,
    T: Send + 'static,
{
    let mut inner = FuturesOrdered::new();
    for handler in handlers {
        match start(hook, handler, args) {
            Started::Settled(Settled::Cancelled) => {
                inner.push_back(future::ready(Settled::Cancelled).boxed());
                break;
            }
            Started::Settled(settled) => inner.push_back(future::ready(settled).boxed()),
            Started::Pending(fut) => inner.push_back(fut),
        }
    }
    inner
}

impl<T> Stream for ResultStream<T> {
    type Item = Result<T, HookError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if let Some(launch) = this.launch.take() {
            this.inner = launch();
        }
        loop {
            match this.inner.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Settled::Value(value))) => return Poll::Ready(Some(Ok(value))),
                Poll::Ready(Some(Settled::Skipped)) => continue,
                Poll::Ready(Some(Settled::Cancelled)) => {
                    this.done = true;
                    this.inner = FuturesOrdered::new();
                    return Poll::Ready(Some(Err(HookError::Cancelled)));
                }
            }
        }
    }
}
