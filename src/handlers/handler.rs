//! # Handler abstraction.
//!
//! This module defines the [`Handler`] trait (a callable invoked once per dispatch) and its
//! reply type [`Reply`]. A handler either answers immediately or hands back a pending
//! future; the dispatch engine treats both uniformly.
//!
//! The common handle type is [`HandlerRef`], an `Arc<dyn Handler>` suitable for sharing
//! across hooks, emitters and snapshots. Handler identity is the `Arc` allocation: two
//! clones of the same `HandlerRef` are the same handler, two separately built closures are not.
//!
//! Stateful asynchronous handlers can implement [`AsyncHandler`] with `#[async_trait]`
//! and be turned into a `HandlerRef` by [`from_async`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::HandlerError;

/// # Shared handle to a handler object.
///
/// This is the element type of every [`HandlerList`](crate::HandlerList).
pub type HandlerRef<A, T> = Arc<dyn Handler<A, T>>;

/// What a handler hands back when invoked.
///
/// Sync handlers answer with `Ready`, async handlers with `Pending`.
/// The pending future must own everything it needs (`'static`).
pub enum Reply<T> {
    /// Result available right away.
    Ready(Result<T, HandlerError>),
    /// Result arrives when the future completes.
    Pending(BoxFuture<'static, Result<T, HandlerError>>),
}

impl<T> Reply<T> {
    /// Immediate successful value.
    pub fn value(value: T) -> Self {
        Reply::Ready(Ok(value))
    }

    /// Immediate failure.
    pub fn error(err: impl Into<HandlerError>) -> Self {
        Reply::Ready(Err(err.into()))
    }

    /// True if the handler suspended.
    pub fn is_pending(&self) -> bool {
        matches!(self, Reply::Pending(_))
    }
}

/// # Callable registered on a hook or emitter.
///
/// `call` is invoked synchronously, in list order, with a borrowed argument set.
/// Work that must outlive the call goes into the returned [`Reply::Pending`] future.
///
/// # Example
/// ```
/// use hookvisor::{Handler, HandlerRef, Reply};
/// use std::sync::Arc;
///
/// struct Double;
///
/// impl Handler<i32, i32> for Double {
///     fn call(&self, args: &i32) -> Reply<i32> {
///         Reply::value(args * 2)
///     }
///
///     fn name(&self) -> &str { "double" }
/// }
///
/// let h: HandlerRef<i32, i32> = Arc::new(Double);
/// assert_eq!(h.name(), "double");
/// ```
pub trait Handler<A, T>: Send + Sync + 'static {
    /// Invokes the handler once.
    fn call(&self, args: &A) -> Reply<T>;

    /// Returns the handler name used in failure logs.
    ///
    /// The default uses `type_name::<Self>()`, which is verbose for closures; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// # Asynchronous handler object.
///
/// Receives its own clone of the call arguments, so the returned future never
/// borrows the dispatch. Adapt with [`from_async`].
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use hookvisor::{AsyncHandler, HandlerError, HandlerRef, from_async};
/// use std::sync::Arc;
///
/// struct Lookup;
///
/// #[async_trait]
/// impl AsyncHandler<u32, String> for Lookup {
///     async fn handle(&self, id: u32) -> Result<String, HandlerError> {
///         Ok(format!("user-{id}"))
///     }
/// }
///
/// let h: HandlerRef<u32, String> = from_async(Arc::new(Lookup));
/// ```
#[async_trait]
pub trait AsyncHandler<A, T>: Send + Sync + 'static
where
    A: Send + 'static,
{
    /// Produces the handler's result.
    async fn handle(&self, args: A) -> Result<T, HandlerError>;

    /// Returns the handler name used in failure logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

struct AsyncAdapter<H>(Arc<H>);

impl<A, T, H> Handler<A, T> for AsyncAdapter<H>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    H: AsyncHandler<A, T>,
{
    fn call(&self, args: &A) -> Reply<T> {
        let inner = Arc::clone(&self.0);
        let args = args.clone();
        Reply::Pending(Box::pin(async move { inner.handle(args).await }))
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

/// Wraps an [`AsyncHandler`] object as a [`HandlerRef`].
pub fn from_async<A, T, H>(handler: Arc<H>) -> HandlerRef<A, T>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    H: AsyncHandler<A, T>,
{
    Arc::new(AsyncAdapter(handler))
}

/// True if both handles point at the same handler allocation.
#[inline]
pub fn same_handler<A, T>(a: &HandlerRef<A, T>, b: &HandlerRef<A, T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
