//! # Function-backed handlers (`HandlerFn`, `AsyncHandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(&A) -> Result<T, HandlerError>` and answers
//! immediately. [`AsyncHandlerFn`] wraps `F: Fn(A) -> Fut`, producing a fresh future per
//! call from its own clone of the arguments.
//!
//! ## Concurrency semantics
//! - Each call of an [`AsyncHandlerFn`] creates a **new** future owning its state.
//! - No hidden mutation between calls; share state explicitly through `Arc<...>` inside the closure.
//!
//! ## Example
//! ```rust
//! use hookvisor::{AsyncHandlerFn, HandlerError, HandlerFn, HandlerRef};
//!
//! let minus: HandlerRef<i32, i32> = HandlerFn::arc("minus-one", |a: &i32| Ok(a - 1));
//! let plus: HandlerRef<i32, i32> = AsyncHandlerFn::arc("plus-two", |a: i32| async move {
//!     Ok::<_, HandlerError>(a + 2)
//! });
//!
//! assert_eq!(minus.name(), "minus-one");
//! assert_eq!(plus.name(), "plus-two");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::handlers::handler::{Handler, Reply};

/// Synchronous function-backed handler.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](crate::HandlerRef).
    pub fn new<A, T>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&A) -> Result<T, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<A, T>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(&A) -> Result<T, HandlerError> + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<A, T, F> Handler<A, T> for HandlerFn<F>
where
    F: Fn(&A) -> Result<T, HandlerError> + Send + Sync + 'static,
{
    fn call(&self, args: &A) -> Reply<T> {
        Reply::Ready((self.f)(args))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Asynchronous function-backed handler.
///
/// Wraps a closure that *creates* a new future per call.
#[derive(Debug)]
pub struct AsyncHandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> AsyncHandlerFn<F> {
    /// Creates a new function-backed async handler.
    pub fn new<A, T, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<A, T, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

impl<A, T, F, Fut> Handler<A, T> for AsyncHandlerFn<F>
where
    A: Clone,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
{
    fn call(&self, args: &A) -> Reply<T> {
        Reply::Pending(Box::pin((self.f)(args.clone())))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
