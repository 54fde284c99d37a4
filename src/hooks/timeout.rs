//! # Hook instance with a fixed deadline.
//!
//! [`TimeoutHook`] wraps a [`Hook`] and bounds `gather` and `first` with
//! `tokio::time::timeout`, measured from the moment the call starts.
//!
//! ## Flow
//! ```text
//! gather/first(args)
//!   └─► timeout(dur, hook.gather/first(args))
//!          ├─ completes in time → result as-is
//!          └─ elapsed           → inner dispatch dropped (in-flight handlers cancelled)
//!                                 → Err(HookError::Timeout { timeout })
//!
//! call(args)
//!   └─► first(args)
//!          ├─ Ok(v)                         → v
//!          ├─ Err(NoValidResult | Timeout)  → definition(args)
//!          └─ Err(other)                    → other
//! ```
//!
//! ## Rules
//! - A zero deadline means no deadline (same sentinel as [`Config::timeout`](crate::Config::timeout)).
//! - `emit` propagates `Timeout`; [`TimeoutHook::emit_suppress_timeout`] swallows only `Timeout`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::error::HookError;
use crate::handlers::{HandlerList, HandlerRef, ImplTarget, ReplaceSlot};
use crate::hooks::hook::Hook;

/// Hook instance whose `gather` and `first` fail with [`HookError::Timeout`] past a deadline.
pub struct TimeoutHook<A, T> {
    hook: Hook<A, T>,
    timeout: Option<Duration>,
}

impl<A, T> TimeoutHook<A, T>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Wraps `hook`. A zero `timeout` disables the deadline.
    pub fn new(hook: Hook<A, T>, timeout: Duration) -> Self {
        Self::with_deadline(hook, Some(timeout))
    }

    pub(crate) fn with_deadline(hook: Hook<A, T>, timeout: Option<Duration>) -> Self {
        Self {
            hook,
            timeout: timeout.filter(|d| *d > Duration::ZERO),
        }
    }

    /// The configured deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The wrapped, untimed instance.
    pub fn hook(&self) -> &Hook<A, T> {
        &self.hook
    }

    /// Hook name (from the definition).
    pub fn name(&self) -> &str {
        self.hook.name()
    }

    /// The handler list shared with the wrapped instance.
    pub fn impls(&self) -> &HandlerList<A, T> {
        self.hook.impls()
    }

    /// Appends a handler. Chainable.
    pub fn add_impl(&self, handler: HandlerRef<A, T>) -> &Self {
        self.hook.add_impl(handler);
        self
    }

    /// Removes the first registration of `handler`.
    pub fn remove_impl(&self, handler: &HandlerRef<A, T>) -> bool {
        self.hook.remove_impl(handler)
    }

    /// See [`Hook::replace_impl`].
    pub fn replace_impl(
        &self,
        target: impl Into<ImplTarget<A, T>>,
        new_handler: HandlerRef<A, T>,
    ) -> Result<HandlerRef<A, T>, HookError> {
        self.hook.replace_impl(target, new_handler)
    }

    /// See [`Hook::replace_later`].
    pub fn replace_later(
        &self,
        target: impl Into<ImplTarget<A, T>>,
    ) -> Result<ReplaceSlot<'_, A, T>, HookError> {
        self.hook.replace_later(target)
    }

    /// True if at least one handler is registered.
    pub fn has_impl(&self) -> bool {
        self.hook.has_impl()
    }

    /// [`Hook::gather`] bounded by the deadline.
    pub async fn gather(&self, args: &A) -> Result<Vec<T>, HookError> {
        self.bounded(self.hook.gather(args)).await
    }

    /// Alias of [`gather`](Self::gather).
    pub async fn results(&self, args: &A) -> Result<Vec<T>, HookError> {
        self.gather(args).await
    }

    /// [`Hook::first`] bounded by the deadline.
    pub async fn first(&self, args: &A) -> Result<T, HookError> {
        self.bounded(self.hook.first(args)).await
    }

    /// Like [`first`](Self::first); falls back to the definition on `NoValidResult` or `Timeout`.
    pub async fn call(&self, args: &A) -> Result<T, HookError> {
        match self.first(args).await {
            Err(HookError::NoValidResult | HookError::Timeout { .. }) => {
                self.hook.definition().invoke(args).await
            }
            other => other,
        }
    }

    /// Runs every handler under the deadline and discards the results.
    pub async fn emit(&self, args: &A) -> Result<(), HookError> {
        self.gather(args).await.map(drop)
    }

    /// Like [`emit`](Self::emit), but a `Timeout` is swallowed.
    pub async fn emit_suppress_timeout(&self, args: &A) -> Result<(), HookError> {
        match self.emit(args).await {
            Err(HookError::Timeout { .. }) => Ok(()),
            other => other,
        }
    }

    async fn bounded<R, F>(&self, fut: F) -> Result<R, HookError>
    where
        F: Future<Output = Result<R, HookError>>,
    {
        let Some(dur) = self.timeout else {
            return fut.await;
        };
        match time::timeout(dur, fut).await {
            Ok(res) => res,
            Err(_elapsed) => {
                tracing::warn!(hook = self.name(), timeout = ?dur, "hook dispatch timed out");
                Err(HookError::Timeout { timeout: dur })
            }
        }
    }
}

impl<A: 'static, T: 'static> fmt::Debug for TimeoutHook<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutHook")
            .field("hook", &self.hook)
            .field("timeout", &self.timeout)
            .finish()
    }
}
