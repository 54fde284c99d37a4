//! # Hook instances.
//!
//! A [`Hook`] is one instance of a [`HookDef`]: it owns a handler list and offers the
//! dispatch modes over a snapshot of that list.
//!
//! | Mode                  | Returns                              | On total failure / empty list |
//! |-----------------------|--------------------------------------|-------------------------------|
//! | [`Hook::gather`]      | every successful result, list order  | `Ok(vec![])`                  |
//! | [`Hook::emit`]        | nothing (side effects only)          | `Ok(())`                      |
//! | [`Hook::first`]       | earliest successful result           | `Err(NoValidResult)`          |
//! | [`Hook::call`]        | like `first`                         | the definition's own result   |
//! | [`Hook::stream`]      | lazy stream of successful results    | empty stream                  |
//!
//! Every mode returns `Err(HookError::Cancelled)` if a handler raises cancellation.

use std::fmt;
use std::sync::Arc;

use crate::error::HookError;
use crate::handlers::{HandlerList, HandlerRef, ImplTarget, ReplaceSlot};
use crate::hooks::def::HookDef;
use crate::hooks::dispatch::{self, ResultStream};

/// Instance of a hook definition with its own handler list.
pub struct Hook<A, T> {
    def: Arc<HookDef<A, T>>,
    impls: HandlerList<A, T>,
}

impl<A, T> Hook<A, T>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
{
    pub(crate) fn new(def: Arc<HookDef<A, T>>) -> Self {
        Self {
            def,
            impls: HandlerList::new(),
        }
    }

    /// Hook name (from the definition).
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// The definition this instance was created from.
    pub fn definition(&self) -> &Arc<HookDef<A, T>> {
        &self.def
    }

    /// The handler list. Use it to add, remove or clear handlers.
    pub fn impls(&self) -> &HandlerList<A, T> {
        &self.impls
    }

    /// Appends a handler. Chainable.
    pub fn add_impl(&self, handler: HandlerRef<A, T>) -> &Self {
        self.impls.push(handler);
        self
    }

    /// Removes the first registration of `handler`.
    pub fn remove_impl(&self, handler: &HandlerRef<A, T>) -> bool {
        self.impls.remove(handler)
    }

    /// Replaces a handler by position or identity.
    ///
    /// ### Errors
    /// - [`HookError::ImplNotFound`] if `target` is a handler that is not registered
    /// - [`HookError::IndexOutOfRange`] if `target` is an invalid position
    pub fn replace_impl(
        &self,
        target: impl Into<ImplTarget<A, T>>,
        new_handler: HandlerRef<A, T>,
    ) -> Result<HandlerRef<A, T>, HookError> {
        self.impls.replace(target, new_handler)
    }

    /// Resolves `target` now; the replacement is supplied later through the returned slot.
    pub fn replace_later(
        &self,
        target: impl Into<ImplTarget<A, T>>,
    ) -> Result<ReplaceSlot<'_, A, T>, HookError> {
        self.impls.replace_later(target)
    }

    /// True if at least one handler is registered.
    pub fn has_impl(&self) -> bool {
        !self.impls.is_empty()
    }

    /// Collects every successful result, in handler order.
    pub async fn gather(&self, args: &A) -> Result<Vec<T>, HookError> {
        let snapshot = self.impls.snapshot();
        dispatch::gather(self.def.shared_name(), &snapshot, args).await
    }

    /// Alias of [`gather`](Self::gather).
    pub async fn results(&self, args: &A) -> Result<Vec<T>, HookError> {
        self.gather(args).await
    }

    /// Runs every handler and discards the results.
    pub async fn emit(&self, args: &A) -> Result<(), HookError> {
        self.gather(args).await.map(drop)
    }

    /// Returns the first successful result.
    ///
    /// ### Errors
    /// - [`HookError::NoValidResult`] if the list is empty or every handler failed
    /// - [`HookError::Cancelled`] if a handler raised cancellation
    pub async fn first(&self, args: &A) -> Result<T, HookError> {
        let snapshot = self.impls.snapshot();
        dispatch::first(self.def.shared_name(), &snapshot, args).await
    }

    /// Like [`first`](Self::first), falling back to the definition when no handler produced a result.
    pub async fn call(&self, args: &A) -> Result<T, HookError> {
        match self.first(args).await {
            Err(HookError::NoValidResult) => self.def.invoke(args).await,
            other => other,
        }
    }

    /// Returns the successful results of a dispatch as a lazy stream.
    ///
    /// The handler list is snapshotted now; handlers are invoked on the first poll.
    pub fn stream(&self, args: A) -> ResultStream<T> {
        ResultStream::new(self.def.shared_name(), self.impls.snapshot(), args)
    }
}

impl<A: 'static, T: 'static> fmt::Debug for Hook<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("def", &self.def)
            .field("impls", &self.impls)
            .finish()
    }
}
