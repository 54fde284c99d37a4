//! # Ordered, shareable handler list.
//!
//! [`HandlerList`] is the mutable registry behind every hook instance and emitter.
//!
//! ## Rules
//! - Order is significant: it is both the invocation order and the result order.
//! - Duplicates are permitted; identity operations act on the **first** match.
//! - Mutation may happen at any time, also while a dispatch is in flight.
//!   A dispatch works on [`HandlerList::snapshot`], so later mutation never affects it.
//! - The lock is held only for the list operation itself, never across an `.await`
//!   or a handler call.

use std::fmt;

use parking_lot::RwLock;

use crate::error::HookError;
use crate::handlers::handler::{HandlerRef, same_handler};

/// Position selector for [`HandlerList::replace`].
pub enum ImplTarget<A, T> {
    /// Position in the list.
    Index(usize),
    /// First entry that is the same handler (by identity).
    Handler(HandlerRef<A, T>),
}

impl<A, T> From<usize> for ImplTarget<A, T> {
    fn from(index: usize) -> Self {
        ImplTarget::Index(index)
    }
}

impl<A, T> From<HandlerRef<A, T>> for ImplTarget<A, T> {
    fn from(handler: HandlerRef<A, T>) -> Self {
        ImplTarget::Handler(handler)
    }
}

impl<A, T> From<&HandlerRef<A, T>> for ImplTarget<A, T> {
    fn from(handler: &HandlerRef<A, T>) -> Self {
        ImplTarget::Handler(handler.clone())
    }
}

/// Ordered handler registry with point-in-time snapshots.
pub struct HandlerList<A, T> {
    items: RwLock<Vec<HandlerRef<A, T>>>,
}

impl<A, T> HandlerList<A, T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    /// Appends a handler.
    pub fn push(&self, handler: HandlerRef<A, T>) {
        self.items.write().push(handler);
    }

    /// Removes the first entry that is `handler`. Returns `false` if it was not registered.
    pub fn remove(&self, handler: &HandlerRef<A, T>) -> bool {
        let mut items = self.items.write();
        match items.iter().position(|h| same_handler(h, handler)) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// Number of registered handlers (duplicates counted).
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// True if `handler` is registered at least once.
    pub fn contains(&self, handler: &HandlerRef<A, T>) -> bool {
        self.position(handler).is_some()
    }

    /// Position of the first entry that is `handler`.
    pub fn position(&self, handler: &HandlerRef<A, T>) -> Option<usize> {
        self.items.read().iter().position(|h| same_handler(h, handler))
    }

    /// Point-in-time copy of the list (cheap: `Arc` clones only).
    pub fn snapshot(&self) -> Vec<HandlerRef<A, T>> {
        self.items.read().clone()
    }

    /// Resolves a target to a concrete position in the current list.
    ///
    /// ### Errors
    /// - [`HookError::ImplNotFound`] if a handler target is not registered
    /// - [`HookError::IndexOutOfRange`] if an index target is past the end
    pub fn resolve(&self, target: &ImplTarget<A, T>) -> Result<usize, HookError> {
        let items = self.items.read();
        match target {
            ImplTarget::Index(index) if *index < items.len() => Ok(*index),
            ImplTarget::Index(index) => Err(HookError::IndexOutOfRange {
                index: *index,
                len: items.len(),
            }),
            ImplTarget::Handler(handler) => items
                .iter()
                .position(|h| same_handler(h, handler))
                .ok_or(HookError::ImplNotFound),
        }
    }

    /// Replaces the entry selected by `target` in place.
    ///
    /// Returns the handler that was replaced.
    pub fn replace(
        &self,
        target: impl Into<ImplTarget<A, T>>,
        new_handler: HandlerRef<A, T>,
    ) -> Result<HandlerRef<A, T>, HookError> {
        let target = target.into();
        let mut items = self.items.write();
        let index = match &target {
            ImplTarget::Index(index) => *index,
            ImplTarget::Handler(handler) => items
                .iter()
                .position(|h| same_handler(h, handler))
                .ok_or(HookError::ImplNotFound)?,
        };
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(HookError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, new_handler))
    }

    /// Resolves `target` now and returns a slot that installs the replacement later.
    ///
    /// This is the deferred form of [`replace`](Self::replace):
    /// ```
    /// use hookvisor::{HandlerFn, HandlerList, HandlerRef};
    ///
    /// let list: HandlerList<i32, i32> = HandlerList::new();
    /// let old: HandlerRef<i32, i32> = HandlerFn::arc("old", |a: &i32| Ok(*a));
    /// list.push(old.clone());
    ///
    /// let slot = list.replace_later(&old).unwrap();
    /// slot.with(HandlerFn::arc("new", |a: &i32| Ok(a * 10))).unwrap();
    /// assert!(!list.contains(&old));
    /// ```
    pub fn replace_later(
        &self,
        target: impl Into<ImplTarget<A, T>>,
    ) -> Result<ReplaceSlot<'_, A, T>, HookError> {
        let index = self.resolve(&target.into())?;
        Ok(ReplaceSlot { list: self, index })
    }
}

impl<A, T> Default for HandlerList<A, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static, T: 'static> fmt::Debug for HandlerList<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.items.read();
        f.debug_list().entries(items.iter().map(|h| h.name())).finish()
    }
}

/// Pending replacement returned by [`HandlerList::replace_later`].
#[must_use = "the replacement is only installed by `ReplaceSlot::with`"]
pub struct ReplaceSlot<'a, A, T> {
    list: &'a HandlerList<A, T>,
    index: usize,
}

impl<A, T> ReplaceSlot<'_, A, T> {
    /// Position that will be replaced.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Installs `new_handler` at the resolved position.
    ///
    /// Fails with [`HookError::IndexOutOfRange`] if the list shrank in the meantime.
    pub fn with(self, new_handler: HandlerRef<A, T>) -> Result<HandlerRef<A, T>, HookError> {
        self.list.replace(self.index, new_handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerFn;

    fn named(name: &'static str, delta: i32) -> HandlerRef<i32, i32> {
        HandlerFn::arc(name, move |a: &i32| Ok(a + delta))
    }

    fn names(list: &HandlerList<i32, i32>) -> Vec<String> {
        list.snapshot().iter().map(|h| h.name().to_string()).collect()
    }

    #[test]
    fn test_push_keeps_order_and_duplicates() {
        let list = HandlerList::new();
        let a = named("a", 0);
        list.push(a.clone());
        list.push(named("b", 0));
        list.push(a.clone());
        assert_eq!(names(&list), vec!["a", "b", "a"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_remove_by_identity_removes_first_match_only() {
        let list = HandlerList::new();
        let a = named("a", 0);
        list.push(a.clone());
        list.push(named("b", 0));
        list.push(a.clone());

        assert!(list.remove(&a));
        assert_eq!(names(&list), vec!["b", "a"]);
        assert!(!list.remove(&named("a", 0)));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let list = HandlerList::new();
        list.push(named("a", 0));
        let snap = list.snapshot();
        list.push(named("b", 0));
        list.clear();
        assert_eq!(snap.len(), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_replace_by_identity() {
        let list = HandlerList::new();
        let a = named("a", 0);
        let b = named("b", 0);
        list.push(a.clone());
        list.push(b.clone());

        let old = list.replace(&b, named("c", 0)).unwrap();
        assert!(same_handler(&old, &b));
        assert_eq!(names(&list), vec!["a", "c"]);
    }

    #[test]
    fn test_replace_unknown_handler_fails() {
        let list = HandlerList::new();
        list.push(named("a", 0));
        let res = list.replace(&named("x", 0), named("c", 0));
        assert!(matches!(res, Err(HookError::ImplNotFound)));
        assert_eq!(names(&list), vec!["a"]);
    }

    #[test]
    fn test_replace_by_index() {
        let list = HandlerList::new();
        list.push(named("a", 0));
        list.push(named("b", 0));
        list.replace(1usize, named("z", 0)).unwrap();
        assert_eq!(names(&list), vec!["a", "z"]);

        let res = list.replace(2usize, named("y", 0));
        assert!(matches!(
            res,
            Err(HookError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_replace_later_resolves_position_up_front() {
        let list = HandlerList::new();
        let a = named("a", 0);
        list.push(named("first", 0));
        list.push(a.clone());

        let slot = list.replace_later(&a).unwrap();
        assert_eq!(slot.index(), 1);
        slot.with(named("b", 0)).unwrap();
        assert_eq!(names(&list), vec!["first", "b"]);

        assert!(matches!(
            list.replace_later(&a),
            Err(HookError::ImplNotFound)
        ));
    }
}
