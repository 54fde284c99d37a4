//! # Handler abstractions and the handler list.
//!
//! This module provides the handler-related types:
//! - [`Handler`] - trait for callables invoked once per dispatch
//! - [`Reply`] - immediate value or pending future returned by a handler
//! - [`HandlerFn`] / [`AsyncHandlerFn`] - function-backed handlers
//! - [`AsyncHandler`] - `#[async_trait]` handler objects, adapted via [`from_async`]
//! - [`HandlerList`] - ordered, snapshot-able registry shared by hooks and emitters

mod handler;
mod handler_fn;
mod list;

pub use handler::{AsyncHandler, Handler, HandlerRef, Reply, from_async, same_handler};
pub use handler_fn::{AsyncHandlerFn, HandlerFn};
pub use list::{HandlerList, ImplTarget, ReplaceSlot};
