//! Bulk tracking of spawned futures.
//!
//! - [`FutureStore`] spawns futures, waits for them, cancels them in bulk
//! - [`Tracked`] awaitable handle to one tracked task

mod future_store;

pub use future_store::{FutureStore, Tracked};
