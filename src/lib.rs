//! # hookvisor
//!
//! **Hookvisor** is a small library of typed extension points for async Rust.
//!
//! It provides three independent building blocks:
//! - **Hooks**: named extension points with a fallback definition. Handlers are registered
//!   per instance and dispatched with isolated failures.
//! - **Emitters**: listener broadcast plus one-shot waits for the next event, with weak
//!   "virtual" proxies that can be created before the real emitter exists.
//! - **Future store**: spawns background futures, waits for them, cancels them in bulk.
//!
//! ## Architecture
//! ### Hook dispatch
//! ```text
//!     ┌──────────────┐
//!     │   HookDef    │  name + definition (fallback)
//!     └──────┬───────┘
//!            │ instance() / with_timeout(d) / with_defaults(&cfg)
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Hook / TimeoutHook                                               │
//! │  - HandlerList (add / remove / replace / replace_later)           │
//! │  - gather / results / emit / first / call / stream                │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ snapshot of the list, invoked in order with &args
//!        ▼
//!     ┌──────────┐   ┌──────────┐   ┌──────────┐
//!     │ handler1 │   │ handler2 │   │ handler3 │
//!     │  Ready   │   │ Pending  │   │  Err     │ ──► "handler failed" (tracing), skipped
//!     └────┬─────┘   └────┬─────┘   └──────────┘
//!          ▼              ▼
//!      results in list order ──► Vec<T> / first Ok / fallback to definition
//! ```
//!
//! ### Emitters
//! ```text
//! VirtualEmitter ──(Weak)──► Emitter ──► listeners (HandlerList<M, ()>)
//!                               │
//!                               ├─ wait()  ──► Wait: Ok(msg) | Err(Cancelled) | Err(Aborted)
//!                               ├─ emit(a) ──► run listeners ──► resolve every wait
//!                               └─ abort(e)──► resolve every wait with the error
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                          |
//! |-------------------|-------------------------------------------------------------------|---------------------------------------------|
//! | **Handlers**      | Sync or async callables, registered by identity.                  | [`Handler`], [`HandlerFn`], [`AsyncHandlerFn`] |
//! | **Hooks**         | Definitions, instances, deadlines, lazy result streams.           | [`HookDef`], [`Hook`], [`TimeoutHook`]      |
//! | **Events**        | Broadcast, one-shot waits, weak proxies, null placeholders.       | [`Emitter`], [`VirtualEmitter`]             |
//! | **Store**         | Track spawned futures, bulk wait and cancel.                      | [`FutureStore`], [`Tracked`]                |
//! | **Errors**        | Typed errors for dispatch and handler failures.                   | [`HookError`], [`HandlerError`]             |
//! | **Configuration** | Default hook deadline, bulk-wait bound.                           | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exposes [`logging::init`], a `tracing-subscriber` fmt setup driven by `RUST_LOG`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use hookvisor::{AsyncHandlerFn, Config, HandlerError, HandlerFn, HookDef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     hookvisor::logging::init();
//!
//!     let cfg = Config {
//!         timeout: Duration::from_secs(1),
//!         ..Config::default()
//!     };
//!
//!     // Definition: the result used when no handler produces one.
//!     let score = HookDef::from_fn("score", |_: &i32| Ok::<_, HandlerError>(0));
//!     let hook = score.with_defaults(&cfg);
//!     assert_eq!(hook.call(&4).await?, 0);
//!
//!     hook.add_impl(HandlerFn::arc("failing", |_: &i32| Err::<i32, _>(HandlerError::from("nope"))))
//!         .add_impl(HandlerFn::arc("minus", |a: &i32| Ok(a - 1)))
//!         .add_impl(AsyncHandlerFn::arc("plus", |a: i32| async move {
//!             Ok::<_, HandlerError>(a + 2)
//!         }));
//!
//!     assert_eq!(hook.gather(&4).await?, vec![3, 6]);
//!     assert_eq!(hook.call(&4).await?, 3);
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod handlers;
mod hooks;
mod store;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{AbortError, BoxError, HandlerError, HookError};
pub use events::{
    ConnectObserver, Emitter, MultiVirtualEmitter, NullEmitter, NullMessage, NullVirtualEmitter,
    VirtualEmitter, Wait, null_emitter, null_virtual_emitter,
};
pub use handlers::{
    AsyncHandler, AsyncHandlerFn, Handler, HandlerFn, HandlerList, HandlerRef, ImplTarget, Reply,
    ReplaceSlot, from_async, same_handler,
};
pub use hooks::{Hook, HookDef, ResultStream, TimeoutHook};
pub use store::{FutureStore, Tracked};

// Optional: expose a tracing-subscriber setup.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub mod logging;
