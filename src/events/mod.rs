//! Event sources: emitters, virtual emitters and null placeholders.
//!
//! ## Contents
//! - [`Emitter`] listener list plus one-shot waits, with `emit` and `abort`
//! - [`Wait`] future returned by [`Emitter::wait`]
//! - [`VirtualEmitter`] weak proxy bound later with `connect`
//! - [`MultiVirtualEmitter`] weak fan-in; waits on the first live source
//! - [`null_emitter`], [`null_virtual_emitter`] process-wide placeholders without listeners

mod emitter;
mod null;
mod virtual_emitter;

pub use emitter::{Emitter, Wait};
pub use null::{NullEmitter, NullMessage, NullVirtualEmitter, null_emitter, null_virtual_emitter};
pub use virtual_emitter::{ConnectObserver, MultiVirtualEmitter, VirtualEmitter};
