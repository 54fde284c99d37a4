//! Process-wide placeholder emitters.
//!
//! Handy as a default for optional event sources: waiting on the null virtual emitter
//! returns `Ok(None)` at once, and the null emitter only resolves when someone emits on it.
//!
//! Both placeholders are shared by the whole process, so neither exposes a way to add
//! listeners or bind a source: their handler lists stay empty for the process lifetime.

use std::sync::OnceLock;

use crate::error::{AbortError, HookError};
use crate::events::emitter::{Emitter, Wait};
use crate::events::virtual_emitter::VirtualEmitter;

/// Empty event payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NullMessage;

impl From<()> for NullMessage {
    fn from(_: ()) -> Self {
        NullMessage
    }
}

/// Listener-free emitter returned by [`null_emitter`].
#[derive(Debug)]
pub struct NullEmitter {
    inner: Emitter<NullMessage>,
}

impl NullEmitter {
    /// Always `"null"`.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Always `false`; listeners cannot be registered.
    pub fn has_listeners(&self) -> bool {
        !self.inner.listeners().is_empty()
    }

    /// Number of waits currently pending.
    pub fn pending_waits(&self) -> usize {
        self.inner.pending_waits()
    }

    /// See [`Emitter::wait`].
    pub fn wait(&self) -> Wait<'_, NullMessage> {
        self.inner.wait()
    }

    /// Resolves every pending wait with [`NullMessage`].
    pub async fn emit(&self) -> Result<(), HookError> {
        self.inner.emit(NullMessage).await
    }

    /// See [`Emitter::abort`].
    pub fn abort(&self, error: Option<AbortError>) {
        self.inner.abort(error);
    }
}

/// Never-bound virtual emitter returned by [`null_virtual_emitter`].
#[derive(Debug)]
pub struct NullVirtualEmitter {
    inner: VirtualEmitter<NullMessage>,
}

impl NullVirtualEmitter {
    /// Always `false`.
    pub fn connected(&self) -> bool {
        self.inner.connected()
    }

    /// Always `Ok(None)`, without suspending.
    pub async fn wait(&self) -> Result<Option<NullMessage>, HookError> {
        self.inner.wait().await
    }
}

static NULL_EMITTER: OnceLock<NullEmitter> = OnceLock::new();
static NULL_VIRTUAL_EMITTER: OnceLock<NullVirtualEmitter> = OnceLock::new();

/// The shared null emitter. Every call returns the same instance.
pub fn null_emitter() -> &'static NullEmitter {
    NULL_EMITTER.get_or_init(|| NullEmitter {
        inner: Emitter::new("null"),
    })
}

/// The shared, never-bound null virtual emitter. Every call returns the same instance.
pub fn null_virtual_emitter() -> &'static NullVirtualEmitter {
    NULL_VIRTUAL_EMITTER.get_or_init(|| NullVirtualEmitter {
        inner: VirtualEmitter::new(),
    })
}
