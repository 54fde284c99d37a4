//! Error types used by hooks, emitters and the future store.
//!
//! This module defines two enums:
//!
//! - [`HookError`] - conditions that surface to the caller of a dispatch, a wait or a tracked future.
//! - [`HandlerError`] - what a single handler reports back to the dispatch engine.
//!
//! Only cancellation, timeout, no-valid-result and abort conditions ever reach a caller.
//! Ordinary handler failures are isolated and logged by the engine.
//!
//! Both types provide `as_label` for logs/metrics.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error carried by a failed handler.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared error delivered verbatim to every pending waiter on [`Emitter::abort`](crate::Emitter::abort).
pub type AbortError = Arc<dyn StdError + Send + Sync + 'static>;

/// # Errors surfaced by hookvisor operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum HookError {
    /// The dispatch (or wait) was cancelled. Never isolated.
    #[error("cancelled")]
    Cancelled,

    /// `first` found no handler producing a result (all failed, or none registered).
    #[error("no valid result")]
    NoValidResult,

    /// A deadline elapsed before the wrapped dispatch completed.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// `replace_impl` was given a handler that is not registered.
    #[error("handler is not registered")]
    ImplNotFound,

    /// `replace_impl` was given a position past the end of the list.
    #[error("index {index} out of range for {len} handlers")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// List length at the time of the call.
        len: usize,
    },

    /// The hook definition itself failed while serving as fallback.
    #[error("hook definition failed: {source}")]
    Fallback {
        /// Failure reported by the definition.
        #[source]
        source: Arc<HandlerError>,
    },

    /// A pending wait was resolved by [`Emitter::abort`](crate::Emitter::abort) with an explicit error.
    #[error("aborted: {source}")]
    Aborted {
        /// The error handed to `abort`, shared by every waiter.
        #[source]
        source: AbortError,
    },
}

impl HookError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use hookvisor::HookError;
    /// use std::time::Duration;
    ///
    /// let err = HookError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "hook_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HookError::Cancelled => "hook_cancelled",
            HookError::NoValidResult => "hook_no_valid_result",
            HookError::Timeout { .. } => "hook_timeout",
            HookError::ImplNotFound => "hook_impl_not_found",
            HookError::IndexOutOfRange { .. } => "hook_index_out_of_range",
            HookError::Fallback { .. } => "hook_fallback_failed",
            HookError::Aborted { .. } => "hook_aborted",
        }
    }

    /// True for [`HookError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HookError::Cancelled)
    }

    /// True for [`HookError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, HookError::Timeout { .. })
    }

    /// True for [`HookError::NoValidResult`].
    pub fn is_no_valid_result(&self) -> bool {
        matches!(self, HookError::NoValidResult)
    }

    /// Builds an [`HookError::Aborted`] from any error value.
    pub fn aborted<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        HookError::Aborted {
            source: Arc::new(err),
        }
    }
}

/// # Outcome reported by a failing handler.
///
/// `Failed` is isolated by the dispatch engine (logged, result skipped).
/// `Cancelled` aborts the whole dispatch and reaches the caller as [`HookError::Cancelled`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Ordinary failure; the handler contributes no result.
    #[error("{0}")]
    Failed(BoxError),

    /// Cancellation signal raised from inside a handler.
    #[error("handler cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Wraps any error as [`HandlerError::Failed`].
    ///
    /// ```
    /// use hookvisor::HandlerError;
    ///
    /// let parsed: Result<i32, HandlerError> = "x".parse::<i32>().map_err(HandlerError::fail);
    /// assert!(parsed.is_err());
    /// ```
    pub fn fail<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        HandlerError::Failed(err.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed(_) => "handler_failed",
            HandlerError::Cancelled => "handler_cancelled",
        }
    }

    /// True for [`HandlerError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HandlerError::Cancelled)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        HandlerError::Failed(msg.into())
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        HandlerError::Failed(msg.into())
    }
}

impl From<BoxError> for HandlerError {
    fn from(err: BoxError) -> Self {
        HandlerError::Failed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(HookError::Cancelled.as_label(), "hook_cancelled");
        assert_eq!(HookError::NoValidResult.as_label(), "hook_no_valid_result");
        assert_eq!(HookError::ImplNotFound.as_label(), "hook_impl_not_found");
        assert_eq!(HandlerError::Cancelled.as_label(), "handler_cancelled");
        assert_eq!(HandlerError::from("boom").as_label(), "handler_failed");
    }

    #[test]
    fn test_predicates() {
        let timeout = HookError::Timeout {
            timeout: Duration::from_millis(5),
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_no_valid_result());
        assert!(HookError::NoValidResult.is_no_valid_result());
        assert!(HookError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_aborted_keeps_source_message() {
        let err = HookError::aborted(std::io::Error::other("link down"));
        assert_eq!(err.to_string(), "aborted: link down");
        assert_eq!(err.as_label(), "hook_aborted");
    }
}
