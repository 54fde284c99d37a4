//! # Global hookvisor configuration.
//!
//! Provides [`Config`] centralized defaults for hooks and future stores.
//!
//! Config is used in two ways:
//! 1. **Timed hooks**: `HookDef::with_defaults(&config)`
//! 2. **Future stores**: `FutureStore::with_config(&config)`
//!
//! ## Sentinel values
//! - `timeout = 0s` → no deadline (the timed hook behaves like a plain one)
//! - `wait_passes = 0` → `FutureStore::wait(true)` loops until the store stays empty

use std::time::Duration;

/// Global configuration for hooks and future stores.
///
/// ## Field semantics
/// - `timeout`: default deadline for `gather`/`first` on timed hooks (`0s` = none)
/// - `wait_passes`: upper bound on bulk-wait passes that chase newly added futures (`0` = unbounded)
///
/// ## Notes
/// All fields are public. Prefer the accessors to avoid sprinkling sentinel checks (`0`)
/// across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Default deadline for timed hooks.
    ///
    /// Measured from the moment the wrapped call starts.
    pub timeout: Duration,

    /// Maximum number of passes `FutureStore::wait(true)` makes before returning.
    pub wait_passes: usize,
}

impl Config {
    /// Returns the default hook deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → `gather`/`first` fail with `Timeout` after `d`
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns the bulk-wait pass limit as an `Option`.
    #[inline]
    pub fn wait_pass_limit(&self) -> Option<usize> {
        if self.wait_passes == 0 {
            None
        } else {
            Some(self.wait_passes)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `timeout = 0s` (no deadline)
    /// - `wait_passes = 0` (unbounded)
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            wait_passes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_disable_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.default_timeout(), None);
        assert_eq!(cfg.wait_pass_limit(), None);
    }

    #[test]
    fn test_non_zero_values_are_exposed() {
        let cfg = Config {
            timeout: Duration::from_millis(250),
            wait_passes: 3,
        };
        assert_eq!(cfg.default_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.wait_pass_limit(), Some(3));
    }
}
