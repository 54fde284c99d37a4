//! # Built-in log output _(optional `logging` feature)_.
//!
//! Installs a `tracing-subscriber` fmt layer so the crate's records show up without any
//! setup from the caller:
//!
//! | Level   | Record                                  | Fields                               |
//! |---------|-----------------------------------------|--------------------------------------|
//! | `error` | `handler failed`                        | `hook`, `handler`, `point`, `error`  |
//! | `warn`  | `hook dispatch timed out`               | `hook`, `timeout`                    |
//! | `warn`  | `future store wait stopped at pass limit` | `passes`, `remaining`              |
//! | `debug` | `aborting pending waits`                | `emitter`, `waits`, `with_error`     |
//! | `debug` | `cancelling tracked futures`            | `tasks`                              |
//!
//! The filter comes from `RUST_LOG` and defaults to `info`.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info";

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Installs the global subscriber.
///
/// Safe to call more than once. Returns `false` when another global subscriber was
/// already installed by someone else, in which case nothing changes.
pub fn init() -> bool {
    *INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
            .is_ok()
    })
}
