//! # Hooks: definitions, instances and the dispatch engine.
//!
//! - [`HookDef`] - immutable template (name + fallback definition)
//! - [`Hook`] - instance with its own handler list and the dispatch modes
//! - [`TimeoutHook`] - instance whose `gather`/`first` run under a deadline
//! - [`ResultStream`] - lazy, isolated stream of successful results
//!
//! Internal modules:
//! - [`dispatch`]: invokes a handler snapshot, isolates failures, realizes results.

mod def;
pub(crate) mod dispatch;
mod hook;
mod timeout;

pub use def::HookDef;
pub use dispatch::ResultStream;
pub use hook::Hook;
pub use timeout::TimeoutHook;
