//! # Hook definitions.
//!
//! A [`HookDef`] is the immutable template behind a family of hook instances: a name
//! plus the definition handler that serves as fallback for [`Hook::call`].
//!
//! A definition can be turned into:
//! - **Plain instances** with [`HookDef::instance`]
//! - **Timed instances** with [`HookDef::with_timeout`] or [`HookDef::with_defaults`]
//!
//! ## Rules
//! - Every instance owns its own, initially empty, handler list.
//! - Instances never share handler state with each other or with the definition.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HandlerError, HookError};
use crate::handlers::{AsyncHandlerFn, HandlerFn, HandlerRef};
use crate::hooks::dispatch;
use crate::hooks::hook::Hook;
use crate::hooks::timeout::TimeoutHook;

/// Immutable hook template.
///
/// ## Example
/// ```rust
/// use hookvisor::{HandlerError, HandlerFn, HookDef};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let on_score = HookDef::from_fn("on_score", |_: &i32| Ok::<_, HandlerError>(0));
///
/// let hook = on_score.instance();
/// assert_eq!(hook.call(&4).await.unwrap(), 0);
///
/// hook.add_impl(HandlerFn::arc("minus-one", |a: &i32| Ok(a - 1)));
/// assert_eq!(hook.call(&4).await.unwrap(), 3);
/// # }
/// ```
pub struct HookDef<A, T> {
    name: Arc<str>,
    definition: HandlerRef<A, T>,
}

impl<A, T> HookDef<A, T>
where
    A: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Creates a definition backed by an existing handler.
    pub fn new(name: impl Into<Cow<'static, str>>, definition: HandlerRef<A, T>) -> Arc<Self> {
        let name: Cow<'static, str> = name.into();
        Arc::new(Self {
            name: Arc::from(name.as_ref()),
            definition,
        })
    }

    /// Creates a definition from a synchronous function.
    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(&A) -> Result<T, HandlerError> + Send + Sync + 'static,
    {
        let name: Cow<'static, str> = name.into();
        Self::new(name.clone(), HandlerFn::arc(name, f))
    }

    /// Creates a definition from an asynchronous function.
    pub fn from_async<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        A: Clone,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
    {
        let name: Cow<'static, str> = name.into();
        Self::new(name.clone(), AsyncHandlerFn::arc(name, f))
    }

    /// Hook name, used in failure logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    /// The definition handler.
    pub fn definition(&self) -> &HandlerRef<A, T> {
        &self.definition
    }

    /// Runs the definition itself, bypassing any registered handler.
    pub async fn invoke(&self, args: &A) -> Result<T, HookError> {
        dispatch::fallback(&self.name, &self.definition, args).await
    }

    /// Creates a new instance with an empty handler list.
    pub fn instance(self: &Arc<Self>) -> Hook<A, T> {
        Hook::new(Arc::clone(self))
    }

    /// Creates a new instance whose `gather`/`first` are bounded by `timeout`.
    ///
    /// A zero duration means no deadline.
    pub fn with_timeout(self: &Arc<Self>, timeout: Duration) -> TimeoutHook<A, T> {
        TimeoutHook::new(self.instance(), timeout)
    }

    /// Creates a timed instance using [`Config::timeout`] as deadline.
    pub fn with_defaults(self: &Arc<Self>, cfg: &Config) -> TimeoutHook<A, T> {
        TimeoutHook::with_deadline(self.instance(), cfg.default_timeout())
    }
}

impl<A: 'static, T: 'static> fmt::Debug for HookDef<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDef")
            .field("name", &self.name)
            .field("definition", &self.definition.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instances_do_not_share_handlers() {
        let def = HookDef::from_fn("shared", |_: &i32| Ok::<_, HandlerError>(0));
        let a = def.instance();
        let b = def.instance();

        a.add_impl(HandlerFn::arc("a", |x: &i32| Ok(x + 1)));
        assert!(a.has_impl());
        assert!(!b.has_impl());
        assert_eq!(b.call(&1).await.unwrap(), 0);
        assert_eq!(a.call(&1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_async_definition_is_invoked() {
        let def = HookDef::from_async("async-def", |a: i32| async move {
            Ok::<_, HandlerError>(a * 100)
        });
        assert_eq!(def.invoke(&3).await.unwrap(), 300);
        assert_eq!(def.name(), "async-def");
    }

    #[test]
    fn test_with_defaults_uses_config_timeout() {
        let def = HookDef::from_fn("timed", |_: &i32| Ok::<_, HandlerError>(0));
        let untimed = def.with_defaults(&Config::default());
        assert_eq!(untimed.timeout(), None);

        let cfg = Config {
            timeout: Duration::from_millis(30),
            ..Config::default()
        };
        assert_eq!(def.with_defaults(&cfg).timeout(), Some(Duration::from_millis(30)));
    }
}
