use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::container::computed::{MapKey, ThenKey};
use crate::container::dependency::Dependency;
use crate::container::flow::{Provider, Value};
use crate::container::key::{Key, KeyInfo};
use crate::container::resolver::{self, Resolution};
use crate::errors::Result;

/// How a key is produced once registered.
///
/// A closed set of variants, each resolved by one arm of [`Binding::provider`].
pub enum Binding<T> {
    /// Synchronous initializer over declared dependencies
    Initializer(Arc<dyn Dependency<Output = T>>),
    /// Initializer whose result is a future
    AsyncInitializer(Arc<dyn Dependency<Output = T>>),
    /// Any dependency producing `T`, typically a computed key
    Computed(Arc<dyn Dependency<Output = T>>),
    /// Precomputed constant
    Instance(T),
    /// Resolve through another key
    Alias(Key<T>),
}

impl<T: Value> Binding<T> {
    /// Initializer receiving the resolved `deps`
    pub fn initializer<D, F>(deps: D, init: F) -> Self
    where
        D: Dependency + 'static,
        F: Fn(D::Output) -> T + Send + Sync + 'static,
    {
        Binding::Initializer(Arc::new(MapKey::new(deps, init)))
    }

    /// Asynchronous initializer receiving the resolved `deps`
    pub fn async_initializer<D, F, Fut>(deps: D, init: F) -> Self
    where
        D: Dependency + 'static,
        F: Fn(D::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Binding::AsyncInitializer(Arc::new(ThenKey::new(deps, init)))
    }

    /// Initializer without dependencies
    pub fn from_fn<F>(init: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::initializer((), move |()| init())
    }

    /// Produce `T` by resolving `source`
    pub fn computed<D>(source: D) -> Self
    where
        D: Dependency<Output = T> + 'static,
    {
        Binding::Computed(Arc::new(source))
    }

    /// Constant value
    pub fn instance(value: T) -> Self {
        Binding::Instance(value)
    }

    /// Resolve through `source`
    pub fn alias(source: &Key<T>) -> Self {
        Binding::Alias(source.clone())
    }

    /// Get the variant of this binding
    pub fn kind(&self) -> BindingKind {
        match self {
            Binding::Initializer(_) => BindingKind::Initializer,
            Binding::AsyncInitializer(_) => BindingKind::AsyncInitializer,
            Binding::Computed(_) => BindingKind::Computed,
            Binding::Instance(_) => BindingKind::Instance,
            Binding::Alias(_) => BindingKind::Alias,
        }
    }

    /// Resolve the provider graph below this binding
    pub(crate) fn provider(&self, cx: &mut Resolution<'_>) -> Result<Provider<T>> {
        match self {
            Binding::Initializer(deps)
            | Binding::AsyncInitializer(deps)
            | Binding::Computed(deps) => deps.resolve(cx),
            Binding::Instance(value) => Ok(Provider::constant(value.clone())),
            Binding::Alias(source) => cx.resolve_key(source),
        }
    }
}

impl<T: Value> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Initializer(deps) => write!(f, "Initializer({})", deps.describe()),
            Binding::AsyncInitializer(deps) => write!(f, "AsyncInitializer({})", deps.describe()),
            Binding::Computed(source) => write!(f, "Computed({})", source.describe()),
            Binding::Instance(_) => write!(f, "Instance<{}>", std::any::type_name::<T>()),
            Binding::Alias(source) => write!(f, "Alias({})", source.info()),
        }
    }
}

/// Variant tag of a binding, reported in snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Initializer,
    AsyncInitializer,
    Computed,
    Instance,
    Alias,
}

/// Provider with its value type erased so entries of any key share one table
pub(crate) type ErasedProvider = Arc<dyn Any + Send + Sync>;

/// Type-erased view of a [`Binding`] stored by entries
pub(crate) trait ErasedBinding: Send + Sync {
    fn kind(&self) -> BindingKind;

    /// Resolve into a `Provider<T>` wrapped as [`ErasedProvider`], memoized
    /// when the entry caches its instance. Invocations are attributed to
    /// `key` while they run.
    fn resolve_erased(&self, cx: &mut Resolution<'_>, key: &KeyInfo, memoize: bool) -> Result<ErasedProvider>;
}

impl<T: Value> ErasedBinding for Binding<T> {
    fn kind(&self) -> BindingKind {
        Binding::kind(self)
    }

    fn resolve_erased(&self, cx: &mut Resolution<'_>, key: &KeyInfo, memoize: bool) -> Result<ErasedProvider> {
        let provider = self.provider(cx)?;
        let provider = match self {
            Binding::Instance(_) => provider,
            _ if memoize => resolver::track_invocation(provider, key.id).memoize(),
            _ => resolver::track_invocation(provider, key.id),
        };
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_kinds() {
        let source = Key::<u32>::named("source");

        assert_eq!(Binding::instance(1u32).kind(), BindingKind::Instance);
        assert_eq!(Binding::from_fn(|| 1u32).kind(), BindingKind::Initializer);
        assert_eq!(Binding::alias(&source).kind(), BindingKind::Alias);
        assert_eq!(Binding::computed(source.clone()).kind(), BindingKind::Computed);
        assert_eq!(
            Binding::async_initializer((), |()| async { 1u32 }).kind(),
            BindingKind::AsyncInitializer
        );
    }

    #[test]
    fn test_binding_debug() {
        let source = Key::<u32>::named("source");
        assert_eq!(format!("{:?}", Binding::alias(&source)), "Alias(source)");
        assert_eq!(format!("{:?}", Binding::instance(1u32)), "Instance<u32>");
        assert_eq!(
            format!("{:?}", Binding::initializer(source.clone(), |n: u32| n + 1)),
            "Initializer(Map(source))"
        );
    }

    #[test]
    fn test_binding_kind_serializes_snake_case() {
        let json = serde_json::to_string(&BindingKind::AsyncInitializer).unwrap();
        assert_eq!(json, "\"async_initializer\"");
    }
}
