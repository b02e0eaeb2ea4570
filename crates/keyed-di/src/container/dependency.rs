use std::sync::Arc;

use crate::container::computed::{
    AsyncKey, BuildKey, Curry, Factory, LazyKey, MapKey, OptionalKey, ProviderKey,
};
use crate::container::flow::{Provider, Value};
use crate::container::resolver::Resolution;
use crate::errors::Result;

/// Anything a container can resolve into a [`Provider`].
///
/// Implemented by [`Key`](crate::Key), by every computed key, and by
/// structured requests (tuples, vectors, arrays and string maps of
/// dependencies). Resolution walks the provider graph without invoking any
/// initializer; the returned provider performs the actual work when called.
pub trait Dependency: Send + Sync {
    /// Value produced once resolved
    type Output: Value;

    /// Resolve the provider graph below this dependency
    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>>;

    /// Human readable description used in diagnostics
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<D: Dependency + ?Sized> Dependency for &D {
    type Output = D::Output;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        (**self).resolve(cx)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<D: Dependency + ?Sized> Dependency for Arc<D> {
    type Output = D::Output;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        (**self).resolve(cx)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Derived keys available on every dependency.
///
/// Each call returns a new computed key wrapping a clone of `self`; no
/// container is involved until the derived key is requested.
pub trait DependencyExt: Dependency + Clone + Sized {
    /// Defer resolution until first use, then reuse the value
    fn lazy(&self) -> LazyKey<Self> {
        LazyKey::new(self.clone())
    }

    /// Hand out the producer itself without invoking it
    fn provider(&self) -> ProviderKey<Self> {
        ProviderKey::new(self.clone())
    }

    /// Yield `None` when the dependency has no provider
    fn optional(&self) -> OptionalKey<Self> {
        OptionalKey::new(self.clone())
    }

    /// Always produce a future, even for synchronous producers
    fn into_async(&self) -> AsyncKey<Self> {
        AsyncKey::new(self.clone())
    }

    /// Transform the produced value, keeping its sync/async shape
    fn map<U, F>(&self, f: F) -> MapKey<Self, U>
    where
        U: Value,
        F: Fn(Self::Output) -> U + Send + Sync + 'static,
    {
        MapKey::new(self.clone(), f)
    }

    /// Partially apply a factory to leading arguments
    fn build<Args, R, B>(&self, bound: B) -> BuildKey<Self, B>
    where
        Self: Dependency<Output = Factory<Args, R>>,
        Args: Curry<B> + 'static,
        Args::Rest: 'static,
        R: 'static,
        B: Clone + Send + Sync + 'static,
    {
        BuildKey::new(self.clone(), bound)
    }
}

impl<D: Dependency + Clone> DependencyExt for D {}
