//! Computed keys: dependencies derived from another dependency by a pure
//! transform of its provider.
//!
//! Each variant receives the inner provider (or the inner failure) and turns
//! it into a provider (or failure) for its own output. They compose freely,
//! `key.lazy().optional()` resolves in two steps.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::container::dependency::Dependency;
use crate::container::flow::{Flow, Provider, SharedFuture, Value};
use crate::container::resolver::Resolution;
use crate::container::Container;
use crate::errors::Result;

/// Deferred handle produced by [`LazyKey`]; the first call runs the
/// inner producer and later calls reuse its value
pub struct Lazy<T> {
    provider: Provider<T>,
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
        }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lazy<{}>", std::any::type_name::<T>())
    }
}

impl<T: Value> Lazy<T> {
    fn new(provider: Provider<T>) -> Self {
        Self {
            provider: provider.memoize(),
        }
    }

    /// Get the value, failing if it is produced asynchronously
    pub fn get(&self) -> Result<T> {
        self.provider.get()
    }

    /// Wait for the value
    pub async fn get_async(&self) -> T {
        self.provider.get_async().await
    }

    /// Get the value in whichever shape it is produced
    pub fn flow(&self) -> Flow<T> {
        self.provider.flow()
    }
}

/// Computed key producing a [`Lazy`] handle
#[derive(Debug, Clone)]
pub struct LazyKey<D> {
    inner: D,
}

impl<D> LazyKey<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: Dependency> Dependency for LazyKey<D> {
    type Output = Lazy<D::Output>;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        let lazy = Lazy::new(self.inner.resolve(cx)?);
        Ok(Provider::constant(lazy))
    }

    fn describe(&self) -> String {
        format!("Lazy({})", self.inner.describe())
    }
}

/// Computed key producing the inner [`Provider`] without invoking it
#[derive(Debug, Clone)]
pub struct ProviderKey<D> {
    inner: D,
}

impl<D> ProviderKey<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: Dependency> Dependency for ProviderKey<D> {
    type Output = Provider<D::Output>;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        Ok(Provider::constant(self.inner.resolve(cx)?))
    }

    fn describe(&self) -> String {
        format!("Provider({})", self.inner.describe())
    }
}

/// Computed key producing `None` when the inner key has no provider.
///
/// Only absence is masked: an inner key that exists but fails to resolve
/// still fails the request.
#[derive(Debug, Clone)]
pub struct OptionalKey<D> {
    inner: D,
}

impl<D> OptionalKey<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: Dependency> Dependency for OptionalKey<D> {
    type Output = Option<D::Output>;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        match self.inner.resolve(cx) {
            Ok(provider) => Ok(provider.map(Some)),
            Err(error) if error.is_key_not_provided() => Ok(Provider::constant(None)),
            Err(error) => Err(error),
        }
    }

    fn describe(&self) -> String {
        format!("Optional({})", self.inner.describe())
    }
}

/// Computed key producing a future of the inner value, whether or not the
/// inner producer is asynchronous
#[derive(Debug, Clone)]
pub struct AsyncKey<D> {
    inner: D,
}

impl<D> AsyncKey<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: Dependency> Dependency for AsyncKey<D> {
    type Output = SharedFuture<D::Output>;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        let inner = self.inner.resolve(cx)?;
        Ok(Provider::new(move || {
            Flow::Ready(inner.flow().into_future().shared())
        }))
    }

    fn describe(&self) -> String {
        format!("Async({})", self.inner.describe())
    }
}

/// Computed key applying a transform to the inner value.
///
/// Transforms are infallible; a panic inside one unwinds out of whoever
/// invokes the producer.
pub struct MapKey<D: Dependency, U> {
    inner: D,
    transform: Arc<dyn Fn(D::Output) -> U + Send + Sync>,
}

impl<D: Dependency, U: Value> MapKey<D, U> {
    pub fn new<F>(inner: D, transform: F) -> Self
    where
        F: Fn(D::Output) -> U + Send + Sync + 'static,
    {
        Self {
            inner,
            transform: Arc::new(transform),
        }
    }
}

impl<D: Dependency + Clone, U> Clone for MapKey<D, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            transform: self.transform.clone(),
        }
    }
}

impl<D: Dependency + fmt::Debug, U> fmt::Debug for MapKey<D, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapKey").field("inner", &self.inner).finish()
    }
}

impl<D: Dependency, U: Value> Dependency for MapKey<D, U> {
    type Output = U;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<U>> {
        let transform = self.transform.clone();
        Ok(self.inner.resolve(cx)?.map(move |value| transform(value)))
    }

    fn describe(&self) -> String {
        format!("Map({})", self.inner.describe())
    }
}

/// Computed key chaining an asynchronous step after the inner value.
/// Backs asynchronous initializers.
pub(crate) struct ThenKey<D: Dependency, U> {
    inner: D,
    step: Arc<dyn Fn(D::Output) -> BoxFuture<'static, U> + Send + Sync>,
}

impl<D: Dependency, U: Value> ThenKey<D, U> {
    pub(crate) fn new<F, Fut>(inner: D, step: F) -> Self
    where
        F: Fn(D::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        Self {
            inner,
            step: Arc::new(move |value: D::Output| step(value).boxed()),
        }
    }
}

impl<D: Dependency, U: Value> Dependency for ThenKey<D, U> {
    type Output = U;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<U>> {
        let inner = self.inner.resolve(cx)?;
        let step = self.step.clone();
        Ok(Provider::new(move || {
            let step = step.clone();
            inner.flow().then(move |value| step(value))
        }))
    }

    fn describe(&self) -> String {
        format!("Async initializer({})", self.inner.describe())
    }
}

/// Computed key wrapping a precomputed value; resolution never touches the
/// container
#[derive(Debug, Clone)]
pub struct ValueKey<T> {
    value: T,
}

impl<T: Value> ValueKey<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Value> Dependency for ValueKey<T> {
    type Output = T;

    fn resolve(&self, _cx: &mut Resolution<'_>) -> Result<Provider<T>> {
        Ok(Provider::constant(self.value.clone()))
    }

    fn describe(&self) -> String {
        format!("Value<{}>", std::any::type_name::<T>())
    }
}

/// Reserved dependency resolving to the container the binding is resolved on.
///
/// An initializer requesting, through this handle, the key it is itself
/// initializing gets a `DependencyCycle` error instead of a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentContainer;

/// The reserved "current container" dependency
pub const CONTAINER: CurrentContainer = CurrentContainer;

impl Dependency for CurrentContainer {
    type Output = Container;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Container>> {
        Ok(Provider::constant(cx.container().clone()))
    }

    fn describe(&self) -> String {
        "Container".to_string()
    }
}

/// Cloneable callable produced by factory keys
pub struct Factory<Args, R> {
    call: Arc<dyn Fn(Args) -> R + Send + Sync>,
}

impl<Args, R> Clone for Factory<Args, R> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
        }
    }
}

impl<Args, R> fmt::Debug for Factory<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Factory<{} -> {}>",
            std::any::type_name::<Args>(),
            std::any::type_name::<R>()
        )
    }
}

impl<Args: 'static, R: 'static> Factory<Args, R> {
    /// Wrap a function taking its arguments as a tuple
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(Args) -> R + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(call),
        }
    }

    /// Invoke the factory
    pub fn call(&self, args: Args) -> R {
        (self.call)(args)
    }

    /// Fix the leading arguments, returning a factory over the rest
    pub fn bind<B>(&self, bound: B) -> Factory<Args::Rest, R>
    where
        Args: Curry<B>,
        Args::Rest: 'static,
        B: Clone + Send + Sync + 'static,
    {
        let call = self.call.clone();
        Factory::new(move |rest| call(Args::join(bound.clone(), rest)))
    }
}

/// Split of an argument tuple into a bound prefix and the remaining suffix
pub trait Curry<Bound>: Sized {
    type Rest;

    fn join(bound: Bound, rest: Self::Rest) -> Self;
}

macro_rules! curry {
    (($($bound:ident),*) ($($rest:ident),*)) => {
        impl<$($bound,)* $($rest,)*> Curry<($($bound,)*)> for ($($bound,)* $($rest,)*) {
            type Rest = ($($rest,)*);

            #[allow(non_snake_case, clippy::unused_unit)]
            fn join(($($bound,)*): ($($bound,)*), ($($rest,)*): Self::Rest) -> Self {
                ($($bound,)* $($rest,)*)
            }
        }
    };
}

curry!(() ());
curry!(() (A));
curry!((A) ());
curry!(() (A, B));
curry!((A) (B));
curry!((A, B) ());
curry!(() (A, B, C));
curry!((A) (B, C));
curry!((A, B) (C));
curry!((A, B, C) ());
curry!(() (A, B, C, D));
curry!((A) (B, C, D));
curry!((A, B) (C, D));
curry!((A, B, C) (D));
curry!((A, B, C, D) ());

/// Computed key partially applying a [`Factory`]
#[derive(Debug, Clone)]
pub struct BuildKey<D, B> {
    inner: D,
    bound: B,
}

impl<D, B> BuildKey<D, B> {
    pub fn new(inner: D, bound: B) -> Self {
        Self { inner, bound }
    }
}

impl<D, B, Args, R> Dependency for BuildKey<D, B>
where
    D: Dependency<Output = Factory<Args, R>>,
    Args: Curry<B> + 'static,
    Args::Rest: 'static,
    R: 'static,
    B: Clone + Send + Sync + 'static,
{
    type Output = Factory<Args::Rest, R>;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        let bound = self.bound.clone();
        Ok(self
            .inner
            .resolve(cx)?
            .map(move |factory| factory.bind(bound.clone())))
    }

    fn describe(&self) -> String {
        format!("Build({})", self.inner.describe())
    }
}
