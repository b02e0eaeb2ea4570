//! Sync/async duality shared by the whole engine.
//!
//! A resolved dependency is a [`Provider`]: calling it yields a [`Flow`],
//! either a ready value or a future of one. Every combinator in the crate is
//! written once against `Flow` instead of twice against sync and async code.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::errors::{DiError, Result};

/// Bound shared by every value a container can hand out
pub trait Value: Clone + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Send + Sync + 'static {}

/// Future that may be awaited from several places, yielding a clone each time
pub type SharedFuture<T> = Shared<BoxFuture<'static, T>>;

/// Output of invoking a provider
pub enum Flow<T> {
    /// Value available synchronously
    Ready(T),
    /// Value produced once the future completes
    Pending(BoxFuture<'static, T>),
}

impl<T: Send + 'static> Flow<T> {
    /// Check if the value is available synchronously
    pub fn is_ready(&self) -> bool {
        matches!(self, Flow::Ready(_))
    }

    /// Take the value if it is available synchronously
    pub fn into_ready(self) -> Option<T> {
        match self {
            Flow::Ready(value) => Some(value),
            Flow::Pending(_) => None,
        }
    }

    /// Apply `f` to the value, keeping the sync/async shape
    pub fn map<U, F>(self, f: F) -> Flow<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Flow::Ready(value) => Flow::Ready(f(value)),
            Flow::Pending(pending) => Flow::Pending(pending.map(f).boxed()),
        }
    }

    /// Chain an asynchronous step; the result is always pending
    pub fn then<U, F, Fut>(self, f: F) -> Flow<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        match self {
            Flow::Ready(value) => Flow::Pending(f(value).boxed()),
            Flow::Pending(pending) => Flow::Pending(pending.then(f).boxed()),
        }
    }

    /// Convert into a future, ready immediately for synchronous values
    pub fn into_future(self) -> BoxFuture<'static, T> {
        match self {
            Flow::Ready(value) => future::ready(value).boxed(),
            Flow::Pending(pending) => pending,
        }
    }
}

impl<T> fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Ready(_) => write!(f, "Flow::Ready(..)"),
            Flow::Pending(_) => write!(f, "Flow::Pending(..)"),
        }
    }
}

/// Wait for every flow. Synchronous when all members are ready, otherwise
/// the pending members are awaited concurrently.
pub(crate) fn join_all<T: Send + 'static>(flows: Vec<Flow<T>>) -> Flow<Vec<T>> {
    if flows.iter().all(Flow::is_ready) {
        return Flow::Ready(flows.into_iter().filter_map(Flow::into_ready).collect());
    }
    let pending = flows.into_iter().map(Flow::into_future);
    Flow::Pending(future::join_all(pending).boxed())
}

/// Deferred value producer
pub struct Provider<T> {
    produce: Arc<dyn Fn() -> Flow<T> + Send + Sync>,
}

impl<T> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            produce: self.produce.clone(),
        }
    }
}

impl<T> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider<{}>", std::any::type_name::<T>())
    }
}

impl<T: Value> Provider<T> {
    /// Create a provider from a producing function
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn() -> Flow<T> + Send + Sync + 'static,
    {
        Self {
            produce: Arc::new(produce),
        }
    }

    /// Create a provider that always yields a clone of `value`
    pub fn constant(value: T) -> Self {
        Self::new(move || Flow::Ready(value.clone()))
    }

    /// Invoke the provider
    pub fn flow(&self) -> Flow<T> {
        (self.produce)()
    }

    /// Invoke the provider, failing if the value is only available asynchronously
    pub fn get(&self) -> Result<T> {
        self.flow()
            .into_ready()
            .ok_or_else(|| DiError::requested_async_as_sync(std::any::type_name::<T>()))
    }

    /// Invoke the provider and wait for the value
    pub async fn get_async(&self) -> T {
        self.flow().into_future().await
    }

    /// Create a provider applying `f` to every produced value
    pub fn map<U, F>(&self, f: F) -> Provider<U>
    where
        U: Value,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.clone();
        let f = Arc::new(f);
        Provider::new(move || {
            let f = f.clone();
            inner.flow().map(move |value| f(value))
        })
    }

    /// Wrap the provider so the inner producer runs at most once.
    ///
    /// A ready value is cached as is. A pending value is cached as a shared
    /// future right away, so concurrent callers await the same computation,
    /// and is replaced by the plain value once that future completes.
    pub(crate) fn memoize(self) -> Self {
        let cell = Arc::new(Mutex::new(MemoState::Unforced(self)));
        Provider::new(move || force(&cell))
    }
}

enum MemoState<T> {
    Unforced(Provider<T>),
    Pending(SharedFuture<T>),
    Instance(T),
}

fn force<T: Value>(cell: &Arc<Mutex<MemoState<T>>>) -> Flow<T> {
    // The lock is held while the inner producer runs so that racing callers
    // block instead of invoking it a second time.
    let mut state = cell.lock();
    let inner = match &*state {
        MemoState::Instance(value) => return Flow::Ready(value.clone()),
        MemoState::Pending(shared) => return Flow::Pending(shared.clone().boxed()),
        MemoState::Unforced(inner) => inner.clone(),
    };

    match inner.flow() {
        Flow::Ready(value) => {
            *state = MemoState::Instance(value.clone());
            Flow::Ready(value)
        }
        Flow::Pending(pending) => {
            let weak: Weak<Mutex<MemoState<T>>> = Arc::downgrade(cell);
            let shared = async move {
                let value = pending.await;
                if let Some(cell) = weak.upgrade() {
                    *cell.lock() = MemoState::Instance(value.clone());
                }
                value
            }
            .boxed()
            .shared();
            *state = MemoState::Pending(shared.clone());
            Flow::Pending(shared.boxed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(calls: Arc<AtomicUsize>) -> Provider<usize> {
        Provider::new(move || Flow::Ready(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }

    #[test]
    fn test_constant_provider() {
        let provider = Provider::constant("value".to_string());
        assert_eq!(provider.get().unwrap(), "value");
        assert_eq!(provider.get().unwrap(), "value");
    }

    #[test]
    fn test_map_keeps_sync_shape() {
        let provider = Provider::constant(20).map(|n| n + 1);
        assert!(provider.flow().is_ready());
        assert_eq!(provider.get().unwrap(), 21);
    }

    #[test]
    fn test_pending_provider_rejects_sync_get() {
        let provider = Provider::new(|| Flow::Pending(async { 5 }.boxed()));
        let error = provider.get().unwrap_err();
        assert!(error.is_requested_async_as_sync());
    }

    #[test]
    fn test_memoize_sync_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = counting(calls.clone()).memoize();

        assert_eq!(provider.get().unwrap(), 1);
        assert_eq!(provider.get().unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_memoize_async_shares_in_flight_future() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = Provider::new(move || {
            let counter = counter.clone();
            Flow::Pending(
                async move {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    counter.fetch_add(1, Ordering::SeqCst) + 1
                }
                .boxed(),
            )
        })
        .memoize();

        let (first, second) = futures::join!(provider.get_async(), provider.get_async());
        assert_eq!((first, second), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Once settled the memoized value is available synchronously.
        assert_eq!(provider.get().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_join_all_mixed() {
        let flows = vec![
            Flow::Ready(1),
            Flow::Pending(async { 2 }.boxed()),
            Flow::Ready(3),
        ];
        let joined = join_all(flows);
        assert!(!joined.is_ready());
        assert_eq!(joined.into_future().await, vec![1, 2, 3]);

        let ready = join_all(vec![Flow::Ready(1), Flow::Ready(2)]);
        assert_eq!(ready.into_ready(), Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_then_is_always_pending() {
        let flow = Flow::Ready(2).then(|n| async move { n * 10 });
        assert!(!flow.is_ready());
        assert_eq!(flow.into_future().await, 20);
    }
}
