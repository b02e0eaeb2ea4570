//! Resolution engine.
//!
//! Turns a key into a provider by walking the container chain: explicit
//! entries first, then the key's default binding installed on the root.
//! Scoped entries are relocated to the container holding their scope, local
//! entries are copied into the requester, and the keys currently being
//! resolved are tracked so a re-entered key fails as a cycle.

use std::cell::RefCell;
use std::sync::Arc;

use uuid::Uuid;

use crate::container::binding::ErasedProvider;
use crate::container::dependency::Dependency;
use crate::container::entry::Entry;
use crate::container::flow::{Provider, Value};
use crate::container::key::{Key, KeyInfo};
use crate::container::scope::{Placement, Scope};
use crate::container::Container;
use crate::errors::{DiError, Result};

/// Keys currently being resolved by one request, outermost first
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    keys: Vec<KeyInfo>,
}

impl ResolutionPath {
    /// Create an empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to the path
    pub fn push(&mut self, key: KeyInfo) {
        self.keys.push(key);
    }

    /// Remove the innermost key
    pub fn pop(&mut self) -> Option<KeyInfo> {
        self.keys.pop()
    }

    /// Check if the path contains a key (for cycle detection)
    pub fn contains(&self, key: &KeyInfo) -> bool {
        self.keys.iter().any(|k| k.id == key.id)
    }

    /// Keys on the path, outermost first
    pub fn keys(&self) -> &[KeyInfo] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

thread_local! {
    /// Keys whose producer is running on this thread, innermost last
    static INVOKING: RefCell<Vec<Uuid>> = RefCell::new(Vec::new());
}

struct InvocationGuard(Uuid);

impl InvocationGuard {
    fn enter(id: Uuid) -> Self {
        INVOKING.with(|invoking| invoking.borrow_mut().push(id));
        Self(id)
    }
}

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        INVOKING.with(|invoking| {
            let mut invoking = invoking.borrow_mut();
            if let Some(position) = invoking.iter().rposition(|id| *id == self.0) {
                invoking.remove(position);
            }
        });
    }
}

fn is_invoking(id: Uuid) -> bool {
    INVOKING.with(|invoking| invoking.borrow().contains(&id))
}

/// Mark `id` as invoking on the current thread while `provider` runs its
/// synchronous part
pub(crate) fn track_invocation<T: Value>(provider: Provider<T>, id: Uuid) -> Provider<T> {
    Provider::new(move || {
        let _guard = InvocationGuard::enter(id);
        provider.flow()
    })
}

/// State of one resolution walk: the container dependencies are resolved
/// against and the keys in progress
pub struct Resolution<'a> {
    container: &'a Container,
    path: &'a mut ResolutionPath,
}

impl<'a> Resolution<'a> {
    pub(crate) fn new(container: &'a Container, path: &'a mut ResolutionPath) -> Self {
        Self { container, path }
    }

    /// Container dependencies are currently resolved against
    pub fn container(&self) -> &Container {
        self.container
    }

    /// Keys currently being resolved
    pub fn path(&self) -> &ResolutionPath {
        self.path
    }

    /// Resolve a nested dependency in this walk
    pub fn resolve<D: Dependency + ?Sized>(&mut self, dependency: &D) -> Result<Provider<D::Output>> {
        dependency.resolve(self)
    }

    /// Resolve a key against the current container
    pub fn resolve_key<T: Value>(&mut self, key: &Key<T>) -> Result<Provider<T>> {
        let requester = self.container.clone();
        let id = key.id();

        let (owner, entry, owner_depth) = match requester.find_entry(id) {
            Some(found) => found,
            None => self.install_default(key)?,
        };

        match entry.placement().clone() {
            Placement::Unscoped => self.resolve_entry(&entry, &requester),
            Placement::Local => {
                let local = requester.install_local(id, &entry);
                self.resolve_entry(&local, &requester)
            }
            Placement::Scoped(scopes) => self.resolve_scoped(entry, owner, owner_depth, scopes),
        }
    }

    fn install_default<T: Value>(&self, key: &Key<T>) -> Result<(Container, Arc<Entry>, usize)> {
        let binding = key
            .default_binding()
            .ok_or_else(|| DiError::key_not_provided(key.info().clone()))?;

        let (root, depth) = self.container.root_with_depth();
        let entry = Entry::new(
            key.info().clone(),
            Placement::from_scopes(key.scopes().to_vec()),
            Arc::new(binding),
        );
        let installed = root.entry_or_insert(key.id(), Arc::new(entry));
        tracing::debug!("Installed default binding for {} on {}", key, root);

        Ok((root, installed, depth))
    }

    /// Place a scoped entry on the nearest container holding one of its
    /// scopes and resolve it there
    fn resolve_scoped<T: Value>(
        &mut self,
        entry: Arc<Entry>,
        owner: Container,
        owner_depth: usize,
        scopes: Vec<Scope>,
    ) -> Result<Provider<T>> {
        let Some((holder, holder_depth)) = self.container.find_scope_holder(&scopes) else {
            if let Some(Err(error)) = entry.cached() {
                return Err(error);
            }
            let error = DiError::ScopeUnavailable {
                key: entry.key().clone(),
                scopes,
            };
            tracing::warn!("{}", error);
            return entry.settle(Err(error)).and_then(|p| downcast(entry.key(), p));
        };

        let entry = if holder_depth == owner_depth {
            entry
        } else if holder_depth < owner_depth {
            let relocated = holder.entry_or_insert(entry.key().id, entry.relocated());
            tracing::debug!("Relocated {} from {} down to {}", entry.key(), owner, holder);
            relocated
        } else {
            let hoisted = holder.hoist_entry(&entry);
            owner.remove_entry(&entry);
            tracing::debug!("Hoisted {} from {} up to {}", entry.key(), owner, holder);
            hoisted
        };

        self.resolve_entry(&entry, &holder)
    }

    /// Resolve an entry's binding with dependencies taken from `container`
    fn resolve_entry<T: Value>(&mut self, entry: &Arc<Entry>, container: &Container) -> Result<Provider<T>> {
        let memoize = entry.placement().memoizes();

        // Requested again from inside its own producer, e.g. through the
        // container handle. Waiting on the running producer never returns.
        if is_invoking(entry.key().id) {
            let mut path = vec![entry.key().clone()];
            path.extend(self.path.keys().iter().cloned());
            path.push(entry.key().clone());
            let error = DiError::DependencyCycle {
                key: entry.key().clone(),
                path,
            };
            tracing::warn!("{} (re-entered from its own initializer)", error);
            return Err(error);
        }

        // Unscoped entries only record failures; their providers are rebuilt
        // against every requester.
        if let Some(outcome) = entry.cached() {
            tracing::trace!("Cache hit for {} on {}", entry.key(), container);
            return outcome.and_then(|p| downcast(entry.key(), p));
        }

        if self.path.contains(entry.key()) {
            let mut path = self.path.keys().to_vec();
            path.push(entry.key().clone());
            let error = DiError::DependencyCycle {
                key: entry.key().clone(),
                path,
            };
            tracing::warn!("{}", error);
            return Err(error);
        }

        if memoize {
            entry.begin();
        }
        tracing::trace!("Resolving {} on {}", entry.key(), container);

        self.path.push(entry.key().clone());
        let outcome = {
            let mut nested = Resolution::new(container, &mut *self.path);
            entry.binding().resolve_erased(&mut nested, entry.key(), memoize)
        };
        self.path.pop();

        let outcome = match outcome {
            Ok(provider) if memoize => entry.settle(Ok(provider)),
            Ok(provider) => Ok(provider),
            Err(cause) => entry.settle(Err(DiError::dependency_failed(entry.key().clone(), cause))),
        };
        outcome.and_then(|p| downcast(entry.key(), p))
    }
}

fn downcast<T: Value>(key: &KeyInfo, provider: ErasedProvider) -> Result<Provider<T>> {
    provider
        .downcast_ref::<Provider<T>>()
        .cloned()
        .ok_or_else(|| DiError::key_not_provided(key.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_path() {
        let a = Key::<u32>::named("a");
        let b = Key::<u32>::named("b");

        let mut path = ResolutionPath::new();
        assert!(path.is_empty());

        path.push(a.info().clone());
        path.push(b.info().clone());

        assert_eq!(path.len(), 2);
        assert!(path.contains(a.info()));
        assert_eq!(path.keys(), &[a.info().clone(), b.info().clone()]);

        assert_eq!(path.pop(), Some(b.info().clone()));
        assert!(!path.contains(b.info()));
    }

    #[test]
    fn test_resolution_exposes_container() {
        let container = Container::new();
        let number = Key::<u32>::named("number");
        container.provide_instance(&number, 3);

        let mut path = ResolutionPath::new();
        let mut cx = Resolution::new(&container, &mut path);

        assert!(cx.container().ptr_eq(&container));
        let provider = cx.resolve(&number).unwrap();
        assert_eq!(provider.get().unwrap(), 3);
        assert!(cx.path().is_empty());
    }

    #[test]
    fn test_alias_failure_wraps_cause() {
        let container = Container::new();
        let alias = Key::<u32>::named("alias");
        let missing = Key::<u32>::named("missing");
        container.bind(&alias, &missing);

        let error = container.request(&alias).unwrap_err();
        assert_eq!(error.key(), Some(alias.info()));
        assert!(error.cause().unwrap().is_key_not_provided());
    }
}
