use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::container::binding::Binding;
use crate::container::builder::{ContainerBuilder, ContainerOptions};
use crate::container::computed::Factory;
use crate::container::dependency::Dependency;
use crate::container::entry::Entry;
use crate::container::flow::{Provider, Value};
use crate::container::key::Key;
use crate::container::module::Module;
use crate::container::resolver::{Resolution, ResolutionPath};
use crate::container::scope::{IntoScopes, Placement, Scope};
use crate::container::subcomponent::Subcomponent;
use crate::errors::{DiError, Result};

struct ContainerInner {
    id: Uuid,
    name: Option<String>,
    parent: Option<Container>,
    scopes: RwLock<Vec<Scope>>,
    /// Registrations owned by this container
    entries: Mutex<HashMap<Uuid, Arc<Entry>>>,
    /// Copies of local-scoped entries resolved from this container
    locals: Mutex<HashMap<Uuid, Arc<Entry>>>,
}

/// Registry mapping keys to bindings, forming a parent/child chain.
///
/// `Container` is a cheap handle; clones refer to the same registry. A child
/// sees every registration of its ancestors by delegation and may shadow
/// them with its own.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Create a root container holding the singleton scope
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Create a root container from options
    pub fn with_options(options: ContainerOptions) -> Self {
        let mut scopes = vec![Scope::SINGLETON];
        for scope in options.scopes {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        Self::from_parts(None, options.name, scopes)
    }

    /// Start configuring a root container
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn from_parts(parent: Option<Container>, name: Option<String>, scopes: Vec<Scope>) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                id: Uuid::new_v4(),
                name,
                parent,
                scopes: RwLock::new(scopes),
                entries: Mutex::new(HashMap::new()),
                locals: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get the container identity
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Get the container name, if any
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Get the root of this container's chain
    pub fn root(&self) -> Container {
        self.root_with_depth().0
    }

    /// Check if both handles refer to the same container
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // Scopes

    /// Hold additional scopes
    pub fn add_scope(&self, scopes: impl IntoScopes) -> &Self {
        let mut held = self.inner.scopes.write();
        for scope in scopes.into_scopes() {
            if !held.contains(&scope) {
                tracing::debug!("Container {} now holds scope {}", self, scope);
                held.push(scope);
            }
        }
        self
    }

    /// Check if this container itself holds `scope`
    pub fn holds_scope(&self, scope: &Scope) -> bool {
        self.inner.scopes.read().contains(scope)
    }

    /// Scopes held by this container
    pub fn scopes(&self) -> Vec<Scope> {
        self.inner.scopes.read().clone()
    }

    // Children

    /// Create a child container delegating to this one
    pub fn create_child(&self) -> Container {
        self.create_child_with(ContainerOptions::default())
    }

    /// Create a child container from options
    pub fn create_child_with(&self, options: ContainerOptions) -> Container {
        let mut scopes: Vec<Scope> = Vec::new();
        for scope in options.scopes {
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        let child = Self::from_parts(Some(self.clone()), options.name, scopes);
        tracing::debug!("Created child container {} of {}", child, self);
        child
    }

    /// Create a reusable recipe for pre-configured children
    pub fn create_subcomponent<A, F>(&self, configure: F) -> Subcomponent<A>
    where
        F: Fn(&Container, A) + Send + Sync + 'static,
    {
        Subcomponent::new(self.clone(), configure)
    }

    // Modules

    /// Apply a module's registrations to this container
    pub fn apply<M: Module>(&self, module: M) -> &Self {
        tracing::debug!("Applying module {} to {}", module.name(), self);
        module.configure(self);
        self
    }

    /// Apply several modules in order
    pub fn apply_all<I, M>(&self, modules: I) -> &Self
    where
        I: IntoIterator<Item = M>,
        M: Module,
    {
        for module in modules {
            self.apply(module);
        }
        self
    }

    // Registration

    /// Register a synchronous initializer over `deps`
    pub fn provide<T, D, F>(&self, key: &Key<T>, deps: D, init: F) -> &Self
    where
        T: Value,
        D: Dependency + 'static,
        F: Fn(D::Output) -> T + Send + Sync + 'static,
    {
        self.provide_in(key, (), Binding::initializer(deps, init))
    }

    /// Register an asynchronous initializer over `deps`. The key can then
    /// only be requested through the async request path.
    pub fn provide_async<T, D, F, Fut>(&self, key: &Key<T>, deps: D, init: F) -> &Self
    where
        T: Value,
        D: Dependency + 'static,
        F: Fn(D::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.provide_in(key, (), Binding::async_initializer(deps, init))
    }

    /// Register an initializer without dependencies
    pub fn provide_fn<T, F>(&self, key: &Key<T>, init: F) -> &Self
    where
        T: Value,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.provide_in(key, (), Binding::from_fn(init))
    }

    /// Register a dependency (typically a computed key) producing `T`
    pub fn provide_from<T, D>(&self, key: &Key<T>, source: D) -> &Self
    where
        T: Value,
        D: Dependency<Output = T> + 'static,
    {
        self.provide_in(key, (), Binding::computed(source))
    }

    /// Register a constant
    pub fn provide_instance<T: Value>(&self, key: &Key<T>, value: T) -> &Self {
        self.provide_in(key, (), Binding::instance(value))
    }

    /// Resolve `key` through `source`
    pub fn bind<T: Value>(&self, key: &Key<T>, source: &Key<T>) -> &Self {
        self.provide_in(key, (), Binding::alias(source))
    }

    /// Register a binding with extra scopes on top of the key's own.
    ///
    /// Registering a key again overwrites the previous registration on this
    /// container.
    pub fn provide_in<T: Value>(&self, key: &Key<T>, scopes: impl IntoScopes, binding: Binding<T>) -> &Self {
        let mut effective = key.scopes().to_vec();
        effective.extend(scopes.into_scopes());
        let placement = Placement::from_scopes(effective);

        tracing::debug!(
            "Registering {:?} for {} on {} ({})",
            binding.kind(),
            key,
            self,
            placement.as_str()
        );

        let entry = Entry::new(key.info().clone(), placement, Arc::new(binding));
        self.inner.entries.lock().insert(key.id(), Arc::new(entry));
        self.inner.locals.lock().remove(&key.id());
        self
    }

    /// Check if this container itself registers `key`
    pub fn contains<T>(&self, key: &Key<T>) -> bool
    where
        T: Value,
    {
        self.inner.entries.lock().contains_key(&key.id())
    }

    // Requests

    pub(crate) fn resolve<D: Dependency + ?Sized>(&self, dependency: &D) -> Result<Provider<D::Output>> {
        let mut path = ResolutionPath::new();
        Resolution::new(self, &mut path).resolve(dependency)
    }

    /// Resolve the provider graph of `dependency` without invoking any
    /// initializer
    pub fn check<D: Dependency>(&self, dependency: D) -> Result<()> {
        self.resolve(&dependency).map(|_| ())
    }

    /// Resolve and produce a value synchronously
    pub fn request<D: Dependency>(&self, dependency: D) -> Result<D::Output> {
        let provider = self.resolve(&dependency)?;
        provider
            .flow()
            .into_ready()
            .ok_or_else(|| DiError::requested_async_as_sync(dependency.describe()))
    }

    /// Resolve and wait for the value
    pub async fn request_async<D: Dependency>(&self, dependency: D) -> Result<D::Output> {
        let provider = self.resolve(&dependency)?;
        Ok(provider.get_async().await)
    }

    /// Same as [`request`](Self::request). Nothing checks the dependency
    /// graph before a request, so there is no gate to skip; the failure is
    /// returned as is.
    pub fn request_unchecked<D: Dependency>(&self, dependency: D) -> Result<D::Output> {
        self.request(dependency)
    }

    /// Same as [`request_async`](Self::request_async)
    pub async fn request_async_unchecked<D: Dependency>(&self, dependency: D) -> Result<D::Output> {
        self.request_async(dependency).await
    }

    /// Request `dependency` and pass the value to `f`
    pub fn inject<D, F, R>(&self, dependency: D, f: F) -> Result<R>
    where
        D: Dependency,
        F: FnOnce(D::Output) -> R,
    {
        self.request(dependency).map(f)
    }

    /// Request `dependency` asynchronously and pass the value to `f`
    pub async fn inject_async<D, F, Fut>(&self, dependency: D, f: F) -> Result<Fut::Output>
    where
        D: Dependency,
        F: FnOnce(D::Output) -> Fut,
        Fut: Future,
    {
        let value = self.request_async(dependency).await?;
        Ok(f(value).await)
    }

    /// Request a factory and invoke it with `args`
    pub fn build<D, Args, R>(&self, factory: D, args: Args) -> Result<R>
    where
        D: Dependency<Output = Factory<Args, R>>,
        Args: 'static,
        R: 'static,
    {
        self.request(factory).map(|factory| factory.call(args))
    }

    /// Request a factory asynchronously and invoke it with `args`
    pub async fn build_async<D, Args, R>(&self, factory: D, args: Args) -> Result<R>
    where
        D: Dependency<Output = Factory<Args, R>>,
        Args: 'static,
        R: 'static,
    {
        let factory = self.request_async(factory).await?;
        Ok(factory.call(args))
    }

    /// Drop every registration and cached instance held by this container.
    /// Ancestors and their caches are untouched.
    pub fn dispose(&self) {
        let entries = std::mem::take(&mut *self.inner.entries.lock());
        let locals = std::mem::take(&mut *self.inner.locals.lock());
        tracing::debug!(
            "Disposed container {} ({} entries, {} local entries)",
            self,
            entries.len(),
            locals.len()
        );
    }

    // Tables, as seen by the resolution engine

    /// Walk from this container to the root, with the distance of each step
    fn chain(&self) -> impl Iterator<Item = (usize, &Container)> {
        std::iter::successors(Some(self), |container| container.parent()).enumerate()
    }

    pub(crate) fn root_with_depth(&self) -> (Container, usize) {
        let mut depth = 0;
        let mut current = self;
        while let Some(parent) = current.parent() {
            depth += 1;
            current = parent;
        }
        (current.clone(), depth)
    }

    /// Copy a local-scoped entry into this container's local table. An
    /// existing copy is kept only while it was made from `entry`; a copy of
    /// a registration that has since been shadowed or replaced is dropped.
    pub(crate) fn install_local(&self, id: Uuid, entry: &Entry) -> Arc<Entry> {
        let mut locals = self.inner.locals.lock();
        if let Some(local) = locals.get(&id) {
            if local.shares_binding(entry) {
                return local.clone();
            }
        }
        let local = entry.relocated();
        locals.insert(id, local.clone());
        local
    }

    /// Nearest registration of `id`, with its owner and distance
    pub(crate) fn find_entry(&self, id: Uuid) -> Option<(Container, Arc<Entry>, usize)> {
        self.chain().find_map(|(depth, container)| {
            let entry = container.inner.entries.lock().get(&id).cloned()?;
            Some((container.clone(), entry, depth))
        })
    }

    /// Nearest container holding any of `scopes`, with its distance
    pub(crate) fn find_scope_holder(&self, scopes: &[Scope]) -> Option<(Container, usize)> {
        self.chain().find_map(|(depth, container)| {
            let held = container.inner.scopes.read();
            scopes
                .iter()
                .any(|scope| held.contains(scope))
                .then(|| (container.clone(), depth))
        })
    }

    pub(crate) fn entry_or_insert(&self, id: Uuid, entry: Arc<Entry>) -> Arc<Entry> {
        self.inner.entries.lock().entry(id).or_insert(entry).clone()
    }

    /// Install a copy of a descendant's entry on this container, reusing a
    /// copy of the same registration if one is already installed
    pub(crate) fn hoist_entry(&self, entry: &Entry) -> Arc<Entry> {
        let mut entries = self.inner.entries.lock();
        let id = entry.key().id;
        if let Some(existing) = entries.get(&id) {
            if existing.shares_binding(entry) {
                return existing.clone();
            }
        }
        let hoisted = entry.relocated();
        entries.insert(id, hoisted.clone());
        hoisted
    }

    /// Remove `entry` if it is still the registration of its key here
    pub(crate) fn remove_entry(&self, entry: &Arc<Entry>) {
        let mut entries = self.inner.entries.lock();
        let id = entry.key().id;
        if entries.get(&id).is_some_and(|current| Arc::ptr_eq(current, entry)) {
            entries.remove(&id);
        }
    }

    pub(crate) fn entries(&self) -> Vec<Arc<Entry>> {
        self.inner.entries.lock().values().cloned().collect()
    }

    pub(crate) fn local_entries(&self) -> Vec<Arc<Entry>> {
        self.inner.locals.lock().values().cloned().collect()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "container-{}", &self.inner.id.simple().to_string()[..8]),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("scopes", &*self.inner.scopes.read())
            .field("entries", &self.inner.entries.lock().len())
            .field("parent", &self.inner.parent.as_ref().map(|p| p.id()))
            .finish()
    }
}
