//! Keys identify requestable values.
//!
//! A key is created once, usually as a module-level constant, and is
//! immutable afterwards. It may carry a scope requirement and a default
//! binding used when no container in the chain registers the key.
//!
//! ```rust
//! use keyed_di::{Container, Key};
//!
//! let port = Key::<u16>::named("port");
//! let url = Key::<String>::named("url");
//!
//! let container = Container::new();
//! container
//!     .provide_instance(&port, 8080)
//!     .provide(&url, port.clone(), |port| format!("http://localhost:{}", port));
//!
//! assert_eq!(container.request(&url).unwrap(), "http://localhost:8080");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::container::binding::Binding;
use crate::container::dependency::Dependency;
use crate::container::flow::{Provider, Value};
use crate::container::resolver::Resolution;
use crate::container::scope::{IntoScopes, Scope};
use crate::errors::Result;

/// Diagnostic identity of a key, carried by errors and snapshots
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyInfo {
    pub id: Uuid,
    pub name: Option<Cow<'static, str>>,
    pub type_name: &'static str,
}

impl fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "<{}>", self.type_name),
        }
    }
}

type DefaultBinding<T> = Arc<dyn Fn() -> Binding<T> + Send + Sync>;

struct KeyInner<T> {
    info: KeyInfo,
    scopes: Vec<Scope>,
    default: Option<DefaultBinding<T>>,
}

/// Identity of a requestable value of type `T`.
///
/// Cloning a key is cheap and the clone is the same key: equality and
/// hashing follow the identity minted at construction, never the name.
pub struct Key<T> {
    inner: Arc<KeyInner<T>>,
}

impl<T: Value> Key<T> {
    /// Create an anonymous key
    pub fn new() -> Self {
        KeyBuilder::new(None).build()
    }

    /// Create a key with a diagnostic name
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        KeyBuilder::new(Some(name.into())).build()
    }

    /// Start building a key with scopes or a default binding
    pub fn builder(name: impl Into<Cow<'static, str>>) -> KeyBuilder<T> {
        KeyBuilder::new(Some(name.into()))
    }

    /// Get the diagnostic identity
    pub fn info(&self) -> &KeyInfo {
        &self.inner.info
    }

    /// Get the key identity
    pub fn id(&self) -> Uuid {
        self.inner.info.id
    }

    /// Get the key name, if any
    pub fn name(&self) -> Option<&str> {
        self.inner.info.name.as_deref()
    }

    /// Scopes declared on the key itself
    pub fn scopes(&self) -> &[Scope] {
        &self.inner.scopes
    }

    /// Check if the key carries a default binding
    pub fn has_default(&self) -> bool {
        self.inner.default.is_some()
    }

    /// Produce the default binding, if the key declares one
    pub fn default_binding(&self) -> Option<Binding<T>> {
        self.inner.default.as_ref().map(|thunk| thunk())
    }
}

impl<T: Value> Default for Key<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.info.id == other.inner.info.id
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.info.id.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.inner.info.name)
            .field("type", &self.inner.info.type_name)
            .field("scopes", &self.inner.scopes)
            .field("has_default", &self.inner.default.is_some())
            .finish()
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.info)
    }
}

impl<T: Value> Dependency for Key<T> {
    type Output = T;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<T>> {
        cx.resolve_key(self)
    }

    fn describe(&self) -> String {
        self.inner.info.to_string()
    }
}

/// Builder for keys carrying scopes or a default binding
pub struct KeyBuilder<T> {
    name: Option<Cow<'static, str>>,
    scopes: Vec<Scope>,
    default: Option<DefaultBinding<T>>,
}

impl<T: Value> KeyBuilder<T> {
    fn new(name: Option<Cow<'static, str>>) -> Self {
        Self {
            name,
            scopes: Vec::new(),
            default: None,
        }
    }

    /// Require the given scope(s) wherever the key is bound
    pub fn scope(mut self, scopes: impl IntoScopes) -> Self {
        self.scopes.extend(scopes.into_scopes());
        self
    }

    /// Default to a constant value
    pub fn default_instance(self, value: T) -> Self {
        self.default_binding(move || Binding::instance(value.clone()))
    }

    /// Default to a synchronous initializer over `deps`
    pub fn default_initializer<D, F>(self, deps: D, init: F) -> Self
    where
        D: Dependency + Clone + 'static,
        F: Fn(D::Output) -> T + Send + Sync + 'static,
    {
        let init = Arc::new(init);
        self.default_binding(move || {
            let init = init.clone();
            Binding::initializer(deps.clone(), move |value| init(value))
        })
    }

    /// Default to an asynchronous initializer over `deps`
    pub fn default_async_initializer<D, F, Fut>(self, deps: D, init: F) -> Self
    where
        D: Dependency + Clone + 'static,
        F: Fn(D::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let init = Arc::new(init);
        self.default_binding(move || {
            let init = init.clone();
            Binding::async_initializer(deps.clone(), move |value| init(value))
        })
    }

    /// Default to resolving another dependency producing `T`
    pub fn default_from<D>(self, source: D) -> Self
    where
        D: Dependency<Output = T> + Clone + 'static,
    {
        self.default_binding(move || Binding::computed(source.clone()))
    }

    /// Default to the binding produced by `thunk`, evaluated each time the
    /// default is installed
    pub fn default_binding<F>(mut self, thunk: F) -> Self
    where
        F: Fn() -> Binding<T> + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(thunk));
        self
    }

    /// Build the key
    pub fn build(self) -> Key<T> {
        Key {
            inner: Arc::new(KeyInner {
                info: KeyInfo {
                    id: Uuid::new_v4(),
                    name: self.name,
                    type_name: std::any::type_name::<T>(),
                },
                scopes: self.scopes,
                default: self.default,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_identity() {
        let first = Key::<u32>::named("port");
        let second = Key::<u32>::named("port");

        assert_eq!(first, first.clone());
        assert_ne!(first, second);

        let set: HashSet<_> = vec![first.clone(), first.clone(), second].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_key_display() {
        let named = Key::<u32>::named("port");
        let anonymous = Key::<u32>::new();

        assert_eq!(named.to_string(), "port");
        assert_eq!(anonymous.to_string(), "<u32>");
        assert_eq!(named.name(), Some("port"));
        assert!(anonymous.name().is_none());
    }

    #[test]
    fn test_builder_scopes_and_default() {
        let request = Scope::new("request");
        let key = Key::<String>::builder("greeting")
            .scope(request.clone())
            .default_instance("hello".to_string())
            .build();

        assert_eq!(key.scopes(), &[request]);
        assert!(key.has_default());
        assert!(matches!(key.default_binding(), Some(Binding::Instance(value)) if value == "hello"));
    }

    #[test]
    fn test_key_info_serializes() {
        let key = Key::<u32>::named("port");
        let json = serde_json::to_value(key.info()).unwrap();

        assert_eq!(json["name"], "port");
        assert_eq!(json["type_name"], "u32");
    }
}
