//! Key-based dependency injection.
//!
//! Values are requested through [`Key`]s registered on a [`Container`].
//! Containers form a parent/child chain; a binding declared with a [`Scope`]
//! is memoized on the nearest container holding that scope. Derived keys
//! ([`DependencyExt`]) add laziness, optionality, async adaptation, mapping
//! and factory currying, and tuples, vectors, arrays and string maps of
//! dependencies are resolved as one structured request.
//!
//! ```rust
//! use keyed_di::{Container, DependencyExt, Key, Scope};
//!
//! let base = Key::<u32>::named("base");
//! let total = Key::<u32>::builder("total").scope(Scope::SINGLETON).build();
//!
//! let container = Container::new();
//! container
//!     .provide_instance(&base, 40)
//!     .provide(&total, base.clone(), |base| base + 2);
//!
//! let (base, total) = container.request((base, total.lazy())).unwrap();
//! assert_eq!(base, 40);
//! assert_eq!(total.get().unwrap(), 42);
//! ```

pub mod container;
pub mod errors;

pub use container::{
    AsyncKey, Binding, BindingKind, BuildKey, Container, ContainerBuilder, ContainerOptions,
    ContainerSnapshot, CurrentContainer, Curry, Dependency, DependencyExt, EntrySnapshot,
    EntryStatus, Factory, Flow, IntoScopes, Key, KeyBuilder, KeyInfo, Lazy, LazyKey, MapKey,
    Module, OptionalKey, Placement, Provider, ProviderKey, Resolution, ResolutionPath, Scope,
    SharedFuture, Subcomponent, Value, ValueKey, CONTAINER,
};
pub use errors::{DiError, ErrorKind, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
