pub mod binding;
pub mod builder;
pub mod computed;
pub mod debug;
pub mod dependency;
pub mod di_container;
pub mod entry;
pub mod flow;
pub mod key;
pub mod module;
pub mod resolver;
pub mod scope;
pub mod structured;
pub mod subcomponent;

pub use binding::{Binding, BindingKind};
pub use builder::{ContainerBuilder, ContainerOptions};
pub use computed::{
    AsyncKey, BuildKey, CurrentContainer, Curry, Factory, Lazy, LazyKey, MapKey, OptionalKey,
    ProviderKey, ValueKey, CONTAINER,
};
pub use debug::{ContainerSnapshot, EntrySnapshot};
pub use dependency::{Dependency, DependencyExt};
pub use di_container::Container;
pub use entry::EntryStatus;
pub use flow::{Flow, Provider, SharedFuture, Value};
pub use key::{Key, KeyBuilder, KeyInfo};
pub use module::Module;
pub use resolver::{Resolution, ResolutionPath};
pub use scope::{IntoScopes, Placement, Scope};
pub use subcomponent::Subcomponent;
