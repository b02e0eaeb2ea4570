use crate::container::module::Module;
use crate::container::scope::{IntoScopes, Scope};
use crate::container::Container;

/// Options for creating a container
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Name shown in logs and snapshots
    pub name: Option<String>,
    /// Scopes held from creation on; roots always hold the singleton scope
    pub scopes: Vec<Scope>,
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Hold the given scope(s)
    pub fn scope(mut self, scopes: impl IntoScopes) -> Self {
        self.scopes.extend(scopes.into_scopes());
        self
    }
}

/// Builder for root containers with modules applied up front
pub struct ContainerBuilder {
    options: ContainerOptions,
    modules: Vec<Box<dyn Module>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            options: ContainerOptions::default(),
            modules: Vec::new(),
        }
    }

    /// Set the container name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.name(name);
        self
    }

    /// Hold the given scope(s)
    pub fn scope(mut self, scopes: impl IntoScopes) -> Self {
        self.options = self.options.scope(scopes);
        self
    }

    /// Replace all options
    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a module, applied in insertion order on build
    pub fn module<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Build the container and apply every module
    pub fn build(self) -> Container {
        let container = Container::with_options(self.options);
        for module in &self.modules {
            tracing::debug!("Applying module {} to {}", module.name(), container);
            module.configure(&container);
        }
        container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
