use crate::container::Container;

/// Reusable batch of registrations
pub trait Module: Send + Sync {
    /// Module name for identification
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Register bindings on the container
    fn configure(&self, container: &Container);
}

impl<F> Module for F
where
    F: Fn(&Container) + Send + Sync,
{
    fn configure(&self, container: &Container) {
        self(container)
    }
}
