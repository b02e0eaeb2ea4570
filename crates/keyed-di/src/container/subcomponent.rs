use std::fmt;
use std::sync::Arc;

use crate::container::Container;

/// Recipe for children of one container, configured from per-child
/// arguments
pub struct Subcomponent<A> {
    parent: Container,
    configure: Arc<dyn Fn(&Container, A) + Send + Sync>,
}

impl<A> Subcomponent<A> {
    pub(crate) fn new<F>(parent: Container, configure: F) -> Self
    where
        F: Fn(&Container, A) + Send + Sync + 'static,
    {
        Self {
            parent,
            configure: Arc::new(configure),
        }
    }

    /// Create and configure a new child
    pub fn create(&self, args: A) -> Container {
        let child = self.parent.create_child();
        (self.configure)(&child, args);
        child
    }

    /// Container the children are created under
    pub fn parent(&self) -> &Container {
        &self.parent
    }
}

impl<A> Clone for Subcomponent<A> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            configure: self.configure.clone(),
        }
    }
}

impl<A> fmt::Debug for Subcomponent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subcomponent")
            .field("parent", &self.parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::container::key::Key;
    use crate::container::scope::Scope;
    use crate::container::Container;

    #[test]
    fn test_subcomponent_children_are_independent() {
        let request = Scope::new("request");
        let user = Key::<String>::named("user");
        let greeting = Key::<String>::named("greeting");

        let root = Container::new();
        root.provide(&greeting, user.clone(), |user| format!("hello {}", user));

        let scope = request.clone();
        let bound = user.clone();
        let per_request = root.create_subcomponent(move |child: &Container, name: String| {
            child.add_scope(scope.clone());
            child.provide_instance(&bound, name);
        });

        let alice = per_request.create("alice".to_string());
        let bob = per_request.create("bob".to_string());

        assert!(alice.parent().unwrap().ptr_eq(&root));
        assert!(alice.holds_scope(&request));
        assert_eq!(alice.request(&greeting).unwrap(), "hello alice");
        assert_eq!(bob.request(&greeting).unwrap(), "hello bob");
        assert!(root.request(&greeting).is_err());
    }
}
