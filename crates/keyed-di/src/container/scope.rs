use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

/// Identity tag a container may hold.
///
/// A binding declared with a scope is memoized on the nearest container (from
/// the requester upward) that holds that scope. Equality is by identity, the
/// name only serves diagnostics.
#[derive(Clone)]
pub struct Scope {
    id: Uuid,
    name: Cow<'static, str>,
}

impl Scope {
    /// Held by every root container
    pub const SINGLETON: Scope = Scope::reserved(1, "singleton");

    /// Memoizes in the requesting container, never in an ancestor
    pub const LOCAL: Scope = Scope::reserved(2, "local");

    /// Create a new scope with a fresh identity
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    const fn reserved(id: u128, name: &'static str) -> Self {
        Self {
            id: Uuid::from_u128(id),
            name: Cow::Borrowed(name),
        }
    }

    /// Get the scope identity
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the scope name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if this is the reserved local scope
    pub fn is_local(&self) -> bool {
        self.id == Self::LOCAL.id
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self.name)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Conversion into a list of scopes, so registration calls accept a single
/// scope as well as a list
pub trait IntoScopes {
    fn into_scopes(self) -> Vec<Scope>;
}

impl IntoScopes for Scope {
    fn into_scopes(self) -> Vec<Scope> {
        vec![self]
    }
}

impl IntoScopes for &Scope {
    fn into_scopes(self) -> Vec<Scope> {
        vec![self.clone()]
    }
}

impl IntoScopes for Vec<Scope> {
    fn into_scopes(self) -> Vec<Scope> {
        self
    }
}

impl IntoScopes for &[Scope] {
    fn into_scopes(self) -> Vec<Scope> {
        self.to_vec()
    }
}

impl<const N: usize> IntoScopes for [Scope; N] {
    fn into_scopes(self) -> Vec<Scope> {
        self.into()
    }
}

impl IntoScopes for () {
    fn into_scopes(self) -> Vec<Scope> {
        Vec::new()
    }
}

/// Where an entry's instance lives once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Not memoized; resolved against the requester on every request
    Unscoped,
    /// Memoized per requesting container
    Local,
    /// Memoized on the nearest container holding one of these scopes
    Scoped(Vec<Scope>),
}

impl Placement {
    /// Compute the placement of a binding from its declared scopes.
    ///
    /// `Local` only wins when it is the sole scope; mixed with any other scope
    /// the remaining scopes decide placement.
    pub fn from_scopes(scopes: Vec<Scope>) -> Self {
        let mut unique: Vec<Scope> = Vec::with_capacity(scopes.len());
        for scope in scopes {
            if !unique.contains(&scope) {
                unique.push(scope);
            }
        }

        let has_local = unique.iter().any(Scope::is_local);
        unique.retain(|scope| !scope.is_local());

        match (unique.is_empty(), has_local) {
            (true, true) => Placement::Local,
            (true, false) => Placement::Unscoped,
            (false, _) => Placement::Scoped(unique),
        }
    }

    /// Check if instances are memoized under this placement
    pub fn memoizes(&self) -> bool {
        !matches!(self, Placement::Unscoped)
    }

    /// Scopes listed for diagnostics
    pub fn scope_names(&self) -> Vec<String> {
        match self {
            Placement::Unscoped => Vec::new(),
            Placement::Local => vec![Scope::LOCAL.name().to_string()],
            Placement::Scoped(scopes) => scopes.iter().map(|s| s.name().to_string()).collect(),
        }
    }

    /// Get the placement name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Unscoped => "unscoped",
            Placement::Local => "local",
            Placement::Scoped(_) => "scoped",
        }
    }
}
