use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::container::key::KeyInfo;
use crate::container::scope::Scope;

/// Result alias used by every fallible container operation
pub type Result<T> = std::result::Result<T, DiError>;

/// Discriminant of a [`DiError`], for programmatic inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    KeyNotProvided,
    ScopeUnavailable,
    DependencyFailed,
    PropertyFailed,
    DependencyCycle,
    RequestedAsyncAsSync,
}

impl ErrorKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::KeyNotProvided => "key_not_provided",
            ErrorKind::ScopeUnavailable => "scope_unavailable",
            ErrorKind::DependencyFailed => "dependency_failed",
            ErrorKind::PropertyFailed => "property_failed",
            ErrorKind::DependencyCycle => "dependency_cycle",
            ErrorKind::RequestedAsyncAsSync => "requested_async_as_sync",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolution failure.
///
/// Errors travel as values while the provider graph is walked so that
/// structured requests can report every failing member at once; they only
/// surface to callers at the request boundary.
#[derive(Debug, Clone, Error)]
pub enum DiError {
    #[error("no provider for {key} and it has no default binding")]
    KeyNotProvided { key: KeyInfo },

    #[error("{key} requires one of [{}] but no container in the chain holds it", join_scopes(.scopes))]
    ScopeUnavailable { key: KeyInfo, scopes: Vec<Scope> },

    #[error("failed to resolve dependencies of {key}: {cause}")]
    DependencyFailed {
        key: KeyInfo,
        #[source]
        cause: Box<DiError>,
    },

    #[error("failed to resolve {}", join_failures(.failures))]
    PropertyFailed { failures: BTreeMap<String, DiError> },

    #[error("dependency cycle detected: {}", join_path(.path))]
    DependencyCycle { key: KeyInfo, path: Vec<KeyInfo> },

    #[error("{request} is produced asynchronously and cannot be requested synchronously")]
    RequestedAsyncAsSync { request: String },
}

impl DiError {
    /// Create a missing provider error
    pub fn key_not_provided(key: KeyInfo) -> Self {
        Self::KeyNotProvided { key }
    }

    /// Create an error wrapping the failure of a binding's dependencies
    pub fn dependency_failed(key: KeyInfo, cause: DiError) -> Self {
        Self::DependencyFailed {
            key,
            cause: Box::new(cause),
        }
    }

    /// Create a sync-on-async error for the given request description
    pub fn requested_async_as_sync(request: impl Into<String>) -> Self {
        Self::RequestedAsyncAsSync {
            request: request.into(),
        }
    }

    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiError::KeyNotProvided { .. } => ErrorKind::KeyNotProvided,
            DiError::ScopeUnavailable { .. } => ErrorKind::ScopeUnavailable,
            DiError::DependencyFailed { .. } => ErrorKind::DependencyFailed,
            DiError::PropertyFailed { .. } => ErrorKind::PropertyFailed,
            DiError::DependencyCycle { .. } => ErrorKind::DependencyCycle,
            DiError::RequestedAsyncAsSync { .. } => ErrorKind::RequestedAsyncAsSync,
        }
    }

    /// Check if the error reports a missing provider
    pub fn is_key_not_provided(&self) -> bool {
        matches!(self, DiError::KeyNotProvided { .. })
    }

    /// Check if the error reports a dependency cycle
    pub fn is_cycle(&self) -> bool {
        matches!(self, DiError::DependencyCycle { .. })
    }

    /// Check if the error reports a sync request landing on an async producer
    pub fn is_requested_async_as_sync(&self) -> bool {
        matches!(self, DiError::RequestedAsyncAsSync { .. })
    }

    /// Key the error is about, when it concerns a single key
    pub fn key(&self) -> Option<&KeyInfo> {
        match self {
            DiError::KeyNotProvided { key }
            | DiError::ScopeUnavailable { key, .. }
            | DiError::DependencyFailed { key, .. }
            | DiError::DependencyCycle { key, .. } => Some(key),
            DiError::PropertyFailed { .. } | DiError::RequestedAsyncAsSync { .. } => None,
        }
    }

    /// Direct cause of a `DependencyFailed` error
    pub fn cause(&self) -> Option<&DiError> {
        match self {
            DiError::DependencyFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Per-member failures of a `PropertyFailed` error
    pub fn failures(&self) -> Option<&BTreeMap<String, DiError>> {
        match self {
            DiError::PropertyFailed { failures } => Some(failures),
            _ => None,
        }
    }

    /// Iterate this error followed by its `DependencyFailed` causes
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Innermost error of the cause chain
    pub fn root_cause(&self) -> &DiError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }

    /// Check whether an error of `kind` appears anywhere below this one,
    /// including inside structured member failures
    pub fn contains(&self, kind: ErrorKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        match self {
            DiError::DependencyFailed { cause, .. } => cause.contains(kind),
            DiError::PropertyFailed { failures } => {
                failures.values().any(|failure| failure.contains(kind))
            }
            _ => false,
        }
    }
}

/// Iterator over a [`DiError`] and its causes
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a DiError>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a DiError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

fn join_scopes(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(|scope| scope.name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_failures(failures: &BTreeMap<String, DiError>) -> String {
    failures
        .iter()
        .map(|(member, error)| format!("[{}]: {}", member, error))
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_path(path: &[KeyInfo]) -> String {
    path.iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::key::Key;

    #[test]
    fn test_chain_and_root_cause() {
        let outer = Key::<u32>::named("outer");
        let inner = Key::<u32>::named("inner");

        let error = DiError::dependency_failed(
            outer.info().clone(),
            DiError::key_not_provided(inner.info().clone()),
        );

        let kinds: Vec<_> = error.chain().map(DiError::kind).collect();
        assert_eq!(kinds, vec![ErrorKind::DependencyFailed, ErrorKind::KeyNotProvided]);
        assert_eq!(error.root_cause().key(), Some(inner.info()));
        assert!(error.contains(ErrorKind::KeyNotProvided));
        assert!(!error.contains(ErrorKind::DependencyCycle));
    }

    #[test]
    fn test_property_failures_are_searched() {
        let missing = Key::<u32>::named("missing");
        let mut failures = BTreeMap::new();
        failures.insert("1".to_string(), DiError::key_not_provided(missing.info().clone()));

        let error = DiError::PropertyFailed { failures };

        assert_eq!(error.kind(), ErrorKind::PropertyFailed);
        assert!(error.key().is_none());
        assert!(error.contains(ErrorKind::KeyNotProvided));
        assert!(error.to_string().contains("[1]: no provider for missing"));
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::DependencyCycle.to_string(), "dependency_cycle");
        assert_eq!(
            DiError::requested_async_as_sync("token").kind(),
            ErrorKind::RequestedAsyncAsSync
        );
    }
}
