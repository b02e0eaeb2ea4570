use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::container::binding::{BindingKind, ErasedBinding, ErasedProvider};
use crate::container::key::KeyInfo;
use crate::container::scope::Placement;
use crate::errors::{DiError, Result};

/// Resolution state of an entry
enum EntryState {
    /// Declared, never resolved
    Binding,
    /// Dependencies are being resolved
    Resolving,
    /// Provider installed; a memoized provider caches its instance itself
    Initializer(ErasedProvider),
    /// Resolution failed, permanently for this entry
    Failed(DiError),
}

/// Observable status of an entry, reported in snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Binding,
    Resolving,
    Resolved,
    Failed,
}

/// Per-container registration of one key.
///
/// Entries are shared through `Arc` handles. Relocating an entry installs a
/// fresh clone on another container's table; the original is never mutated
/// from there.
pub(crate) struct Entry {
    key: KeyInfo,
    placement: Placement,
    binding: Arc<dyn ErasedBinding>,
    state: Mutex<EntryState>,
}

impl Entry {
    pub(crate) fn new(key: KeyInfo, placement: Placement, binding: Arc<dyn ErasedBinding>) -> Self {
        Self {
            key,
            placement,
            binding,
            state: Mutex::new(EntryState::Binding),
        }
    }

    /// Copy of this entry sharing the binding but none of its state
    pub(crate) fn relocated(&self) -> Arc<Entry> {
        Arc::new(Entry::new(
            self.key.clone(),
            self.placement.clone(),
            self.binding.clone(),
        ))
    }

    pub(crate) fn key(&self) -> &KeyInfo {
        &self.key
    }

    pub(crate) fn placement(&self) -> &Placement {
        &self.placement
    }

    pub(crate) fn binding(&self) -> &Arc<dyn ErasedBinding> {
        &self.binding
    }

    /// Check if both entries were created from the same registration
    pub(crate) fn shares_binding(&self, other: &Entry) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.binding) as *const (),
            Arc::as_ptr(&other.binding) as *const (),
        )
    }

    pub(crate) fn binding_kind(&self) -> BindingKind {
        self.binding.kind()
    }

    /// Cached outcome, if the entry reached a terminal state
    pub(crate) fn cached(&self) -> Option<Result<ErasedProvider>> {
        match &*self.state.lock() {
            EntryState::Initializer(provider) => Some(Ok(provider.clone())),
            EntryState::Failed(error) => Some(Err(error.clone())),
            EntryState::Binding | EntryState::Resolving => None,
        }
    }

    /// Mark the entry as resolving
    pub(crate) fn begin(&self) {
        let mut state = self.state.lock();
        if matches!(*state, EntryState::Binding) {
            *state = EntryState::Resolving;
        }
    }

    /// Record the outcome of a resolution. The first outcome recorded wins
    /// and is returned to every later caller.
    pub(crate) fn settle(&self, outcome: Result<ErasedProvider>) -> Result<ErasedProvider> {
        let mut state = self.state.lock();
        match &*state {
            EntryState::Initializer(provider) => return Ok(provider.clone()),
            EntryState::Failed(error) => return Err(error.clone()),
            EntryState::Binding | EntryState::Resolving => {}
        }
        *state = match &outcome {
            Ok(provider) => EntryState::Initializer(provider.clone()),
            Err(error) => EntryState::Failed(error.clone()),
        };
        outcome
    }

    pub(crate) fn status(&self) -> EntryStatus {
        match &*self.state.lock() {
            EntryState::Binding => EntryStatus::Binding,
            EntryState::Resolving => EntryStatus::Resolving,
            EntryState::Initializer(_) => EntryStatus::Resolved,
            EntryState::Failed(_) => EntryStatus::Failed,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("placement", &self.placement)
            .field("binding", &self.binding.kind())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::binding::Binding;
    use crate::container::key::Key;

    fn entry() -> (Key<u32>, Entry) {
        let key = Key::<u32>::named("number");
        let binding: Arc<dyn ErasedBinding> = Arc::new(Binding::instance(1u32));
        let entry = Entry::new(key.info().clone(), Placement::Unscoped, binding);
        (key, entry)
    }

    #[test]
    fn test_state_transitions() {
        let (_, entry) = entry();
        assert_eq!(entry.status(), EntryStatus::Binding);
        assert!(entry.cached().is_none());

        entry.begin();
        assert_eq!(entry.status(), EntryStatus::Resolving);

        let provider: ErasedProvider = Arc::new(5u32);
        entry.settle(Ok(provider)).unwrap();
        assert_eq!(entry.status(), EntryStatus::Resolved);
        assert!(matches!(entry.cached(), Some(Ok(_))));
    }

    #[test]
    fn test_first_settle_wins() {
        let (key, entry) = entry();
        entry.begin();
        entry.settle(Err(DiError::key_not_provided(key.info().clone()))).unwrap_err();

        let provider: ErasedProvider = Arc::new(5u32);
        let outcome = entry.settle(Ok(provider));
        assert!(outcome.unwrap_err().is_key_not_provided());
        assert_eq!(entry.status(), EntryStatus::Failed);
    }

    #[test]
    fn test_relocated_starts_fresh() {
        let (key, entry) = entry();
        entry.settle(Err(DiError::key_not_provided(key.info().clone()))).unwrap_err();

        let clone = entry.relocated();
        assert_eq!(clone.status(), EntryStatus::Binding);
        assert_eq!(clone.key(), entry.key());
        assert_eq!(clone.binding_kind(), BindingKind::Instance);
        assert!(clone.shares_binding(&entry));
    }
}
