//! Container inspection.
//!
//! A snapshot captures the registrations of a container and its ancestors
//! together with the resolution status of each entry, for logs and tests.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::container::binding::BindingKind;
use crate::container::entry::{Entry, EntryStatus};
use crate::container::key::KeyInfo;
use crate::container::Container;

/// Point-in-time view of a container chain
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSnapshot {
    pub id: Uuid,
    pub name: Option<String>,
    pub scopes: Vec<String>,
    pub entries: Vec<EntrySnapshot>,
    pub locals: Vec<EntrySnapshot>,
    pub parent: Option<Box<ContainerSnapshot>>,
}

/// Point-in-time view of one entry
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub key: KeyInfo,
    pub binding: BindingKind,
    pub placement: &'static str,
    pub scopes: Vec<String>,
    pub status: EntryStatus,
}

impl EntrySnapshot {
    fn of(entry: &Entry) -> Self {
        Self {
            key: entry.key().clone(),
            binding: entry.binding_kind(),
            placement: entry.placement().as_str(),
            scopes: entry.placement().scope_names(),
            status: entry.status(),
        }
    }
}

fn sorted(entries: Vec<Arc<Entry>>) -> Vec<EntrySnapshot> {
    let mut snapshots: Vec<EntrySnapshot> = entries.iter().map(|e| EntrySnapshot::of(e)).collect();
    snapshots.sort_by(|a, b| {
        a.key
            .to_string()
            .cmp(&b.key.to_string())
            .then_with(|| a.key.id.cmp(&b.key.id))
    });
    snapshots
}

impl ContainerSnapshot {
    /// Registration of the named key on this container
    pub fn entry(&self, key: &str) -> Option<&EntrySnapshot> {
        self.entries.iter().find(|e| e.key.to_string() == key)
    }

    /// Local copy of the named key on this container
    pub fn local(&self, key: &str) -> Option<&EntrySnapshot> {
        self.locals.iter().find(|e| e.key.to_string() == key)
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Container {
    /// Capture the registrations of this container and its ancestors
    pub fn snapshot(&self) -> ContainerSnapshot {
        ContainerSnapshot {
            id: self.id(),
            name: self.name().map(str::to_string),
            scopes: self.scopes().iter().map(|s| s.name().to_string()).collect(),
            entries: sorted(self.entries()),
            locals: sorted(self.local_entries()),
            parent: self.parent().map(|parent| Box::new(parent.snapshot())),
        }
    }
}
