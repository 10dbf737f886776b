//! Process-wide catalog of simulation backends.
//!
//! The registry is constructed once at startup and shared as
//! `Arc<BackendRegistry>`. Its state is a copy-on-write snapshot: readers
//! clone an `Arc` to the current entry list under a briefly held read lock,
//! and `register` swaps in a new list under the write lock. A registration
//! racing with a lookup therefore never exposes a half-inserted entry.

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use serde::Serialize;

use crate::backend::Backend;
use crate::capability::CapabilityDescriptor;
use crate::error::{CoreError, CoreResult};

/// Name and display label of a registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendSummary {
    pub name: String,
    pub label: String,
}

/// A registered backend: its normalised name, the descriptor captured at
/// registration, and the execution handle.
#[derive(Clone)]
pub struct BackendEntry {
    pub name: String,
    pub descriptor: CapabilityDescriptor,
    pub handle: Arc<dyn Backend>,
}

impl std::fmt::Debug for BackendEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEntry")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

type Snapshot = Arc<Vec<Arc<BackendEntry>>>;

/// Registry of available backends, keyed by normalised name.
#[derive(Default)]
pub struct BackendRegistry {
    entries: RwLock<Snapshot>,
}

/// Backend names compare case-insensitively and ignore surrounding whitespace.
pub fn normalise_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Snapshot {
        // A poisoned lock still guards a complete snapshot; writers only swap.
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Register a backend under `name`.
    ///
    /// Fails with [`CoreError::DuplicateBackend`] if the normalised name is
    /// taken; the existing entry is left untouched.
    pub fn register(
        &self,
        name: &str,
        descriptor: CapabilityDescriptor,
        handle: Arc<dyn Backend>,
    ) -> CoreResult<()> {
        let requested = name;
        let name = normalise_name(name);
        if name.is_empty() {
            return Err(CoreError::InvalidBackendName {
                name: requested.to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if guard.iter().any(|entry| entry.name == name) {
            return Err(CoreError::DuplicateBackend { name });
        }

        let descriptor = CapabilityDescriptor {
            name: name.clone(),
            ..descriptor
        };
        debug!(
            "Backend '{}' supports waveform kinds {:?}",
            name, descriptor.supported_waveform_kinds
        );

        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(Arc::new(BackendEntry {
            name: name.clone(),
            descriptor,
            handle,
        }));
        *guard = Arc::new(next);

        info!("Registered backend '{}'", name);
        Ok(())
    }

    /// Register a backend under the name its own descriptor advertises.
    pub fn register_backend(&self, handle: Arc<dyn Backend>) -> CoreResult<()> {
        let descriptor = handle.descriptor();
        let name = descriptor.name.clone();
        self.register(&name, descriptor, handle)
    }

    /// All backends in registration order.
    pub fn list(&self) -> Vec<BackendSummary> {
        self.snapshot()
            .iter()
            .map(|entry| BackendSummary {
                name: entry.name.clone(),
                label: entry.descriptor.label.clone(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|entry| entry.name.clone()).collect()
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> CoreResult<BackendEntry> {
        let key = normalise_name(name);
        let snapshot = self.snapshot();
        snapshot
            .iter()
            .find(|entry| entry.name == key)
            .map(|entry| BackendEntry::clone(entry))
            .ok_or_else(|| CoreError::UnknownBackend {
                name: name.to_string(),
                available: snapshot.iter().map(|entry| entry.name.clone()).collect(),
            })
    }

    /// A copy of the descriptor registered under `name`.
    pub fn describe(&self, name: &str) -> CoreResult<CapabilityDescriptor> {
        self.get(name).map(|entry| entry.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = normalise_name(name);
        self.snapshot().iter().any(|entry| entry.name == key)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
