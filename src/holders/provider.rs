//! Holder providers: where a subject's holders come from.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::SubjectId;

use super::holder::{Holder, HolderSet};

/// A source of holders for a subject (inventory, permissions, talents...).
///
/// Called on every cache miss, from any thread. Must not call back into the
/// engine for the same subject.
pub trait HolderProvider: Send + Sync {
    fn provide(&self, subject: SubjectId) -> Vec<Holder>;
}

impl<F> HolderProvider for F
where
    F: Fn(SubjectId) -> Vec<Holder> + Send + Sync,
{
    fn provide(&self, subject: SubjectId) -> Vec<Holder> {
        self(subject)
    }
}

/// Every registered provider, queried in registration order.
#[derive(Default)]
pub struct HolderProviders {
    providers: RwLock<Vec<Arc<dyn HolderProvider>>>,
}

impl HolderProviders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider.
    pub fn register(&self, provider: Arc<dyn HolderProvider>) {
        self.providers.write().push(provider);
    }

    /// Concatenate every provider's holders for `subject`.
    pub fn collect(&self, subject: SubjectId) -> HolderSet {
        // Snapshot so providers run without the lock held.
        let providers = self.providers.read().clone();
        providers
            .iter()
            .flat_map(|provider| provider.provide(subject))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

impl std::fmt::Debug for HolderProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolderProviders").field("len", &self.len()).finish()
    }
}
