//! Id-keyed capability registries.
//!
//! Conditions, effects and triggers are each stored in a [`Registry`] keyed
//! by their lowercase string id. Registration replaces any previous handler
//! with the same id, which is what hot-reload and third-party extension rely
//! on. Lookups are case-insensitive.
//!
//! Registries are shared between every subject's reconciliation and dispatch
//! calls and are written rarely, so they are backed by a `DashMap`.

use std::sync::Arc;

use dashmap::DashMap;

/// Anything that is registered under a stable string id.
pub trait Identified {
    /// The handler's id. Registries normalize it to lowercase.
    fn id(&self) -> &str;
}

/// Registry of handlers of one capability kind.
pub struct Registry<H: ?Sized> {
    kind: &'static str,
    by_id: DashMap<String, Arc<H>>,
}

impl<H: ?Sized + Identified> Registry<H> {
    /// Create an empty registry. `kind` is used in log output only.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            by_id: DashMap::new(),
        }
    }

    /// Register a handler, replacing and returning any handler with the same id.
    pub fn register(&self, handler: Arc<H>) -> Option<Arc<H>> {
        let id = handler.id().to_lowercase();
        let previous = self.by_id.insert(id.clone(), handler);
        if previous.is_some() {
            tracing::debug!(kind = self.kind, id = %id, "replaced registered handler");
        }
        previous
    }

    /// Look up a handler by id (case-insensitive).
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Arc<H>> {
        self.by_id.get(&id.to_lowercase()).map(|r| Arc::clone(r.value()))
    }

    /// Whether a handler is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(&id.to_lowercase())
    }

    /// Remove a handler.
    pub fn remove(&self, id: &str) -> Option<Arc<H>> {
        self.by_id.remove(&id.to_lowercase()).map(|(_, handler)| handler)
    }

    /// Snapshot of all live handlers.
    #[must_use]
    pub fn values(&self) -> Vec<Arc<H>> {
        self.by_id.iter().map(|r| Arc::clone(r.value())).collect()
    }

    /// All registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.by_id.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Capability kind this registry holds.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl<H: ?Sized> std::fmt::Debug for Registry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("len", &self.by_id.len())
            .finish()
    }
}
