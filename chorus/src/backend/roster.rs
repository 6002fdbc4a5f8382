//! Backend roster keyed by identity.

use super::Backend;
use std::collections::HashMap;
use std::sync::Arc;

/// A registry of backends keyed by their identity.
///
/// The roster only holds implementations; which ids participate in which
/// stage is decided by [`crate::config::SynthesisConfig`].
#[derive(Debug, Clone, Default)]
pub struct BackendRoster {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend under its own id.
    ///
    /// A later registration with the same id replaces the earlier one.
    #[must_use]
    pub fn register(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(backend.id().to_string(), backend);
        self
    }

    /// Looks up a backend by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(id).cloned()
    }

    /// Returns true if the roster contains the id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.backends.contains_key(id)
    }

    /// Returns the number of registered backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Returns true if no backends are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Returns the registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.backends.keys().cloned().collect();
        ids.sort();
        ids
    }
}
