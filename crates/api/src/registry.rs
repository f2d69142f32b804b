//! Backend registry
//!
//! Maps a connection-string scheme to the connector that opens it. The
//! table is explicit: a backend is available because something registered
//! it, never because a type happens to be linked in.

use datastore_client::Connector;
use datastore_core::{Error, Result};
use datastore_memory::MemoryConnector;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scheme -> connector table
#[derive(Clone, Default)]
pub struct BackendRegistry {
    connectors: BTreeMap<String, Arc<dyn Connector>>,
}

impl BackendRegistry {
    /// Registry with no backends
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in backend (`memory`)
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(MemoryConnector::new()));
        registry
    }

    /// Add a connector under its own scheme, replacing any previous one
    pub fn register(&mut self, connector: Arc<dyn Connector>) -> &mut Self {
        self.connectors
            .insert(connector.scheme().to_string(), connector);
        self
    }

    /// Connector for `scheme`
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the registered schemes when none matches.
    pub fn get(&self, scheme: &str) -> Result<Arc<dyn Connector>> {
        self.connectors.get(scheme).cloned().ok_or_else(|| {
            Error::invalid_config(format!(
                "unknown backend '{}'; available: {}",
                scheme,
                self.schemes().join(", ")
            ))
        })
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<&str> {
        self.connectors.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
