//! A bucket: documents, design documents and the index catalog

use crate::query::IndexCatalog;
use crate::store::{CasClock, DocumentStore};
use crate::view::DesignStore;
use datastore_client::{ClientError, ClientResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Bucket provisioning settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSettings {
    /// Bucket name
    pub name: String,
    /// Whether `flush` is allowed
    pub flush_enabled: bool,
}

impl BucketSettings {
    /// Settings for `name` with flush disabled
    pub fn new(name: impl Into<String>) -> Self {
        BucketSettings {
            name: name.into(),
            flush_enabled: false,
        }
    }

    /// Allow or forbid flushing
    pub fn with_flush(mut self, enabled: bool) -> Self {
        self.flush_enabled = enabled;
        self
    }
}

/// Documents, design documents and secondary indexes under one name
pub struct Bucket {
    settings: BucketSettings,
    store: DocumentStore,
    designs: DesignStore,
    indexes: RwLock<IndexCatalog>,
}

impl Bucket {
    pub(crate) fn new(settings: BucketSettings, clock: Arc<CasClock>) -> Self {
        Bucket {
            store: DocumentStore::new(settings.name.clone(), clock),
            designs: DesignStore::new(),
            indexes: RwLock::new(IndexCatalog::new()),
            settings,
        }
    }

    /// Bucket name
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Provisioning settings
    pub fn settings(&self) -> &BucketSettings {
        &self.settings
    }

    /// Document store
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Design documents and their view indexes
    pub fn designs(&self) -> &DesignStore {
        &self.designs
    }

    /// Secondary index catalog
    pub fn indexes(&self) -> &RwLock<IndexCatalog> {
        &self.indexes
    }

    /// Delete every document; design documents and indexes are kept
    pub fn flush(&self) -> ClientResult<()> {
        if !self.settings.flush_enabled {
            return Err(ClientError::FlushDisabled {
                bucket: self.settings.name.clone(),
            });
        }
        self.store.flush();
        tracing::info!(target: "datastore::memory", bucket = %self.settings.name, "Flushed bucket");
        Ok(())
    }
}
