//! Secondary index catalog of one bucket
//!
//! Indexes are metadata only: a query scans the bucket's documents either
//! way. The catalog exists so that index management behaves as it does on a
//! real cluster: names are unique, deferred indexes must be built before
//! they serve queries, and a bucket without a usable index refuses `SELECT`.

use super::ast::render_path;
use datastore_client::{ClientError, ClientResult};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Build state of a secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Built and serving queries
    Online,
    /// Declared with `defer_build`; waits for `BUILD INDEX`
    Deferred,
}

impl IndexState {
    /// State as listed in `system:indexes`
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexState::Online => "online",
            IndexState::Deferred => "deferred",
        }
    }
}

/// One secondary or primary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Catalog id
    pub id: Uuid,
    /// Index name, unique per bucket
    pub name: String,
    /// Indexed field paths; empty for a primary index
    pub keys: Vec<Vec<String>>,
    /// Whether this is the bucket's primary index
    pub is_primary: bool,
    /// Build state
    pub state: IndexState,
}

impl IndexDefinition {
    /// New definition with a fresh id
    pub fn new(name: impl Into<String>, keys: Vec<Vec<String>>, is_primary: bool, deferred: bool) -> Self {
        IndexDefinition {
            id: Uuid::new_v4(),
            name: name.into(),
            keys,
            is_primary,
            state: if deferred {
                IndexState::Deferred
            } else {
                IndexState::Online
            },
        }
    }

    /// Check if the index can serve queries
    pub fn is_online(&self) -> bool {
        self.state == IndexState::Online
    }

    /// Row as listed by `system:indexes`
    pub fn to_row(&self, keyspace: &str) -> Value {
        let mut row = json!({
            "id": self.id.to_string(),
            "name": self.name,
            "keyspace_id": keyspace,
            "namespace_id": "default",
            "index_key": self.keys.iter().map(|k| render_path(k)).collect::<Vec<_>>(),
            "state": self.state.as_str(),
            "using": "gsi",
        });
        if self.is_primary {
            row["is_primary"] = Value::Bool(true);
        }
        row
    }
}

/// Index definitions of one bucket, by name
#[derive(Debug, Default)]
pub struct IndexCatalog {
    indexes: BTreeMap<String, IndexDefinition>,
}

impl IndexCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; the name must be unused
    pub fn create(&mut self, definition: IndexDefinition) -> ClientResult<()> {
        if self.indexes.contains_key(&definition.name) {
            return Err(ClientError::IndexExists {
                name: definition.name,
            });
        }
        self.indexes.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Remove and return the index named `name`
    pub fn drop_index(&mut self, name: &str) -> ClientResult<IndexDefinition> {
        self.indexes
            .remove(name)
            .ok_or_else(|| ClientError::IndexNotFound {
                name: name.to_string(),
            })
    }

    /// Bring deferred indexes online; all names must exist
    pub fn build(&mut self, names: &[String]) -> ClientResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.indexes.contains_key(*n)) {
            return Err(ClientError::IndexNotFound {
                name: missing.clone(),
            });
        }
        for name in names {
            if let Some(index) = self.indexes.get_mut(name) {
                index.state = IndexState::Online;
            }
        }
        Ok(())
    }

    /// Definitions ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.indexes.values()
    }

    /// Number of indexes
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Check if no index is defined
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Whether a scan filtered on `referenced` paths has an index to use
    ///
    /// An online primary index serves anything; otherwise an online
    /// secondary index qualifies when its leading key is referenced.
    pub fn can_serve(&self, referenced: &[Vec<String>]) -> bool {
        self.iter().filter(|ix| ix.is_online()).any(|ix| {
            ix.is_primary
                || ix
                    .keys
                    .first()
                    .map_or(false, |lead| referenced.iter().any(|path| path == lead))
        })
    }
}
