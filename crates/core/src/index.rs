//! Secondary index descriptors
//!
//! Index metadata as reported by the store's `system:indexes` catalog,
//! reduced to the fields callers act on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a secondary index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    /// Built and serving queries
    Online,
    /// Declared with `defer_build`, not yet built
    Deferred,
    /// Build in progress
    Building,
    /// Any state this crate does not know about
    #[serde(other)]
    Unknown,
}

/// One secondary (or primary) index on a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name
    pub name: String,
    /// Bucket the index covers
    #[serde(rename = "keyspace_id")]
    pub keyspace: String,
    /// Indexed expressions, as the store renders them
    #[serde(default)]
    pub index_key: Vec<String>,
    /// Primary index flag
    #[serde(default)]
    pub is_primary: bool,
    /// Lifecycle state
    pub state: IndexState,
    /// Index engine (`gsi`, `view`, ...)
    #[serde(default)]
    pub using: String,
}

impl IndexDescriptor {
    /// Decode one catalog row
    pub fn from_row(row: &Value) -> serde_json::Result<Self> {
        IndexDescriptor::deserialize(row)
    }

    /// True once the index can serve queries
    pub fn is_online(&self) -> bool {
        self.state == IndexState::Online
    }
}
