//! Datastore facade
//!
//! A small, stable surface over a document-store client: CRUD with
//! optimistic concurrency, pessimistic locks, map/reduce views, secondary
//! index management and bucket flush. Callers see facade types and the
//! facade error taxonomy only; the installed client is picked at connect
//! time through a [`BackendRegistry`].
//!
//! ## Module Structure
//!
//! - `config`: [`ConnectOptions`] and `datastore.toml` loading
//! - `registry`: scheme -> connector table
//! - `facade`: the [`Datastore`] handle and its operation traits
//!
//! ## Quick Start
//!
//! ```ignore
//! use datastore_api::prelude::*;
//!
//! let options = ConnectOptions::new("localhost", "test")
//!     .credentials("Administrator", "password");
//! let ds = Datastore::connect(&options)?;
//!
//! ds.create("user:1", &json!({"name": "pikachu"}), &WriteOptions::new())?;
//! let doc = ds.read_with_cas("user:1")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod facade;
pub mod registry;

pub use config::{ConnectOptions, DatastoreConfig, ALLOWED_TUNABLES, CONFIG_FILE_NAME};
pub use facade::{
    BucketFacade, Datastore, IndexCreateOptions, KvFacade, QueryFacade, ViewFacade, ViewQuery,
    WriteOptions,
};
pub use registry::BackendRegistry;

// Re-export facade-level core types
pub use datastore_core::{
    Cas, DesignDocument, DesignNamespace, Document, EntityKind, Error, IndexDescriptor,
    IndexState, Result, Stale, Value, ViewDefinition, ViewRow,
};

/// Everything needed to drive a facade
pub mod prelude {
    pub use crate::config::ConnectOptions;
    pub use crate::facade::{
        BucketFacade, Datastore, IndexCreateOptions, KvFacade, QueryFacade, ViewFacade,
        ViewQuery, WriteOptions,
    };
    pub use datastore_core::{
        Cas, DesignDocument, DesignNamespace, Document, EntityKind, Error, IndexDescriptor,
        IndexState, Result, Stale, Value, ViewDefinition, ViewRow,
    };
}
