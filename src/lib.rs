//! Datastore - a stable document-store facade over a pluggable client
//!
//! # Quick Start
//!
//! ```ignore
//! use datastore::prelude::*;
//! use datastore::memory::{BucketSettings, MemoryCluster};
//!
//! // An in-process store to talk to
//! let cluster = MemoryCluster::provision("localhost");
//! cluster.add_user("Administrator", "password");
//! cluster.create_bucket(BucketSettings::new("test"));
//!
//! let ds = Datastore::connect(
//!     &ConnectOptions::new("localhost", "test").credentials("Administrator", "password"),
//! )?;
//! ds.set("user:123", &json!({"name": "Alice"}), &WriteOptions::new())?;
//! let value = ds.read("user:123")?;
//! ```
//!
//! # Architecture
//!
//! Calls go through the [`Datastore`] facade, which drives a
//! `datastore_client::Client` picked from a [`BackendRegistry`] by scheme.
//! Client types never appear in facade signatures.

// Re-export the public API from datastore-api
pub use datastore_api::*;

/// Store client interface, for implementing new backends
pub use datastore_client as client;

/// The in-process `memory://` backend
pub use datastore_memory as memory;
