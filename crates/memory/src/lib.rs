//! In-process document store
//!
//! Implements the `datastore-client` interface entirely in memory, under the
//! `memory` connection-string scheme. It behaves like a single-node store
//! deployment: buckets hold JSON documents with CAS versions, pessimistic
//! locks and expiry; design documents define map/reduce views; a subset of
//! the query language manages secondary indexes and runs scans.
//!
//! ```text
//! MemoryCluster (host)
//!   ├── users
//!   └── Bucket
//!         ├── DocumentStore   documents, CAS, locks, expiry
//!         ├── DesignStore     design documents, view indexes
//!         └── IndexCatalog    secondary index metadata
//! ```
//!
//! Nothing is persisted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bucket;
pub mod client;
pub mod cluster;
pub(crate) mod query;
pub mod store;
pub mod ttl;
pub(crate) mod view;

pub use bucket::{Bucket, BucketSettings};
pub use client::{MemoryClient, MemoryConnector, DEFAULT_OPERATION_TIMEOUT, SCHEME};
pub use cluster::MemoryCluster;
pub use query::{IndexCatalog, IndexDefinition, IndexState};
pub use store::{CasClock, DocumentStore, LOCKED_CAS};
pub use view::DesignStore;
