//! Core types for the datastore facade
//!
//! This crate defines the stable shapes the facade hands to callers,
//! independent of whichever store client sits underneath:
//! - Error: the facade error taxonomy
//! - Contract types: `Cas` version tokens and `Document` results
//! - View types: `ViewRow`, `DesignDocument`, `ViewDefinition`, `Stale`
//! - Index types: `IndexDescriptor`, `IndexState`
//!
//! Document bodies are plain `serde_json::Value`s.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod contract;
pub mod error;
pub mod index;
pub mod view;

// Re-export commonly used types
pub use contract::{Cas, Document};
pub use error::{EntityKind, Error, Result};
pub use index::{IndexDescriptor, IndexState};
pub use serde_json::Value;
pub use view::{DesignDocument, DesignNamespace, Stale, ViewDefinition, ViewRow};
