//! Contract types for API stability
//!
//! These are the shapes every facade read and write returns, whatever the
//! installed store client calls them:
//!
//! - `cas`: opaque optimistic-concurrency token
//! - `document`: a value together with the CAS it was read or written at
//!
//! ## Usage
//!
//! ```
//! use datastore_core::contract::{Cas, Document};
//! ```

pub mod cas;
pub mod document;

// Re-exports
pub use cas::Cas;
pub use document::Document;
