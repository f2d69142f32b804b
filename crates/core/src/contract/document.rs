//! Document read/write results
//!
//! Every facade read that exposes versioning returns a [`Document`]: the
//! decoded value plus the CAS it was observed at. Store clients have their
//! own result objects with their own field names; those are adapted into
//! this shape at the facade boundary and never leak further.

use super::Cas;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document value with its version token
///
/// ## Fields
///
/// - `value`: The decoded document body
/// - `cas`: Token identifying this state of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The document body
    pub value: Value,

    /// Version token at the time of the read or write
    pub cas: Cas,
}

impl Document {
    /// Create a document result
    pub fn new(value: Value, cas: Cas) -> Self {
        Document { value, cas }
    }

    /// Get a reference to the body
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Get the version token
    #[inline]
    pub fn cas(&self) -> Cas {
        self.cas
    }

    /// Consume and return the body
    #[inline]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Decode the body into a caller type
    pub fn content_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.value)
    }

    /// Split into `(value, cas)`
    pub fn into_parts(self) -> (Value, Cas) {
        (self.value, self.cas)
    }
}
