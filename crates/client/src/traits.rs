//! The client surface a facade drives
//!
//! `Connector` opens a bucket from a [`ConnectSpec`]; the returned `Client`
//! performs every bucket-scoped operation. Both are object safe so a facade
//! can hold `Arc<dyn Client>` and pick the implementation at runtime.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`. Whatever concurrency guarantees a
//! facade offers are exactly the ones its client provides.

use crate::connection::ConnectSpec;
use crate::error::ClientResult;
use crate::query::QueryResult;
use crate::result::{GetResult, MutateOptions, MutationResult};
use crate::view::{DesignDocumentNamespace, ViewOptions, ViewResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Opens connections for one connection-string scheme
pub trait Connector: Send + Sync {
    /// Scheme this connector handles (`memory`, ...)
    fn scheme(&self) -> &str;

    /// Whether options outside the connection-string allow-list are accepted
    fn accepts_extra_options(&self) -> bool {
        false
    }

    /// Authenticate and bind to `spec.bucket`; returns only once bound
    fn connect(&self, spec: &ConnectSpec) -> ClientResult<Arc<dyn Client>>;
}

/// Bucket-scoped store client
pub trait Client: Send + Sync {
    /// Name of the bound bucket
    fn bucket_name(&self) -> &str;

    /// Operation timeout the client enforces
    fn operation_timeout(&self) -> Duration;

    // ========== Key-value ==========

    fn get(&self, key: &str) -> ClientResult<GetResult>;

    /// Fetch and lock for `lock_time`; the returned CAS is the lock token
    fn get_and_lock(&self, key: &str, lock_time: Duration) -> ClientResult<GetResult>;

    fn unlock(&self, key: &str, cas: u64) -> ClientResult<()>;

    fn insert(&self, key: &str, value: &Value, options: &MutateOptions)
        -> ClientResult<MutationResult>;

    fn replace(&self, key: &str, value: &Value, options: &MutateOptions)
        -> ClientResult<MutationResult>;

    fn upsert(&self, key: &str, value: &Value, options: &MutateOptions)
        -> ClientResult<MutationResult>;

    fn remove(&self, key: &str, options: &MutateOptions) -> ClientResult<MutationResult>;

    /// Per-key results; a missing key maps to `Err(DocumentNotFound)`
    fn get_multi(&self, keys: &[&str]) -> HashMap<String, ClientResult<GetResult>> {
        keys.iter()
            .map(|key| (key.to_string(), self.get(key)))
            .collect()
    }

    // ========== Views ==========

    fn view_query(&self, design: &str, view: &str, options: &ViewOptions)
        -> ClientResult<ViewResult>;

    /// Design document body (`{"views": {...}}`)
    fn get_design_document(
        &self,
        name: &str,
        namespace: DesignDocumentNamespace,
    ) -> ClientResult<Value>;

    /// Create or wholly replace a design document
    fn upsert_design_document(
        &self,
        name: &str,
        body: &Value,
        namespace: DesignDocumentNamespace,
    ) -> ClientResult<()>;

    // ========== Query ==========

    fn query(&self, statement: &str) -> ClientResult<QueryResult>;

    // ========== Management ==========

    /// Remove every document in the bucket
    fn flush(&self) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits_are_object_safe() {
        fn _assert_client(_: &dyn Client) {}
        fn _assert_connector(_: &dyn Connector) {}
    }
}
