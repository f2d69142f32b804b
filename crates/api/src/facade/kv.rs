//! Key-value facade
//!
//! Document CRUD with optimistic concurrency and pessimistic locks.
//!
//! ## Not-found policy
//!
//! | Operation | Missing key |
//! |-----------|-------------|
//! | `read`, `read_as`, `read_with_cas` | `Ok(None)` |
//! | `lock`, `update`, `update_with_cas` | `Err(NotFound)` |
//! | `unlock` | `Ok(())` |
//! | `delete` | `Ok(false)` |
//! | `set`, `set_with_cas` | creates the document |
//! | `get_multi` | key omitted from the map |

use std::collections::HashMap;
use std::time::Duration;

use datastore_client::ClientError;
use datastore_core::{Cas, Document, Error, Result, Value};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::convert::{cas_from, document_from, map_error};
use super::impl_::Datastore;
use super::types::WriteOptions;

/// KV facade - document operations on the bound bucket
///
/// ## Example
///
/// ```ignore
/// ds.create("user:1", &json!({"name": "pikachu"}), &WriteOptions::new())?;
/// let doc = ds.read_with_cas("user:1")?.expect("just created");
/// ds.update_with_cas("user:1", &json!({"name": "raichu"}), doc.cas, &WriteOptions::new())?;
/// ```
pub trait KvFacade {
    /// Insert a new document
    ///
    /// Returns `AlreadyExists` if the key is taken.
    fn create(&self, key: &str, value: &Value, options: &WriteOptions) -> Result<bool>;

    /// Current value, or `None` when the key is absent
    fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Current value decoded into `T`
    ///
    /// A document that does not decode as `T` is `Unexpected`.
    fn read_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        self.read(key)?
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| Error::unexpected("read_as", key, e.to_string()))
            })
            .transpose()
    }

    /// Current value with its CAS
    fn read_with_cas(&self, key: &str) -> Result<Option<Document>>;

    /// Fetch and lock for `ttl_secs`
    ///
    /// The returned CAS is the lock token. The lock lasts `ttl_secs`
    /// seconds when that is between 1 and 30; a `ttl_secs` of 0 or above 30
    /// is replaced by the server default of 15 seconds, so `lock(key, 60)`
    /// holds the lock for 15 seconds.
    fn lock(&self, key: &str, ttl_secs: u32) -> Result<Document>;

    /// Release a lock taken with `lock`
    ///
    /// Unlocking a missing or unlocked document is a no-op; a wrong token is
    /// `Locked`.
    fn unlock(&self, key: &str, cas: Cas) -> Result<()>;

    /// Replace an existing document
    fn update(&self, key: &str, value: &Value, options: &WriteOptions) -> Result<bool>;

    /// Replace an existing document only if it is still at `cas`
    ///
    /// Returns the new CAS.
    fn update_with_cas(
        &self,
        key: &str,
        value: &Value,
        cas: Cas,
        options: &WriteOptions,
    ) -> Result<(bool, Cas)>;

    /// Create or overwrite
    ///
    /// With `options.cas` set this is a conditional replace.
    fn set(&self, key: &str, value: &Value, options: &WriteOptions) -> Result<bool>;

    /// Replace (conditionally when `cas` is given), creating the document if
    /// it does not exist
    ///
    /// A concurrent create between the two steps is a `VersionConflict`.
    fn set_with_cas(
        &self,
        key: &str,
        value: &Value,
        options: &WriteOptions,
        cas: Option<Cas>,
    ) -> Result<(bool, Cas)>;

    /// Remove a document; `Ok(false)` when it did not exist
    fn delete(&self, key: &str, options: &WriteOptions) -> Result<bool>;

    /// Fetch several documents; missing keys are left out
    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Document>>;
}

impl KvFacade for Datastore {
    fn create(&self, key: &str, value: &Value, options: &WriteOptions) -> Result<bool> {
        let _guard = self.span().enter();
        let mutate = options.to_mutate_options()?;
        self.client()
            .insert(key, value, &mutate)
            .map_err(|e| map_error(e, "create", key))?;
        Ok(true)
    }

    fn read(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_with_cas(key)?.map(Document::into_value))
    }

    fn read_with_cas(&self, key: &str) -> Result<Option<Document>> {
        let _guard = self.span().enter();
        match self.client().get(key) {
            Ok(result) => document_from(result, "read", key).map(Some),
            Err(ClientError::DocumentNotFound { .. }) => Ok(None),
            Err(e) => Err(map_error(e, "read", key)),
        }
    }

    fn lock(&self, key: &str, ttl_secs: u32) -> Result<Document> {
        let _guard = self.span().enter();
        let result = self
            .client()
            .get_and_lock(key, Duration::from_secs(u64::from(ttl_secs)))
            .map_err(|e| map_error(e, "lock", key))?;
        debug!(target: "datastore::facade", key = %key, ttl_secs, "Locked document");
        document_from(result, "lock", key)
    }

    fn unlock(&self, key: &str, cas: Cas) -> Result<()> {
        let _guard = self.span().enter();
        match self.client().unlock(key, cas.as_u64()) {
            Ok(()) => Ok(()),
            Err(ClientError::DocumentNotFound { .. } | ClientError::DocumentNotLocked { .. }) => {
                Ok(())
            }
            Err(ClientError::CasMismatch { key }) => Err(Error::locked(key)),
            Err(e) => Err(map_error(e, "unlock", key)),
        }
    }

    fn update(&self, key: &str, value: &Value, options: &WriteOptions) -> Result<bool> {
        let _guard = self.span().enter();
        let mutate = options.to_mutate_options()?;
        self.client()
            .replace(key, value, &mutate)
            .map_err(|e| map_error(e, "update", key))?;
        Ok(true)
    }

    fn update_with_cas(
        &self,
        key: &str,
        value: &Value,
        cas: Cas,
        options: &WriteOptions,
    ) -> Result<(bool, Cas)> {
        let _guard = self.span().enter();
        let mutate = options.with_cas(cas).to_mutate_options()?;
        let result = self
            .client()
            .replace(key, value, &mutate)
            .map_err(|e| map_error(e, "update_with_cas", key))?;
        Ok((true, cas_from(&result)))
    }

    fn set(&self, key: &str, value: &Value, options: &WriteOptions) -> Result<bool> {
        let _guard = self.span().enter();
        let mutate = options.to_mutate_options()?;
        let outcome = if options.cas.is_some() {
            self.client().replace(key, value, &mutate)
        } else {
            self.client().upsert(key, value, &mutate)
        };
        outcome.map_err(|e| map_error(e, "set", key))?;
        Ok(true)
    }

    fn set_with_cas(
        &self,
        key: &str,
        value: &Value,
        options: &WriteOptions,
        cas: Option<Cas>,
    ) -> Result<(bool, Cas)> {
        let _guard = self.span().enter();
        let mut options = *options;
        if let Some(cas) = cas {
            options = options.with_cas(cas);
        }
        let mutate = options.to_mutate_options()?;

        match self.client().replace(key, value, &mutate) {
            Ok(result) => return Ok((true, cas_from(&result))),
            Err(ClientError::DocumentNotFound { .. }) => {}
            Err(e) => return Err(map_error(e, "set_with_cas", key)),
        }

        debug!(target: "datastore::facade", key = %key, "Document absent, inserting");
        match self.client().insert(key, value, &mutate) {
            Ok(result) => Ok((true, cas_from(&result))),
            Err(ClientError::DocumentExists { key }) => Err(Error::version_conflict(key)),
            Err(e) => Err(map_error(e, "set_with_cas", key)),
        }
    }

    fn delete(&self, key: &str, options: &WriteOptions) -> Result<bool> {
        let _guard = self.span().enter();
        let mutate = options.to_mutate_options()?;
        match self.client().remove(key, &mutate) {
            Ok(_) => Ok(true),
            Err(ClientError::DocumentNotFound { .. }) => Ok(false),
            Err(e) => Err(map_error(e, "delete", key)),
        }
    }

    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Document>> {
        let _guard = self.span().enter();
        let mut documents = HashMap::with_capacity(keys.len());
        for (key, outcome) in self.client().get_multi(keys) {
            match outcome {
                Ok(result) => {
                    let document = document_from(result, "get_multi", &key)?;
                    documents.insert(key, document);
                }
                Err(ClientError::DocumentNotFound { .. }) => {}
                Err(e) => return Err(map_error(e, "get_multi", &key)),
            }
        }
        Ok(documents)
    }
}
