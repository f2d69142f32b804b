//! Design documents and views
//!
//! Design documents are stored per bucket under their namespaced name
//! (`dev_` prefix for development). Storing one compiles every view; a
//! definition the interpreter cannot run is rejected there and then.
//!
//! Each view owns a [`ViewIndex`] that is rebuilt according to the query's
//! scan consistency:
//!
//! | Consistency | Behaviour |
//! |-------------|-----------|
//! | `NotBounded` | Read the index as last built (built once on first use) |
//! | `RequestPlus` | Rebuild if the bucket changed since the last build, then read |
//! | `UpdateAfter` | Read as `NotBounded`, then rebuild if stale |

pub mod collation;
pub mod index;
pub mod mapfn;

use index::{Reducer, ViewIndex};
use mapfn::MapFunction;

use crate::store::DocumentStore;
use datastore_client::{
    ClientError, ClientResult, DesignDocumentNamespace, ScanConsistency, ViewOptions, ViewResult,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One compiled view and its index
pub struct CompiledView {
    map: MapFunction,
    reduce: Option<Reducer>,
    index: RwLock<ViewIndex>,
}

impl CompiledView {
    fn compile(design: &str, name: &str, definition: &Value) -> ClientResult<Self> {
        let map_source = definition
            .get("map")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::invalid_argument(format!(
                    "view {}/{} has no map function",
                    design, name
                ))
            })?;
        let map = MapFunction::parse(map_source).map_err(|e| {
            ClientError::invalid_argument(format!("view {}/{}: {}", design, name, e))
        })?;
        let reduce = match definition.get("reduce") {
            None | Some(Value::Null) => None,
            Some(Value::String(source)) => Some(Reducer::parse(source)?),
            Some(other) => {
                return Err(ClientError::invalid_argument(format!(
                    "view {}/{} has a non-string reduce: {}",
                    design, name, other
                )))
            }
        };
        Ok(CompiledView {
            map,
            reduce,
            index: RwLock::new(ViewIndex::new()),
        })
    }

    fn refresh(&self, store: &DocumentStore, timeout: Duration, force: bool) -> ClientResult<()> {
        // Expired documents only bump the seqno once purged
        store.purge_expired();
        let seqno = store.high_seqno();
        let mut index = self
            .index
            .try_write_for(timeout)
            .ok_or_else(|| timeout_error("view index build"))?;
        let needed = if force {
            !index.is_current(seqno)
        } else {
            index.built_at().is_none()
        };
        if needed {
            let docs = store.scan();
            index.rebuild(&self.map, &docs, seqno);
            tracing::debug!(target: "datastore::memory", seqno, rows = index.len(), "Rebuilt view index");
        }
        Ok(())
    }

    fn query(
        &self,
        store: &DocumentStore,
        options: &ViewOptions,
        timeout: Duration,
    ) -> ClientResult<ViewResult> {
        match options.scan_consistency {
            ScanConsistency::RequestPlus => self.refresh(store, timeout, true)?,
            ScanConsistency::NotBounded | ScanConsistency::UpdateAfter => {
                self.refresh(store, timeout, false)?
            }
        }

        let (rows, total_rows) = {
            let index = self
                .index
                .try_read_for(timeout)
                .ok_or_else(|| timeout_error("view query"))?;
            index.query(self.reduce, options)?
        };

        if options.scan_consistency == ScanConsistency::UpdateAfter {
            self.refresh(store, timeout, true)?;
        }
        Ok(ViewResult { rows, total_rows })
    }
}

struct StoredDesign {
    body: Value,
    views: HashMap<String, Arc<CompiledView>>,
}

fn timeout_error(operation: &str) -> ClientError {
    ClientError::Timeout {
        operation: operation.to_string(),
    }
}

/// Design documents of one bucket
#[derive(Default)]
pub struct DesignStore {
    designs: RwLock<HashMap<String, StoredDesign>>,
}

impl DesignStore {
    /// Store with no design documents
    pub fn new() -> Self {
        Self::default()
    }

    /// Body of a design document, as stored
    pub fn get(
        &self,
        name: &str,
        namespace: DesignDocumentNamespace,
        timeout: Duration,
    ) -> ClientResult<Value> {
        let stored_name = namespace.prefixed(name);
        let designs = self
            .designs
            .try_read_for(timeout)
            .ok_or_else(|| timeout_error("get design document"))?;
        designs
            .get(&stored_name)
            .map(|design| design.body.clone())
            .ok_or(ClientError::DesignDocumentNotFound { name: stored_name })
    }

    /// Create or wholly replace a design document
    pub fn upsert(
        &self,
        name: &str,
        body: &Value,
        namespace: DesignDocumentNamespace,
        timeout: Duration,
    ) -> ClientResult<()> {
        let stored_name = namespace.prefixed(name);
        let views_json = match body.get("views") {
            Some(Value::Object(views)) => views.clone(),
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(other) => {
                return Err(ClientError::invalid_argument(format!(
                    "design document {} has non-object views: {}",
                    stored_name, other
                )))
            }
        };

        let mut views = HashMap::with_capacity(views_json.len());
        for (view_name, definition) in &views_json {
            let compiled = CompiledView::compile(&stored_name, view_name, definition)?;
            views.insert(view_name.clone(), Arc::new(compiled));
        }

        let mut designs = self
            .designs
            .try_write_for(timeout)
            .ok_or_else(|| timeout_error("upsert design document"))?;
        designs.insert(
            stored_name.clone(),
            StoredDesign {
                body: serde_json::json!({ "views": Value::Object(views_json) }),
                views,
            },
        );
        tracing::debug!(target: "datastore::memory", design = %stored_name, "Stored design document");
        Ok(())
    }

    /// Query a view
    pub fn query(
        &self,
        store: &DocumentStore,
        design: &str,
        view: &str,
        options: &ViewOptions,
        timeout: Duration,
    ) -> ClientResult<ViewResult> {
        let stored_name = options.namespace.prefixed(design);
        // Release the catalog lock before touching the index
        let compiled = {
            let designs = self
                .designs
                .try_read_for(timeout)
                .ok_or_else(|| timeout_error("view query"))?;
            let stored = designs
                .get(&stored_name)
                .ok_or_else(|| ClientError::DesignDocumentNotFound {
                    name: stored_name.clone(),
                })?;
            stored
                .views
                .get(view)
                .cloned()
                .ok_or_else(|| ClientError::ViewNotFound {
                    design: stored_name.clone(),
                    view: view.to_string(),
                })?
        };
        compiled.query(store, options, timeout)
    }
}
