//! In-process clusters
//!
//! A [`MemoryCluster`] stands in for a store deployment: it has users and
//! buckets and is addressed by host name. Provisioning registers it in a
//! process-wide table so that `memory://<host>` connection strings resolve
//! to it. The table holds weak references: a cluster disappears once every
//! handle and client bound to it is dropped.

use crate::bucket::{Bucket, BucketSettings};
use crate::store::CasClock;
use datastore_client::{ClientError, ClientResult};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tracing::info;

/// Global registry of provisioned clusters (host -> weak reference)
static CLUSTERS: Lazy<Mutex<HashMap<String, Weak<MemoryCluster>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// In-process stand-in for a store deployment
pub struct MemoryCluster {
    host: String,
    users: RwLock<HashMap<String, String>>,
    buckets: RwLock<BTreeMap<String, Arc<Bucket>>>,
    clock: Arc<CasClock>,
}

impl MemoryCluster {
    /// Cluster reachable as `memory://<host>`, created if not running
    pub fn provision(host: impl Into<String>) -> Arc<Self> {
        let host = host.into();
        // Hold the lock across lookup and insert so two callers cannot both create
        let mut registry = CLUSTERS.lock();
        if let Some(existing) = registry.get(&host).and_then(Weak::upgrade) {
            return existing;
        }

        let cluster = Arc::new(MemoryCluster {
            host: host.clone(),
            users: RwLock::new(HashMap::new()),
            buckets: RwLock::new(BTreeMap::new()),
            clock: Arc::new(CasClock::new()),
        });
        registry.retain(|_, weak| weak.strong_count() > 0);
        registry.insert(host.clone(), Arc::downgrade(&cluster));
        info!(target: "datastore::memory", host = %host, "Provisioned in-memory cluster");
        cluster
    }

    /// Running cluster for `host`
    pub fn lookup(host: &str) -> Option<Arc<Self>> {
        CLUSTERS.lock().get(host).and_then(Weak::upgrade)
    }

    /// Host name the cluster is registered under
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Add or replace a user
    pub fn add_user(&self, username: impl Into<String>, password: impl Into<String>) {
        self.users.write().insert(username.into(), password.into());
    }

    /// Check a username and password
    pub fn authenticate(&self, username: &str, password: &str) -> ClientResult<()> {
        match self.users.read().get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(ClientError::Authentication {
                reason: format!("invalid credentials for user '{}'", username),
            }),
        }
    }

    /// Create a bucket; an existing bucket of that name is returned unchanged
    pub fn create_bucket(&self, settings: BucketSettings) -> Arc<Bucket> {
        let mut buckets = self.buckets.write();
        if let Some(existing) = buckets.get(&settings.name) {
            return Arc::clone(existing);
        }
        let name = settings.name.clone();
        let bucket = Arc::new(Bucket::new(settings, Arc::clone(&self.clock)));
        buckets.insert(name.clone(), Arc::clone(&bucket));
        info!(target: "datastore::memory", host = %self.host, bucket = %name, "Created bucket");
        bucket
    }

    /// Bucket named `name`, if provisioned
    pub fn bucket(&self, name: &str) -> Option<Arc<Bucket>> {
        self.buckets.read().get(name).cloned()
    }

    /// Every bucket, ordered by name
    pub fn buckets(&self) -> Vec<Arc<Bucket>> {
        self.buckets.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for MemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCluster")
            .field("host", &self.host)
            .field("buckets", &self.buckets.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
