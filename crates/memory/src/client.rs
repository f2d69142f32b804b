//! Client and connector for in-process clusters

use crate::bucket::Bucket;
use crate::cluster::MemoryCluster;
use crate::query;
use datastore_client::{
    encode, Client, ClientError, ClientResult, ConnectSpec, Connector, DesignDocumentNamespace,
    GetResult, MutateOptions, MutationResult, QueryResult, ViewOptions, ViewResult,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Scheme handled by [`MemoryConnector`]
pub const SCHEME: &str = "memory";

/// Operation timeout when the connection string sets none
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(2500);

/// Connects `memory://<host>` connection strings to provisioned clusters
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryConnector;

impl MemoryConnector {
    /// Connector for the `memory` scheme
    pub fn new() -> Self {
        MemoryConnector
    }
}

impl Connector for MemoryConnector {
    fn scheme(&self) -> &str {
        SCHEME
    }

    fn connect(&self, spec: &ConnectSpec) -> ClientResult<Arc<dyn Client>> {
        let connection_string = &spec.connection_string;
        if connection_string.scheme() != SCHEME {
            return Err(ClientError::invalid_argument(format!(
                "memory connector cannot open scheme '{}'",
                connection_string.scheme()
            )));
        }
        let timeout = connection_string
            .param_duration("operation_timeout")?
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT);

        let host = connection_string.primary_host();
        let cluster = MemoryCluster::lookup(host).ok_or_else(|| ClientError::Network {
            reason: format!("no cluster listening at {}://{}", SCHEME, host),
        })?;
        cluster.authenticate(&spec.username, &spec.password)?;

        let client = MemoryClient::open(cluster, &spec.bucket, timeout)?;
        info!(target: "datastore::memory", host = %host, bucket = %spec.bucket, "Connected");
        Ok(Arc::new(client))
    }
}

/// Bucket-scoped client over an in-process cluster
pub struct MemoryClient {
    cluster: Arc<MemoryCluster>,
    bucket: Arc<Bucket>,
    timeout: Duration,
}

impl MemoryClient {
    /// Bind directly to a bucket, skipping authentication
    pub fn open(cluster: Arc<MemoryCluster>, bucket: &str, timeout: Duration) -> ClientResult<Self> {
        let bucket = cluster
            .bucket(bucket)
            .ok_or_else(|| ClientError::BucketNotFound {
                bucket: bucket.to_string(),
            })?;
        Ok(MemoryClient {
            cluster,
            bucket,
            timeout,
        })
    }

    /// Cluster the client is bound to
    pub fn cluster(&self) -> &Arc<MemoryCluster> {
        &self.cluster
    }
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("host", &self.cluster.host())
            .field("bucket", &self.bucket.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Client for MemoryClient {
    fn bucket_name(&self) -> &str {
        self.bucket.name()
    }

    fn operation_timeout(&self) -> Duration {
        self.timeout
    }

    fn get(&self, key: &str) -> ClientResult<GetResult> {
        self.bucket.store().get(key)
    }

    fn get_and_lock(&self, key: &str, lock_time: Duration) -> ClientResult<GetResult> {
        self.bucket.store().get_and_lock(key, lock_time)
    }

    fn unlock(&self, key: &str, cas: u64) -> ClientResult<()> {
        self.bucket.store().unlock(key, cas)
    }

    fn insert(&self, key: &str, value: &Value, options: &MutateOptions) -> ClientResult<MutationResult> {
        let (content, flags) = encode(value)?;
        self.bucket.store().insert(key, content, flags, options)
    }

    fn replace(&self, key: &str, value: &Value, options: &MutateOptions) -> ClientResult<MutationResult> {
        let (content, flags) = encode(value)?;
        self.bucket.store().replace(key, content, flags, options)
    }

    fn upsert(&self, key: &str, value: &Value, options: &MutateOptions) -> ClientResult<MutationResult> {
        let (content, flags) = encode(value)?;
        self.bucket.store().upsert(key, content, flags, options)
    }

    fn remove(&self, key: &str, options: &MutateOptions) -> ClientResult<MutationResult> {
        self.bucket.store().remove(key, options)
    }

    fn view_query(&self, design: &str, view: &str, options: &ViewOptions) -> ClientResult<ViewResult> {
        debug!(target: "datastore::memory", design, view, consistency = ?options.scan_consistency, "View query");
        self.bucket
            .designs()
            .query(self.bucket.store(), design, view, options, self.timeout)
    }

    fn get_design_document(&self, name: &str, namespace: DesignDocumentNamespace) -> ClientResult<Value> {
        self.bucket.designs().get(name, namespace, self.timeout)
    }

    fn upsert_design_document(
        &self,
        name: &str,
        body: &Value,
        namespace: DesignDocumentNamespace,
    ) -> ClientResult<()> {
        self.bucket
            .designs()
            .upsert(name, body, namespace, self.timeout)
    }

    fn query(&self, statement: &str) -> ClientResult<QueryResult> {
        query::execute(&self.cluster, statement, self.timeout)
    }

    fn flush(&self) -> ClientResult<()> {
        self.bucket.flush()
    }
}
