//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

pub use datastore::memory::{BucketSettings, MemoryCluster};
pub use datastore::prelude::*;
pub use serde_json::json;

pub const USERNAME: &str = "Administrator";
pub const PASSWORD: &str = "password";
pub const BUCKET: &str = "test";

static HOST_SEQ: AtomicU64 = AtomicU64::new(0);
static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once; output shows with `--nocapture`
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Host name no other test uses
pub fn unique_host(prefix: &str) -> String {
    format!("{}-{}", prefix, HOST_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// A provisioned cluster plus a facade connected to its `test` bucket
///
/// The cluster handle must stay alive for as long as the facade is used.
pub struct TestStore {
    pub cluster: Arc<MemoryCluster>,
    pub ds: Datastore,
    pub host: String,
}

impl TestStore {
    /// Bucket with flush enabled
    pub fn new() -> Self {
        Self::with_settings(BucketSettings::new(BUCKET).with_flush(true))
    }

    pub fn with_settings(settings: BucketSettings) -> Self {
        init_tracing();
        let host = unique_host("facade");
        let cluster = MemoryCluster::provision(host.clone());
        cluster.add_user(USERNAME, PASSWORD);
        cluster.create_bucket(settings);
        let ds = Datastore::connect(&Self::options_for(&host)).expect("connect");
        TestStore { cluster, ds, host }
    }

    pub fn options_for(host: &str) -> ConnectOptions {
        ConnectOptions::new(host, BUCKET).credentials(USERNAME, PASSWORD)
    }

    /// Another facade on the same bucket
    pub fn second_facade(&self) -> Datastore {
        Datastore::connect(&Self::options_for(&self.host)).expect("connect")
    }
}

/// Write options with no CAS and no expiry
pub fn plain() -> WriteOptions {
    WriteOptions::new()
}
