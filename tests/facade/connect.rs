//! Connection setup, backend selection and config files

use std::sync::Arc;
use std::time::Duration;

use datastore::client::{Client, ClientResult, ConnectSpec, Connector};
use datastore::memory::MemoryConnector;
use datastore::{BackendRegistry, DatastoreConfig};
use tempfile::TempDir;

use crate::common::*;

fn provision() -> (Arc<MemoryCluster>, String) {
    let host = unique_host("connect");
    let cluster = MemoryCluster::provision(host.clone());
    cluster.add_user(USERNAME, PASSWORD);
    cluster.create_bucket(BucketSettings::new(BUCKET));
    (cluster, host)
}

#[test]
fn connect_is_eager() {
    let (_cluster, host) = provision();
    let ds = Datastore::connect(&TestStore::options_for(&host)).unwrap();
    assert_eq!(ds.bucket_name(), BUCKET);
}

#[test]
fn connect_failures_are_connection_failures() {
    let (_cluster, host) = provision();

    let unreachable = TestStore::options_for("connect-nowhere");
    assert!(matches!(
        Datastore::connect(&unreachable).unwrap_err(),
        Error::ConnectionFailure { .. }
    ));

    let bad_auth = ConnectOptions::new(host.clone(), BUCKET).credentials(USERNAME, "wrong");
    assert!(matches!(
        Datastore::connect(&bad_auth).unwrap_err(),
        Error::ConnectionFailure { .. }
    ));

    let no_bucket = ConnectOptions::new(host, "missing").credentials(USERNAME, PASSWORD);
    assert!(matches!(
        Datastore::connect(&no_bucket).unwrap_err(),
        Error::ConnectionFailure { .. }
    ));
}

#[test]
fn invalid_options_are_config_errors() {
    let (_cluster, host) = provision();

    let empty_bucket = ConnectOptions::new(host.clone(), "").credentials(USERNAME, PASSWORD);
    assert!(matches!(
        Datastore::connect(&empty_bucket).unwrap_err(),
        Error::InvalidConfig { .. }
    ));

    let bad_timeout = TestStore::options_for(&host).option("operation_timeout", "soon");
    assert!(matches!(
        Datastore::connect(&bad_timeout).unwrap_err(),
        Error::InvalidConfig { .. }
    ));

    for huge in ["1e30", "1e20"] {
        let huge_timeout = TestStore::options_for(&host).option("operation_timeout", huge);
        assert!(matches!(
            Datastore::connect(&huge_timeout).unwrap_err(),
            Error::InvalidConfig { .. }
        ));
    }

    let unknown_backend = TestStore::options_for(&host).backend("couchbase");
    let err = Datastore::connect(&unknown_backend).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert!(err.to_string().contains("memory"));
}

#[test]
fn tunables_and_unknown_options() {
    let (_cluster, host) = provision();
    let options = TestStore::options_for(&host)
        .operation_timeout(Duration::from_millis(750))
        .config_total_timeout(Duration::from_secs(10))
        .option("enable_tracing", "true");

    let spec = options.to_spec(false).unwrap();
    assert_eq!(
        spec.connection_string.param("operation_timeout"),
        Some("0.75")
    );
    assert_eq!(spec.connection_string.param("enable_tracing"), None);
    assert!(spec.extra.is_empty());

    let spec = options.to_spec(true).unwrap();
    assert_eq!(spec.extra.get("enable_tracing").map(String::as_str), Some("true"));

    let ds = Datastore::connect(&options).unwrap();
    assert!(format!("{:?}", ds).contains("750ms"));
}

/// Records every spec it is asked to open, then delegates to `memory`
struct RecordingConnector {
    inner: MemoryConnector,
    seen: parking_lot::Mutex<Vec<ConnectSpec>>,
}

impl Connector for RecordingConnector {
    fn scheme(&self) -> &str {
        "recording"
    }

    fn accepts_extra_options(&self) -> bool {
        true
    }

    fn connect(&self, spec: &ConnectSpec) -> ClientResult<Arc<dyn Client>> {
        self.seen.lock().push(spec.clone());
        let mut rewritten = spec.clone();
        let mut cs = datastore::client::ConnectionString::new(
            "memory",
            spec.connection_string.primary_host(),
        );
        for (key, value) in spec.connection_string.params() {
            cs = cs.with_param(key, value);
        }
        rewritten.connection_string = cs;
        self.inner.connect(&rewritten)
    }
}

#[test]
fn registry_selects_backend_by_scheme() {
    let (_cluster, host) = provision();
    let recorder = Arc::new(RecordingConnector {
        inner: MemoryConnector::new(),
        seen: parking_lot::Mutex::new(Vec::new()),
    });

    let mut registry = BackendRegistry::with_defaults();
    registry.register(recorder.clone());
    assert_eq!(registry.schemes(), vec!["memory", "recording"]);

    let options = TestStore::options_for(&host)
        .backend("recording")
        .option("compression", "off");
    let ds = Datastore::open(&options, &registry).unwrap();
    ds.set("k", &json!(1), &plain()).unwrap();

    let seen = recorder.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].bucket, BUCKET);
    assert_eq!(seen[0].extra.get("compression").map(String::as_str), Some("off"));
}

#[test]
fn config_file_round_trip() {
    let (_cluster, host) = provision();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(datastore::CONFIG_FILE_NAME);

    let config = DatastoreConfig {
        connection: TestStore::options_for(&host).operation_timeout(Duration::from_secs(3)),
    };
    config.write_to_file(&path).unwrap();

    let loaded = DatastoreConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);

    let ds = Datastore::connect(&loaded.connection).unwrap();
    ds.set("from-config", &json!(true), &plain()).unwrap();
    assert_eq!(ds.read("from-config").unwrap(), Some(json!(true)));
}

#[test]
fn default_config_file_parses() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(datastore::CONFIG_FILE_NAME);

    DatastoreConfig::write_default_if_missing(&path).unwrap();
    let loaded = DatastoreConfig::from_file(&path).unwrap();
    assert_eq!(loaded.connection.backend, "memory");
    loaded.connection.validate().unwrap();
}

#[test]
fn injected_span_is_used() {
    let store = TestStore::new();
    let span = tracing::info_span!("custom", tenant = "acme");
    let ds = store.second_facade().with_span(span);
    ds.set("k", &json!(1), &plain()).unwrap();
    assert_eq!(ds.read("k").unwrap(), Some(json!(1)));
}
