//! Connection configuration
//!
//! [`ConnectOptions`] is what a facade is opened from. It can be built in
//! code or loaded from a `datastore.toml` file through [`DatastoreConfig`]:
//!
//! ```toml
//! backend = "memory"
//! host = "localhost"
//! username = "Administrator"
//! password = "password"
//! bucket = "test"
//!
//! [options]
//! operation_timeout = "2.5"
//! ```
//!
//! Only the tunables in [`ALLOWED_TUNABLES`] become connection-string
//! parameters. Any other `[options]` key is forwarded to the client only if
//! its connector accepts arbitrary options; otherwise it is dropped with a
//! warning.

use datastore_client::{format_seconds, parse_seconds, ConnectSpec, ConnectionString};
use datastore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Config file name conventionally used for [`DatastoreConfig`]
pub const CONFIG_FILE_NAME: &str = "datastore.toml";

/// Tunables that become connection-string parameters
pub const ALLOWED_TUNABLES: &[&str] = &[
    "operation_timeout",
    "config_total_timeout",
    "config_node_timeout",
];

fn default_backend() -> String {
    "memory".to_string()
}

/// Everything needed to open a facade
///
/// Durations in `options` are decimal seconds, as they appear in connection
/// strings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Backend scheme (`memory`, ...)
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Host the store listens on
    pub host: String,
    /// Username
    #[serde(default)]
    pub username: String,
    /// Password
    #[serde(default)]
    pub password: String,
    /// Bucket to bind to
    pub bucket: String,
    /// Tunables and pass-through options
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("options", &self.options)
            .finish()
    }
}

impl ConnectOptions {
    /// Options for `bucket` on `host`, using the in-memory backend
    pub fn new(host: impl Into<String>, bucket: impl Into<String>) -> Self {
        ConnectOptions {
            backend: default_backend(),
            host: host.into(),
            username: String::new(),
            password: String::new(),
            bucket: bucket.into(),
            options: BTreeMap::new(),
        }
    }

    /// Select the backend scheme
    pub fn backend(mut self, scheme: impl Into<String>) -> Self {
        self.backend = scheme.into();
        self
    }

    /// Set credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Timeout the client applies to each operation
    pub fn operation_timeout(self, timeout: Duration) -> Self {
        self.option("operation_timeout", format_seconds(timeout))
    }

    /// Timeout for fetching the cluster configuration
    pub fn config_total_timeout(self, timeout: Duration) -> Self {
        self.option("config_total_timeout", format_seconds(timeout))
    }

    /// Timeout for fetching configuration from one node
    pub fn config_node_timeout(self, timeout: Duration) -> Self {
        self.option("config_node_timeout", format_seconds(timeout))
    }

    /// Set any option; keys outside [`ALLOWED_TUNABLES`] are pass-through
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Check the options before connecting
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::invalid_config("host must not be empty"));
        }
        if self.bucket.trim().is_empty() {
            return Err(Error::invalid_config("bucket must not be empty"));
        }
        for key in ALLOWED_TUNABLES {
            if let Some(raw) = self.options.get(*key) {
                if parse_seconds(raw).is_none() {
                    return Err(Error::invalid_config(format!(
                        "{} must be a non-negative number of seconds, got '{}'",
                        key, raw
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the connector request
    ///
    /// Allow-listed tunables go into the connection string. Everything else
    /// lands in `extra` when `accepts_extra` is set and is dropped otherwise.
    pub fn to_spec(&self, accepts_extra: bool) -> Result<ConnectSpec> {
        self.validate()?;
        let mut connection_string = ConnectionString::new(&self.backend, &self.host);
        let mut extra = BTreeMap::new();

        for (key, value) in &self.options {
            if ALLOWED_TUNABLES.contains(&key.as_str()) {
                connection_string = connection_string.with_param(key, value);
            } else if accepts_extra {
                extra.insert(key.clone(), value.clone());
            } else {
                warn!(
                    target: "datastore::facade",
                    option = %key,
                    backend = %self.backend,
                    "Dropping option the backend does not accept"
                );
            }
        }

        Ok(ConnectSpec {
            connection_string,
            username: self.username.clone(),
            password: self.password.clone(),
            bucket: self.bucket.clone(),
            extra,
        })
    }
}

/// Facade configuration loaded from `datastore.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatastoreConfig {
    /// Connection settings, at the top level of the file
    pub connection: ConnectOptions,
}

impl DatastoreConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Datastore facade configuration
#
# Backend scheme. "memory" is the in-process store.
backend = "memory"

# Where the store listens, and the bucket to bind to.
host = "localhost"
bucket = "default"

# Credentials.
username = "Administrator"
password = "password"

# Connection tunables, in seconds. Only operation_timeout,
# config_total_timeout and config_node_timeout are passed to the
# connection string; other keys reach the client only if its backend
# accepts arbitrary options.
[options]
# operation_timeout = "2.5"
# config_total_timeout = "10"
# config_node_timeout = "2"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, parsed, or
    /// validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::InvalidConfig { reason } => Error::invalid_config(format!(
                "config file '{}': {}",
                path.display(),
                reason
            )),
            other => other,
        })
    }

    /// Parse config text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DatastoreConfig = toml::from_str(content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse config: {}", e)))?;
        config.connection.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::invalid_config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::invalid_config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
