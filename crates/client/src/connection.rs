//! Connection strings and connect requests
//!
//! A connection string has the shape `scheme://host[,host...][?key=value&...]`.
//! The scheme selects the client implementation; query parameters carry
//! client tunables such as `operation_timeout` (seconds, fractional allowed).

use crate::error::{ClientError, ClientResult};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Parsed `scheme://hosts?params` connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    scheme: String,
    hosts: Vec<String>,
    params: BTreeMap<String, String>,
}

impl ConnectionString {
    /// Connection string for a single host with no parameters
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        ConnectionString {
            scheme: scheme.into(),
            hosts: vec![host.into()],
            params: BTreeMap::new(),
        }
    }

    /// Add a query parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// First host, the one a single-node client dials
    pub fn primary_host(&self) -> &str {
        self.hosts.first().map(String::as_str).unwrap_or("")
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parameter interpreted as seconds
    pub fn param_duration(&self, key: &str) -> ClientResult<Option<Duration>> {
        match self.param(key) {
            None => Ok(None),
            Some(raw) => parse_seconds(raw)
                .map(Some)
                .ok_or_else(|| {
                    ClientError::invalid_argument(format!(
                        "connection parameter {} must be a non-negative number of seconds, got '{}'",
                        key, raw
                    ))
                }),
        }
    }
}

/// Parse a decimal number of seconds into a `Duration`
pub fn parse_seconds(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Render a `Duration` as decimal seconds, trimming trailing zeros
pub fn format_seconds(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 == 0 {
        format!("{}", millis / 1000)
    } else {
        let rendered = format!("{:.3}", duration.as_secs_f64());
        rendered.trim_end_matches('0').to_string()
    }
}

impl FromStr for ConnectionString {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        let (scheme, rest) = s.split_once("://").ok_or_else(|| {
            ClientError::invalid_argument(format!("connection string '{}' has no scheme", s))
        })?;
        if scheme.is_empty() {
            return Err(ClientError::invalid_argument(format!(
                "connection string '{}' has an empty scheme",
                s
            )));
        }

        let (hosts_part, query) = match rest.split_once('?') {
            Some((hosts, query)) => (hosts.trim_end_matches('/'), Some(query)),
            None => (rest.trim_end_matches('/'), None),
        };

        let hosts: Vec<String> = hosts_part
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        if hosts.is_empty() {
            return Err(ClientError::invalid_argument(format!(
                "connection string '{}' names no host",
                s
            )));
        }

        let mut params = BTreeMap::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    ClientError::invalid_argument(format!(
                        "connection parameter '{}' is not key=value",
                        pair
                    ))
                })?;
                params.insert(key.to_string(), value.to_string());
            }
        }

        Ok(ConnectionString {
            scheme: scheme.to_string(),
            hosts,
            params,
        })
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.hosts.join(","))?;
        let mut sep = '?';
        for (key, value) in &self.params {
            write!(f, "{}{}={}", sep, key, value)?;
            sep = '&';
        }
        Ok(())
    }
}

/// Everything a connector needs to open a bucket
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectSpec {
    pub connection_string: ConnectionString,
    pub username: String,
    pub password: String,
    pub bucket: String,
    /// Options outside the connection-string allow-list, forwarded only to
    /// connectors that accept arbitrary options
    pub extra: BTreeMap<String, String>,
}

impl fmt::Debug for ConnectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectSpec")
            .field("connection_string", &self.connection_string.to_string())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("extra", &self.extra)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let cs: ConnectionString = "memory://localhost".parse().unwrap();
        assert_eq!(cs.scheme(), "memory");
        assert_eq!(cs.primary_host(), "localhost");
        assert!(cs.params().is_empty());
    }

    #[test]
    fn test_parse_hosts_and_params() {
        let cs: ConnectionString = "couchbase://a,b/?operation_timeout=2.5&config_node_timeout=1"
            .parse()
            .unwrap();
        assert_eq!(cs.hosts(), &["a".to_string(), "b".to_string()]);
        assert_eq!(cs.param("operation_timeout"), Some("2.5"));
        assert_eq!(
            cs.param_duration("operation_timeout").unwrap(),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(cs.param_duration("missing").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!("localhost".parse::<ConnectionString>().is_err());
        assert!("://localhost".parse::<ConnectionString>().is_err());
        assert!("memory://".parse::<ConnectionString>().is_err());
        assert!("memory://h?novalue".parse::<ConnectionString>().is_err());
    }

    #[test]
    fn test_bad_duration_param() {
        let cs: ConnectionString = "memory://h?operation_timeout=soon".parse().unwrap();
        assert!(cs.param_duration("operation_timeout").is_err());
        let cs: ConnectionString = "memory://h?operation_timeout=-1".parse().unwrap();
        assert!(cs.param_duration("operation_timeout").is_err());
        let cs: ConnectionString = "memory://h?operation_timeout=1e30".parse().unwrap();
        assert!(cs.param_duration("operation_timeout").is_err());
    }

    #[test]
    fn test_parse_seconds_bounds() {
        assert_eq!(parse_seconds("0"), Some(Duration::ZERO));
        assert_eq!(parse_seconds(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_seconds("1e30"), None);
        assert_eq!(parse_seconds("inf"), None);
        assert_eq!(parse_seconds("NaN"), None);
    }

    #[test]
    fn test_display_round_trip() {
        let cs = ConnectionString::new("memory", "node1")
            .with_param("operation_timeout", "2.5")
            .with_param("config_total_timeout", "10");
        let rendered = cs.to_string();
        assert_eq!(
            rendered,
            "memory://node1?config_total_timeout=10&operation_timeout=2.5"
        );
        assert_eq!(rendered.parse::<ConnectionString>().unwrap(), cs);
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Duration::from_secs(10)), "10");
        assert_eq!(format_seconds(Duration::from_millis(2500)), "2.5");
        assert_eq!(format_seconds(Duration::from_millis(1250)), "1.25");
    }

    #[test]
    fn test_spec_debug_redacts_password() {
        let spec = ConnectSpec {
            connection_string: ConnectionString::new("memory", "h"),
            username: "Administrator".into(),
            password: "hunter2".into(),
            bucket: "test".into(),
            extra: BTreeMap::new(),
        };
        let rendered = format!("{:?}", spec);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
