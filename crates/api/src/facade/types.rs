//! Facade option types
//!
//! These are the only knobs facade callers see. Each converts to the
//! client's option type at the boundary, so client vocabulary never leaks
//! into calling code.

use chrono::Utc;
use datastore_client::{
    DesignDocumentNamespace, MutateOptions, ScanConsistency, ViewOptions, RELATIVE_EXPIRY_LIMIT,
};
use datastore_core::{Cas, DesignNamespace, Error, Result, Stale, Value};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Writes
// =============================================================================

/// Options for `create`, `update`, `set` and `delete`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Make the write conditional on this version token
    pub cas: Option<Cas>,
    /// Time to live; `None` means the document never expires
    pub expiry: Option<Duration>,
}

impl WriteOptions {
    /// Unconditional write, no expiry
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the document to still carry `cas`
    pub fn with_cas(mut self, cas: Cas) -> Self {
        self.cas = cas.into_option();
        self
    }

    /// Expire the document after `ttl`
    pub fn with_expiry(mut self, ttl: Duration) -> Self {
        self.expiry = Some(ttl);
        self
    }

    /// Client mutation options
    ///
    /// Expiries up to 30 days travel as relative seconds; longer ones are
    /// converted to an absolute unix timestamp.
    pub(crate) fn to_mutate_options(self) -> Result<MutateOptions> {
        let mut options = MutateOptions::default();
        if let Some(cas) = self.cas {
            options = options.with_cas(cas.as_u64());
        }
        if let Some(ttl) = self.expiry {
            options = options.with_expiry(expiry_to_wire(ttl)?);
        }
        Ok(options)
    }
}

fn expiry_to_wire(ttl: Duration) -> Result<u32> {
    let secs = ttl.as_secs();
    if secs == 0 {
        // Sub-second expiries round up rather than meaning "never"
        return Ok(if ttl.is_zero() { 0 } else { 1 });
    }
    if secs <= u64::from(RELATIVE_EXPIRY_LIMIT) {
        return Ok(secs as u32);
    }
    let too_far = || Error::invalid_argument(format!("expiry of {}s is too far in the future", secs));
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
    let absolute = now.checked_add(secs).ok_or_else(too_far)?;
    u32::try_from(absolute).map_err(|_| too_far())
}

// =============================================================================
// Views
// =============================================================================

/// View query parameters
///
/// Keys are facade values; they are JSON-encoded only when handed to the
/// client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    /// Index freshness
    pub stale: Stale,
    /// Namespace the design document lives in
    pub namespace: DesignNamespace,
    /// Exact key
    pub key: Option<Value>,
    /// Set of exact keys, rows returned in this order
    pub keys: Option<Vec<Value>>,
    /// Range start
    pub startkey: Option<Value>,
    /// Range end
    pub endkey: Option<Value>,
    /// Whether `endkey` is included (default true)
    pub inclusive_end: Option<bool>,
    /// Iterate from the high end
    pub descending: bool,
    /// Rows to skip
    pub skip: Option<u64>,
    /// Maximum rows
    pub limit: Option<u64>,
    /// Apply the view's reduce (defaults to true when it has one)
    pub reduce: Option<bool>,
    /// Group reduced rows by key
    pub group: bool,
    /// Group reduced rows by array-key prefix
    pub group_level: Option<u32>,
}

impl ViewQuery {
    /// Default query: every row, `stale=update_after`, production namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Index freshness
    pub fn stale(mut self, stale: Stale) -> Self {
        self.stale = stale;
        self
    }

    /// Set staleness from its wire spelling, rejecting anything else
    pub fn stale_str(self, stale: &str) -> Result<Self> {
        Ok(self.stale(stale.parse()?))
    }

    /// Set staleness from a JSON option value (`false`, `"ok"`, ...)
    pub fn stale_value(self, stale: &Value) -> Result<Self> {
        Ok(self.stale(Stale::from_value(stale)?))
    }

    /// Query the development namespace
    pub fn development(mut self) -> Self {
        self.namespace = DesignNamespace::Development;
        self
    }

    /// Design-document namespace
    pub fn namespace(mut self, namespace: DesignNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Match one key exactly
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Match any of `keys`, in the given order
    pub fn keys(mut self, keys: Vec<Value>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Restrict to `start..=end`; either bound may be open
    pub fn range(mut self, start: Option<Value>, end: Option<Value>) -> Self {
        self.startkey = start;
        self.endkey = end;
        self
    }

    /// Whether the range end is included
    pub fn inclusive_end(mut self, inclusive: bool) -> Self {
        self.inclusive_end = Some(inclusive);
        self
    }

    /// Iterate from the high end
    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Skip the first `skip` rows
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Return at most `limit` rows
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply or bypass the view's reduce
    pub fn reduce(mut self, reduce: bool) -> Self {
        self.reduce = Some(reduce);
        self
    }

    /// Group reduced rows by key
    pub fn group(mut self, group: bool) -> Self {
        self.group = group;
        self
    }

    /// Group reduced rows by the first `level` array-key elements
    pub fn group_level(mut self, level: u32) -> Self {
        self.group_level = Some(level);
        self
    }

    /// Client view options; key arguments become JSON text
    pub(crate) fn to_view_options(&self) -> Result<ViewOptions> {
        Ok(ViewOptions {
            scan_consistency: scan_consistency(self.stale),
            namespace: design_namespace(self.namespace),
            key: self.key.as_ref().map(encode_key).transpose()?,
            keys: self
                .keys
                .as_ref()
                .map(|keys| encode_key(&Value::Array(keys.clone())))
                .transpose()?,
            startkey: self.startkey.as_ref().map(encode_key).transpose()?,
            endkey: self.endkey.as_ref().map(encode_key).transpose()?,
            inclusive_end: self.inclusive_end,
            descending: self.descending,
            skip: self.skip,
            limit: self.limit,
            reduce: self.reduce,
            group: self.group,
            group_level: self.group_level,
        })
    }
}

fn encode_key(key: &Value) -> Result<String> {
    serde_json::to_string(key)
        .map_err(|e| Error::invalid_argument(format!("view key is not encodable: {}", e)))
}

/// `stale` vocabulary to the client's consistency vocabulary
pub(crate) fn scan_consistency(stale: Stale) -> ScanConsistency {
    match stale {
        Stale::False => ScanConsistency::RequestPlus,
        Stale::Ok => ScanConsistency::NotBounded,
        Stale::UpdateAfter => ScanConsistency::UpdateAfter,
    }
}

pub(crate) fn design_namespace(namespace: DesignNamespace) -> DesignDocumentNamespace {
    match namespace {
        DesignNamespace::Production => DesignDocumentNamespace::Production,
        DesignNamespace::Development => DesignDocumentNamespace::Development,
    }
}

// =============================================================================
// Indexes
// =============================================================================

/// Options for `n1ql_index_create`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCreateOptions {
    /// Succeed without change when an index of that name exists
    pub ignore_if_exists: bool,
    /// Declare the index without building it
    pub defer_build: bool,
}

impl IndexCreateOptions {
    /// Fail on existing names, build immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat an existing index of the same name as success
    pub fn ignore_if_exists(mut self) -> Self {
        self.ignore_if_exists = true;
        self
    }

    /// Declare without building
    pub fn defer_build(mut self) -> Self {
        self.defer_build = true;
        self
    }
}
