//! Key-value result objects and the default transcoder
//!
//! Documents travel as bytes plus a 32-bit flags word whose top byte names
//! the format (the common-flags convention). The client encodes on the way
//! in and decodes on the way out; callers of the client see
//! `serde_json::Value` only through [`GetResult::content_as`].

use crate::error::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Common-flags format for JSON documents
pub const FORMAT_JSON: u32 = 0x0200_0000;
/// Common-flags format for opaque binary documents
pub const FORMAT_BINARY: u32 = 0x0300_0000;
/// Common-flags format for UTF-8 strings
pub const FORMAT_STRING: u32 = 0x0400_0000;

const FORMAT_MASK: u32 = 0xFF00_0000;

/// Encode a value: strings as raw UTF-8, everything else as JSON
pub fn encode(value: &Value) -> ClientResult<(Vec<u8>, u32)> {
    match value {
        Value::String(s) => Ok((s.as_bytes().to_vec(), FORMAT_STRING)),
        other => serde_json::to_vec(other)
            .map(|bytes| (bytes, FORMAT_JSON))
            .map_err(|e| ClientError::Encoding {
                reason: e.to_string(),
            }),
    }
}

/// Decode bytes written by [`encode`]
pub fn decode(content: &[u8], flags: u32) -> ClientResult<Value> {
    match flags & FORMAT_MASK {
        FORMAT_STRING => std::str::from_utf8(content)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| ClientError::Encoding {
                reason: e.to_string(),
            }),
        FORMAT_JSON | 0 => serde_json::from_slice(content).map_err(|e| ClientError::Encoding {
            reason: e.to_string(),
        }),
        other => Err(ClientError::Encoding {
            reason: format!("unsupported document format {:#010x}", other),
        }),
    }
}

/// Result of a get or get-and-lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    pub content: Vec<u8>,
    pub flags: u32,
    pub cas: u64,
}

impl GetResult {
    /// Decode the body as a JSON value
    pub fn content_value(&self) -> ClientResult<Value> {
        decode(&self.content, self.flags)
    }

    /// Decode the body into a caller type
    pub fn content_as<T: DeserializeOwned>(&self) -> ClientResult<T> {
        let value = self.content_value()?;
        serde_json::from_value(value).map_err(|e| ClientError::Encoding {
            reason: e.to_string(),
        })
    }
}

/// Identifies a mutation within a partition's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationToken {
    pub bucket: String,
    pub partition: u16,
    pub sequence: u64,
}

/// Result of insert/replace/upsert/remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub cas: u64,
    pub token: Option<MutationToken>,
}

/// Options accepted by every mutation
///
/// `cas` of zero means unconditional. `expiry` uses the wire convention:
/// seconds, where values above 30 days are absolute unix timestamps and
/// zero means "never".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutateOptions {
    pub cas: u64,
    pub expiry: u32,
}

/// Largest expiry interpreted as relative seconds
pub const RELATIVE_EXPIRY_LIMIT: u32 = 30 * 24 * 60 * 60;

impl MutateOptions {
    pub fn with_cas(mut self, cas: u64) -> Self {
        self.cas = cas;
        self
    }

    pub fn with_expiry(mut self, expiry: u32) -> Self {
        self.expiry = expiry;
        self
    }

    /// Relative expiry, valid only up to [`RELATIVE_EXPIRY_LIMIT`]
    pub fn with_relative_expiry(self, ttl: Duration) -> ClientResult<Self> {
        let secs = ttl.as_secs();
        if secs > u64::from(RELATIVE_EXPIRY_LIMIT) {
            return Err(ClientError::invalid_argument(format!(
                "relative expiry of {}s exceeds the 30 day limit",
                secs
            )));
        }
        Ok(self.with_expiry(secs as u32))
    }
}
