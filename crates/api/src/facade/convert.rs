//! Client-to-facade conversions
//!
//! Client errors and result objects stop here. Operations decide which
//! not-found outcomes are sentinels (`Ok(None)`, `Ok(false)`) before calling
//! [`map_error`]; everything that reaches it is a real failure.

use datastore_client::{ClientError, GetResult, MutationResult, RawViewRow};
use datastore_core::{Cas, Document, EntityKind, Error, Result, ViewRow};
use serde_json::Value;
use tracing::warn;

/// Translate a client error raised by `operation` on `key`
///
/// Failures with no facade counterpart are logged and returned as
/// `Unexpected`, carrying the operation and key.
pub(crate) fn map_error(err: ClientError, operation: &'static str, key: &str) -> Error {
    match err {
        ClientError::DocumentNotFound { key } => Error::not_found(key),
        ClientError::DocumentExists { key } => Error::already_exists(key),
        ClientError::CasMismatch { key } => Error::version_conflict(key),
        ClientError::DocumentLocked { key } => Error::locked(key),
        ClientError::DesignDocumentNotFound { name } => {
            Error::entity_not_found(EntityKind::DesignDocument, name)
        }
        ClientError::ViewNotFound { design, view } => {
            Error::entity_not_found(EntityKind::View, format!("{}/{}", design, view))
        }
        ClientError::IndexExists { name } => Error::already_exists(name),
        ClientError::IndexNotFound { name } => Error::entity_not_found(EntityKind::Index, name),
        ClientError::Query { code, message } => Error::Query {
            reason: format!("[{}] {}", code, message),
        },
        ClientError::FlushDisabled { bucket } => Error::FlushDisabled { bucket },
        ClientError::Network { reason } | ClientError::Authentication { reason } => {
            Error::connection(reason)
        }
        ClientError::BucketNotFound { bucket } => {
            Error::connection(format!("bucket {} not found", bucket))
        }
        ClientError::Timeout { .. } => Error::Timeout {
            operation: operation.to_string(),
        },
        ClientError::InvalidArgument { reason } => Error::invalid_argument(reason),
        other => {
            warn!(
                target: "datastore::facade",
                operation,
                key = %key,
                error = %other,
                "Unexpected client error"
            );
            Error::unexpected(operation, key, other.to_string())
        }
    }
}

/// Translate a failure from `Connector::connect`
pub(crate) fn map_connect_error(err: ClientError) -> Error {
    match err {
        ClientError::InvalidArgument { reason } => Error::invalid_config(reason),
        other => Error::connection(other.to_string()),
    }
}

/// Decode a fetched document into the facade shape
pub(crate) fn document_from(
    result: GetResult,
    operation: &'static str,
    key: &str,
) -> Result<Document> {
    let value = result
        .content_value()
        .map_err(|e| map_error(e, operation, key))?;
    Ok(Document::new(value, Cas::new(result.cas)))
}

pub(crate) fn cas_from(result: &MutationResult) -> Cas {
    Cas::new(result.cas)
}

/// Decode a raw view row, keeping undecodable text as a string
pub(crate) fn view_row_from(raw: RawViewRow) -> ViewRow {
    ViewRow {
        id: raw.id,
        key: decode_or_raw(raw.key),
        value: decode_or_raw(raw.value),
    }
}

fn decode_or_raw(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}
