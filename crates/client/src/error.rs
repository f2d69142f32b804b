//! Client error types
//!
//! These mirror the error kinds a document-store client raises. They are
//! deliberately finer-grained than the facade taxonomy (for example
//! `DocumentNotLocked` or `IndexNotFound`), because a client reports what
//! the server said, not what the caller should do about it.

use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors reported by a store client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // ==================== Key-value ====================
    /// No document under `key`
    #[error("document not found: {key}")]
    DocumentNotFound { key: String },

    /// Insert hit an existing document
    #[error("document exists: {key}")]
    DocumentExists { key: String },

    /// CAS supplied with a mutation did not match
    #[error("CAS mismatch: {key}")]
    CasMismatch { key: String },

    /// Document is locked and the request did not carry the lock CAS
    #[error("document locked: {key}")]
    DocumentLocked { key: String },

    /// Unlock on a document that holds no lock
    #[error("document not locked: {key}")]
    DocumentNotLocked { key: String },

    /// Stored bytes could not be encoded or decoded
    #[error("encoding error: {reason}")]
    Encoding { reason: String },

    // ==================== Views ====================
    /// Design document missing from the requested namespace
    #[error("design document not found: {name}")]
    DesignDocumentNotFound { name: String },

    /// View missing from an existing design document
    #[error("view not found: {design}/{view}")]
    ViewNotFound { design: String, view: String },

    // ==================== Query ====================
    /// Statement failed to parse or execute
    #[error("query error {code}: {message}")]
    Query { code: u32, message: String },

    /// `CREATE INDEX` on a name already in use
    #[error("index exists: {name}")]
    IndexExists { name: String },

    /// `DROP INDEX` / `BUILD INDEX` on an unknown name
    #[error("index not found: {name}")]
    IndexNotFound { name: String },

    // ==================== Cluster ====================
    /// Flush requested on a bucket without flush enabled
    #[error("flush disabled for bucket {bucket}")]
    FlushDisabled { bucket: String },

    /// Bucket does not exist on the cluster
    #[error("bucket not found: {bucket}")]
    BucketNotFound { bucket: String },

    /// Credentials rejected
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    /// Cluster unreachable
    #[error("network error: {reason}")]
    Network { reason: String },

    /// Operation exceeded the configured timeout
    #[error("timeout: {operation}")]
    Timeout { operation: String },

    /// Request rejected before it reached the server
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Server-side failure with no better classification
    #[error("internal server error: {reason}")]
    Internal { reason: String },
}

impl ClientError {
    /// Query error with the generic semantic-error code
    pub fn query(message: impl Into<String>) -> Self {
        ClientError::Query {
            code: 3000,
            message: message.into(),
        }
    }

    /// Invalid request argument
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        ClientError::InvalidArgument {
            reason: reason.into(),
        }
    }
}
