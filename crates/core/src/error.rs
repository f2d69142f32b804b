//! Error types for the datastore facade
//!
//! Every facade operation returns [`Result<T>`]. The variants form a small,
//! stable taxonomy that callers can match on regardless of which store
//! client is installed underneath:
//!
//! | Category | Variants |
//! |----------|----------|
//! | Absence | `NotFound` |
//! | Concurrency | `AlreadyExists`, `VersionConflict`, `Locked` |
//! | Connectivity | `ConnectionFailure`, `Timeout` |
//! | Caller input | `InvalidArgument`, `InvalidConfig` |
//! | Store policy | `FlushDisabled`, `Query` |
//! | Everything else | `Unexpected` |
//!
//! Concurrency errors are never folded into a boolean `false`: a caller that
//! receives `Ok(false)` from `delete` knows the key was absent, nothing more.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for facade operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of entity a `NotFound` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A document key
    Document,
    /// A design document
    DesignDocument,
    /// A view inside a design document
    View,
    /// A secondary index
    Index,
    /// A bucket
    Bucket,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Document => "document",
            EntityKind::DesignDocument => "design document",
            EntityKind::View => "view",
            EntityKind::Index => "index",
            EntityKind::Bucket => "bucket",
        };
        f.write_str(name)
    }
}

/// Facade error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ==================== Absence ====================
    /// The targeted document, design document, view or index does not exist
    #[error("{entity} not found: {name}")]
    NotFound {
        /// What kind of entity was looked up
        entity: EntityKind,
        /// Its key or name
        name: String,
    },

    // ==================== Concurrency ====================
    /// Insert attempted on a key (or index name) that already exists
    #[error("already exists: {key}")]
    AlreadyExists {
        /// Conflicting key or name
        key: String,
    },

    /// Caller-supplied CAS no longer matches the document
    #[error("version conflict on {key}")]
    VersionConflict {
        /// Document key
        key: String,
    },

    /// Document is held by a lock the caller does not own
    #[error("document locked: {key}")]
    Locked {
        /// Document key
        key: String,
    },

    // ==================== Connectivity ====================
    /// Could not establish or keep the connection; fatal to the facade instance
    #[error("connection failure: {reason}")]
    ConnectionFailure {
        /// Client-reported cause
        reason: String,
    },

    /// The store client gave up waiting for the operation
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Facade operation name
        operation: String,
    },

    // ==================== Caller input ====================
    /// An argument was rejected at the facade boundary
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong
        reason: String,
    },

    /// Connection or file configuration is unusable
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// What was wrong
        reason: String,
    },

    // ==================== Store policy ====================
    /// `flush_bucket` on a bucket provisioned without flush
    #[error("flush is disabled for bucket {bucket}")]
    FlushDisabled {
        /// Bucket name
        bucket: String,
    },

    /// Query statement rejected by the store
    #[error("query failed: {reason}")]
    Query {
        /// Store-reported cause
        reason: String,
    },

    // ==================== Everything else ====================
    /// Any other client failure, carried with enough context to diagnose
    #[error("unexpected error in {operation} ({key}): {reason}")]
    Unexpected {
        /// Facade operation name
        operation: String,
        /// Key or name the operation targeted (empty when none)
        key: String,
        /// Client-reported cause
        reason: String,
    },
}

impl Error {
    /// Document `key` does not exist
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound {
            entity: EntityKind::Document,
            name: key.into(),
        }
    }

    /// A non-document entity does not exist
    pub fn entity_not_found(entity: EntityKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            name: name.into(),
        }
    }

    /// `key` already exists
    pub fn already_exists(key: impl Into<String>) -> Self {
        Error::AlreadyExists { key: key.into() }
    }

    /// CAS mismatch on `key`
    pub fn version_conflict(key: impl Into<String>) -> Self {
        Error::VersionConflict { key: key.into() }
    }

    /// `key` is locked
    pub fn locked(key: impl Into<String>) -> Self {
        Error::Locked { key: key.into() }
    }

    /// Connection could not be established or was lost
    pub fn connection(reason: impl Into<String>) -> Self {
        Error::ConnectionFailure {
            reason: reason.into(),
        }
    }

    /// Argument rejected at the boundary
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Configuration rejected
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Unclassified client failure
    pub fn unexpected(
        operation: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Unexpected {
            operation: operation.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True for any `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for `AlreadyExists`
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// True for `VersionConflict`
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Error::VersionConflict { .. })
    }

    /// True for `Locked`
    pub fn is_locked(&self) -> bool {
        matches!(self, Error::Locked { .. })
    }

    /// True for errors caused by the connection rather than program logic
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::ConnectionFailure { .. } | Error::Timeout { .. })
    }
}
