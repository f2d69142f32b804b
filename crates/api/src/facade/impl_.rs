//! The facade handle
//!
//! `Datastore` owns a client bound to one bucket and a tracing span. Every
//! facade trait in this module tree is implemented for it; none of them hold
//! state of their own.

use std::fmt;
use std::sync::Arc;

use datastore_client::Client;
use datastore_core::Result;
use tracing::{info, info_span, Span};

use super::convert::map_connect_error;
use crate::config::ConnectOptions;
use crate::registry::BackendRegistry;

// =============================================================================
// Datastore
// =============================================================================

/// A facade bound to one bucket
///
/// Cheap to share behind an `Arc`; all methods take `&self` and the
/// facade adds no locking of its own.
pub struct Datastore {
    /// The store client, already authenticated and bound
    client: Arc<dyn Client>,

    /// Span every operation runs in
    span: Span,
}

impl Datastore {
    /// Connect using the built-in backends
    ///
    /// Returns only once the client is bound to the bucket.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for malformed options or an unknown backend
    /// - `ConnectionFailure` when the store is unreachable, rejects the
    ///   credentials or has no such bucket
    pub fn connect(options: &ConnectOptions) -> Result<Self> {
        Self::open(options, &BackendRegistry::with_defaults())
    }

    /// Connect through an explicit backend registry
    pub fn open(options: &ConnectOptions, registry: &BackendRegistry) -> Result<Self> {
        options.validate()?;
        let connector = registry.get(&options.backend)?;
        let spec = options.to_spec(connector.accepts_extra_options())?;
        let client = connector.connect(&spec).map_err(map_connect_error)?;

        let datastore = Self::from_client(client);
        info!(
            target: "datastore::facade",
            parent: &datastore.span,
            backend = %options.backend,
            host = %options.host,
            "Connected"
        );
        Ok(datastore)
    }

    /// Wrap a client that is already bound to a bucket
    pub fn from_client(client: Arc<dyn Client>) -> Self {
        let span = info_span!(target: "datastore::facade", "datastore", bucket = %client.bucket_name());
        Datastore { client, span }
    }

    /// Replace the span operations are recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Name of the bound bucket
    pub fn bucket_name(&self) -> &str {
        self.client.bucket_name()
    }

    pub(crate) fn client(&self) -> &dyn Client {
        self.client.as_ref()
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }
}

impl fmt::Debug for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastore")
            .field("bucket", &self.bucket_name())
            .field("operation_timeout", &self.client.operation_timeout())
            .finish()
    }
}
