//! Store client interface
//!
//! This crate describes the client library a datastore facade wraps: the
//! operations it exposes, the errors it raises and the result objects it
//! returns. It plays the role of a document store's official client API, so
//! that the facade can be written against one shape while implementations
//! (the in-process `memory` store, or adapters over network clients) vary.
//!
//! - `traits`: `Connector` and `Client`
//! - `error`: `ClientError`
//! - `connection`: connection strings and connect requests
//! - `result`: get/mutation results and the default transcoder
//! - `view`: view query options and raw rows
//! - `query`: query-language results

#![warn(clippy::all)]

pub mod connection;
pub mod error;
pub mod query;
pub mod result;
pub mod traits;
pub mod view;

pub use connection::{format_seconds, parse_seconds, ConnectSpec, ConnectionString};
pub use error::{ClientError, ClientResult};
pub use query::{QueryMetrics, QueryResult};
pub use result::{
    decode, encode, GetResult, MutateOptions, MutationResult, MutationToken, FORMAT_BINARY,
    FORMAT_JSON, FORMAT_STRING, RELATIVE_EXPIRY_LIMIT,
};
pub use traits::{Client, Connector};
pub use view::{DesignDocumentNamespace, RawViewRow, ScanConsistency, ViewOptions, ViewResult};
