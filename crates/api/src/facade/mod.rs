//! Facade API - one handle, one bucket
//!
//! The facade hides the store client behind a small surface with a fixed
//! error taxonomy. Client result objects and client errors never cross it.
//!
//! ## Module Structure
//!
//! - `impl_`: the [`Datastore`] handle and its constructors
//! - `types`: write, view and index option types
//! - `kv`: document CRUD, CAS and locks
//! - `view`: design documents and view reads
//! - `query`: secondary indexes and ad hoc statements
//! - `bucket`: whole-bucket operations
//!
//! ## Shims
//!
//! | Facade Call | Client Calls |
//! |-------------|--------------|
//! | `set_with_cas(k, v, opts, cas)` | `replace(k, v, cas)`, then `insert(k, v)` if absent |
//! | `set(k, v, opts)` | `upsert`, or `replace` when `opts.cas` is set |
//! | `view(d, v, q)` | `view_query` with `stale` translated and keys JSON-encoded |
//! | `n1ql_index_*` | `query` with a generated statement |

mod bucket;
mod convert;
mod impl_;
mod kv;
mod query;
mod types;
mod view;

pub use bucket::BucketFacade;
pub use impl_::Datastore;
pub use kv::KvFacade;
pub use query::QueryFacade;
pub use types::{IndexCreateOptions, ViewQuery, WriteOptions};
pub use view::ViewFacade;
