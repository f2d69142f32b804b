//! Facade Test Suite
//!
//! Exercises the `Datastore` facade end to end against the in-process
//! `memory://` backend.
//!
//! ## Modules
//!
//! - `crud`: create/read/set/update/delete and the not-found policy
//! - `cas`: optimistic concurrency
//! - `lock`: pessimistic locks
//! - `multi`: batch reads
//! - `expiry`: document expiry
//! - `views`: design documents and view queries
//! - `indexes`: secondary indexes and ad hoc queries
//! - `connect`: connection setup and config files
//! - `flush`: bucket flush
//! - `concurrency`: several threads on one bucket
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test facade
//! cargo test --test facade views::
//! cargo test --test facade -- --nocapture
//! ```

#[path = "../common/mod.rs"]
mod common;

mod cas;
mod concurrency;
mod connect;
mod crud;
mod expiry;
mod flush;
mod indexes;
mod lock;
mod multi;
mod views;
