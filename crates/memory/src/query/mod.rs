//! Query-language subset
//!
//! Enough of the query language to manage secondary indexes and run simple
//! scans:
//!
//! - `CREATE [PRIMARY] INDEX name ON keyspace(path, ...) [USING GSI] [WITH {...}]`
//! - `DROP INDEX keyspace.name`, `DROP INDEX name ON keyspace`,
//!   `DROP PRIMARY INDEX ON keyspace`
//! - `BUILD INDEX ON keyspace(name, ...)`
//! - `SELECT * | alias.* | expr [AS name], ... FROM keyspace [AS alias]
//!   [WHERE ...] [ORDER BY ... [ASC|DESC]] [LIMIT n] [OFFSET n]`
//!
//! `system:indexes` lists the index catalog of every bucket on the cluster.
//!
//! Error codes follow the server: 3000 for syntax errors, 4000 when no index
//! can serve a scan, 12003 for an unknown keyspace.

pub mod ast;
pub mod catalog;
pub mod exec;
pub mod lexer;
pub mod parser;

pub use catalog::{IndexCatalog, IndexDefinition, IndexState};

use crate::cluster::MemoryCluster;
use ast::KeyspaceRef;
use datastore_client::{ClientError, ClientResult, QueryMetrics, QueryResult};
use std::time::{Duration, Instant};
use thiserror::Error;

pub const SYNTAX_ERROR: u32 = 3000;
pub const NO_INDEX: u32 = 4000;
pub const KEYSPACE_NOT_FOUND: u32 = 12003;

/// Statement rejected by the parser or the executor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.offset, .message))]
pub struct QueryError {
    pub code: u32,
    pub offset: Option<usize>,
    pub message: String,
}

fn render(offset: &Option<usize>, message: &str) -> String {
    match offset {
        Some(offset) => format!("syntax error at offset {}: {}", offset, message),
        None => message.to_string(),
    }
}

impl QueryError {
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        QueryError {
            code: SYNTAX_ERROR,
            offset: Some(offset),
            message: message.into(),
        }
    }

    pub fn keyspace_not_found(keyspace: &KeyspaceRef) -> Self {
        QueryError {
            code: KEYSPACE_NOT_FOUND,
            offset: None,
            message: format!(
                "Keyspace not found in CB datastore: {} - cause: No bucket named {}",
                keyspace, keyspace.name
            ),
        }
    }

    pub fn no_index(keyspace: &KeyspaceRef) -> Self {
        QueryError {
            code: NO_INDEX,
            offset: None,
            message: format!(
                "No index available on keyspace {} that matches your query. \
                 Use CREATE PRIMARY INDEX ON {} to create a primary index, \
                 or check that your expected index is online.",
                keyspace, keyspace
            ),
        }
    }
}

impl From<QueryError> for ClientError {
    fn from(e: QueryError) -> Self {
        ClientError::Query {
            code: e.code,
            message: e.to_string(),
        }
    }
}

/// Parse and run one statement on `cluster`
pub fn execute(cluster: &MemoryCluster, statement: &str, timeout: Duration) -> ClientResult<QueryResult> {
    let started = Instant::now();
    let parsed = parser::parse(statement)?;
    let rows = exec::execute(cluster, &parsed, timeout)?;
    let metrics = QueryMetrics {
        elapsed: started.elapsed(),
        result_count: rows.len() as u64,
        mutation_count: 0,
    };
    tracing::debug!(
        target: "datastore::memory",
        statement,
        rows = metrics.result_count,
        elapsed_us = metrics.elapsed.as_micros() as u64,
        "Executed query"
    );
    Ok(QueryResult { rows, metrics })
}
