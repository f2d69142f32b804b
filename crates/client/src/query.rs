//! Query-language results

use serde_json::Value;
use std::time::Duration;

/// Execution metrics reported alongside query rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMetrics {
    pub elapsed: Duration,
    pub result_count: u64,
    pub mutation_count: u64,
}

/// Rows plus metrics for one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Value>,
    pub metrics: QueryMetrics,
}

impl QueryResult {
    pub fn into_rows(self) -> Vec<Value> {
        self.rows
    }
}
