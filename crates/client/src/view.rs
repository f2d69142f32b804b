//! View query options and raw results
//!
//! Key arguments (`key`, `keys`, `startkey`, `endkey`) are raw JSON text, as
//! they appear on the view REST interface. Result rows are likewise raw JSON
//! text; decoding is the caller's business.

/// Index freshness requested by a view query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanConsistency {
    /// Read the index as it is
    NotBounded,
    /// Update the index, then read
    RequestPlus,
    /// Read the index as it is, then update it
    #[default]
    UpdateAfter,
}

/// Namespace a design document is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DesignDocumentNamespace {
    #[default]
    Production,
    Development,
}

impl DesignDocumentNamespace {
    /// Name as stored, with the `dev_` prefix for development documents
    pub fn prefixed(&self, name: &str) -> String {
        match self {
            DesignDocumentNamespace::Production => name.to_string(),
            DesignDocumentNamespace::Development => {
                if name.starts_with("dev_") {
                    name.to_string()
                } else {
                    format!("dev_{}", name)
                }
            }
        }
    }
}

/// View query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub scan_consistency: ScanConsistency,
    pub namespace: DesignDocumentNamespace,
    /// Exact key, raw JSON
    pub key: Option<String>,
    /// Set of exact keys, raw JSON array
    pub keys: Option<String>,
    /// Range start, raw JSON
    pub startkey: Option<String>,
    /// Range end, raw JSON
    pub endkey: Option<String>,
    /// Whether `endkey` itself is included (default true)
    pub inclusive_end: Option<bool>,
    pub descending: bool,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    /// Apply the view's reduce function (default true when one exists)
    pub reduce: Option<bool>,
    /// Group reduced rows by full key
    pub group: bool,
    /// Group reduced rows by the first N elements of array keys
    pub group_level: Option<u32>,
}

/// One row as returned over the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawViewRow {
    pub id: Option<String>,
    /// Emitted key, raw JSON
    pub key: String,
    /// Emitted value, raw JSON
    pub value: String,
}

/// View query result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewResult {
    pub rows: Vec<RawViewRow>,
    /// Rows in the index before key filtering and paging
    pub total_rows: u64,
}
