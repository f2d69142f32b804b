//! Query facade
//!
//! Secondary-index management and ad hoc statements. Index operations are
//! issued as query statements against the bound bucket:
//!
//! | Facade | Statement |
//! |--------|-----------|
//! | `n1ql_index_list()` | `SELECT idx.* FROM system:indexes AS idx WHERE keyspace_id = "<bucket>"` |
//! | `n1ql_index_create(name, fields, opts)` | ``CREATE INDEX `name` ON `bucket`(`f`, ...) WITH {"defer_build": ..}`` |
//! | `n1ql_index_drop(name)` | ``DROP INDEX `bucket`.`name` `` |
//! | `n1ql_index_build(names)` | ``BUILD INDEX ON `bucket`(`name`, ...)`` |

use datastore_client::ClientError;
use datastore_core::{Error, IndexDescriptor, Result, Value};
use tracing::debug;

use super::convert::map_error;
use super::impl_::Datastore;
use super::types::IndexCreateOptions;

/// Query facade - indexes and statements on the bound bucket
pub trait QueryFacade {
    /// Indexes on the bound bucket, primary first then by name
    fn n1ql_index_list(&self) -> Result<Vec<IndexDescriptor>>;

    /// Create a secondary index over `fields`
    ///
    /// Dotted fields index nested paths. `AlreadyExists` unless
    /// `options.ignore_if_exists`.
    fn n1ql_index_create(
        &self,
        name: &str,
        fields: &[&str],
        options: &IndexCreateOptions,
    ) -> Result<()>;

    /// Drop an index; dropping a missing index is a no-op
    fn n1ql_index_drop(&self, name: &str) -> Result<()>;

    /// Build indexes created with `defer_build`
    fn n1ql_index_build(&self, names: &[&str]) -> Result<()>;

    /// Run a statement and return its rows
    fn n1ql_query(&self, statement: &str) -> Result<Vec<Value>>;
}

impl QueryFacade for Datastore {
    fn n1ql_index_list(&self) -> Result<Vec<IndexDescriptor>> {
        let _guard = self.span().enter();
        let statement = format!(
            "SELECT idx.* FROM system:indexes AS idx WHERE keyspace_id = {} \
             ORDER BY is_primary DESC, name ASC",
            quote_string(self.bucket_name())
        );
        let rows = self.run(&statement, "n1ql_index_list", self.bucket_name())?;
        rows.iter()
            .map(|row| {
                IndexDescriptor::from_row(row).map_err(|e| {
                    Error::unexpected("n1ql_index_list", self.bucket_name(), e.to_string())
                })
            })
            .collect()
    }

    fn n1ql_index_create(
        &self,
        name: &str,
        fields: &[&str],
        options: &IndexCreateOptions,
    ) -> Result<()> {
        let _guard = self.span().enter();
        validate_identifier("index name", name)?;
        if fields.is_empty() {
            return Err(Error::invalid_argument(format!(
                "index {} needs at least one field",
                name
            )));
        }
        let keys = fields
            .iter()
            .map(|field| render_field(field))
            .collect::<Result<Vec<_>>>()?;

        let statement = format!(
            "CREATE INDEX {} ON {}({}) WITH {{\"defer_build\": {}}}",
            escape(name),
            escape(self.bucket_name()),
            keys.join(", "),
            options.defer_build
        );
        match self.run(&statement, "n1ql_index_create", name) {
            Ok(_) => {
                debug!(target: "datastore::facade", index = %name, "Created index");
                Ok(())
            }
            Err(Error::AlreadyExists { .. }) if options.ignore_if_exists => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn n1ql_index_drop(&self, name: &str) -> Result<()> {
        let _guard = self.span().enter();
        validate_identifier("index name", name)?;
        let statement = format!("DROP INDEX {}.{}", escape(self.bucket_name()), escape(name));
        match self.client().query(&statement) {
            Ok(_) => Ok(()),
            Err(ClientError::IndexNotFound { .. }) => Ok(()),
            Err(e) => Err(map_error(e, "n1ql_index_drop", name)),
        }
    }

    fn n1ql_index_build(&self, names: &[&str]) -> Result<()> {
        let _guard = self.span().enter();
        if names.is_empty() {
            return Ok(());
        }
        for name in names {
            validate_identifier("index name", name)?;
        }
        let statement = format!(
            "BUILD INDEX ON {}({})",
            escape(self.bucket_name()),
            names.iter().map(|n| escape(n)).collect::<Vec<_>>().join(", ")
        );
        self.run(&statement, "n1ql_index_build", &names.join(","))
            .map(|_| ())
    }

    fn n1ql_query(&self, statement: &str) -> Result<Vec<Value>> {
        let _guard = self.span().enter();
        self.run(statement, "n1ql_query", "")
    }
}

impl Datastore {
    fn run(&self, statement: &str, operation: &'static str, key: &str) -> Result<Vec<Value>> {
        self.client()
            .query(statement)
            .map(|result| result.into_rows())
            .map_err(|e| map_error(e, operation, key))
    }
}

fn validate_identifier(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument(format!("{} must not be empty", what)));
    }
    if name.contains('`') {
        return Err(Error::invalid_argument(format!(
            "{} must not contain backticks: {}",
            what, name
        )));
    }
    Ok(())
}

fn escape(identifier: &str) -> String {
    format!("`{}`", identifier)
}

/// `a.b` -> `` `a`.`b` ``
fn render_field(field: &str) -> Result<String> {
    let segments: Vec<&str> = field.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::invalid_argument(format!("malformed index field: {}", field)));
    }
    for segment in &segments {
        validate_identifier("index field", segment)?;
    }
    Ok(segments.iter().map(|s| escape(s)).collect::<Vec<_>>().join("."))
}

fn quote_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
