//! Statement execution against a cluster

use super::ast::{CompareOp, Expr, KeyspaceRef, Projection, ResultItem, Select, Statement};
use super::catalog::IndexDefinition;
use super::QueryError;
use crate::bucket::Bucket;
use crate::cluster::MemoryCluster;
use crate::view::collation::{compare, compare_optional};
use datastore_client::{ClientError, ClientResult};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Run a parsed statement; DDL statements return no rows
pub fn execute(
    cluster: &MemoryCluster,
    statement: &Statement,
    timeout: Duration,
) -> ClientResult<Vec<Value>> {
    match statement {
        Statement::CreateIndex {
            name,
            keyspace,
            keys,
            primary,
            with,
        } => {
            let bucket = resolve_bucket(cluster, keyspace)?;
            let deferred = with
                .as_ref()
                .and_then(|w| w.get("defer_build"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let definition = IndexDefinition::new(name.clone(), keys.clone(), *primary, deferred);
            lock_timeout(bucket.indexes().try_write_for(timeout), "create index")?
                .create(definition)?;
            debug!(target: "datastore::memory", bucket = %bucket.name(), index = %name, deferred, "Created index");
            Ok(Vec::new())
        }
        Statement::DropIndex { keyspace, name } => {
            let bucket = resolve_bucket(cluster, keyspace)?;
            lock_timeout(bucket.indexes().try_write_for(timeout), "drop index")?
                .drop_index(name)?;
            debug!(target: "datastore::memory", bucket = %bucket.name(), index = %name, "Dropped index");
            Ok(Vec::new())
        }
        Statement::BuildIndex { keyspace, names } => {
            let bucket = resolve_bucket(cluster, keyspace)?;
            lock_timeout(bucket.indexes().try_write_for(timeout), "build index")?
                .build(names)?;
            Ok(Vec::new())
        }
        Statement::Select(select) if select.from.is_system_indexes() => {
            select_indexes(cluster, select, timeout)
        }
        Statement::Select(select) => {
            let bucket = resolve_bucket(cluster, &select.from)?;
            select_documents(&bucket, select, timeout)
        }
    }
}

fn lock_timeout<T>(guard: Option<T>, operation: &str) -> ClientResult<T> {
    guard.ok_or_else(|| ClientError::Timeout {
        operation: operation.to_string(),
    })
}

fn resolve_bucket(cluster: &MemoryCluster, keyspace: &KeyspaceRef) -> ClientResult<Arc<Bucket>> {
    let namespace_ok = matches!(keyspace.namespace.as_deref(), None | Some("default"));
    namespace_ok
        .then(|| cluster.bucket(&keyspace.name))
        .flatten()
        .ok_or_else(|| QueryError::keyspace_not_found(keyspace).into())
}

// =============================================================================
// SELECT
// =============================================================================

struct Row {
    id: String,
    doc: Value,
}

fn select_indexes(
    cluster: &MemoryCluster,
    select: &Select,
    timeout: Duration,
) -> ClientResult<Vec<Value>> {
    let mut rows = Vec::new();
    for bucket in cluster.buckets() {
        let catalog = lock_timeout(bucket.indexes().try_read_for(timeout), "list indexes")?;
        rows.extend(catalog.iter().map(|ix| Row {
            id: ix.id.to_string(),
            doc: ix.to_row(bucket.name()),
        }));
    }
    Ok(run_select(select, rows))
}

fn select_documents(bucket: &Bucket, select: &Select, timeout: Duration) -> ClientResult<Vec<Value>> {
    let binding = select.binding();
    let referenced: Vec<Vec<String>> = select
        .filter
        .iter()
        .flat_map(|f| f.paths())
        .map(|path| strip_binding(path, binding).to_vec())
        .collect();

    let usable = lock_timeout(bucket.indexes().try_read_for(timeout), "select")?
        .can_serve(&referenced);
    if !usable {
        return Err(QueryError::no_index(&select.from).into());
    }

    let rows = bucket
        .store()
        .scan()
        .into_iter()
        .map(|(id, doc)| Row { id, doc })
        .collect();
    Ok(run_select(select, rows))
}

fn run_select(select: &Select, rows: Vec<Row>) -> Vec<Value> {
    let binding = select.binding();
    let mut rows: Vec<Row> = match &select.filter {
        Some(filter) => rows
            .into_iter()
            .filter(|row| truthy(&eval(filter, row, binding)))
            .collect(),
        None => rows,
    };

    if !select.order_by.is_empty() {
        let mut keyed: Vec<(Vec<Option<Value>>, Row)> = rows
            .into_iter()
            .map(|row| {
                let keys = select
                    .order_by
                    .iter()
                    .map(|term| eval(&term.expr, &row, binding))
                    .collect();
                (keys, row)
            })
            .collect();
        keyed.sort_by(|(a, _), (b, _)| {
            for (term, (left, right)) in select.order_by.iter().zip(a.iter().zip(b.iter())) {
                let ord = compare_optional(left.as_ref(), right.as_ref());
                let ord = if term.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        rows = keyed.into_iter().map(|(_, row)| row).collect();
    }

    let offset = select.offset.unwrap_or(0) as usize;
    let limit = select.limit.map_or(usize::MAX, |l| l as usize);
    rows.into_iter()
        .skip(offset)
        .take(limit)
        .map(|row| project(&select.projection, &row, binding))
        .collect()
}

fn project(projection: &Projection, row: &Row, binding: &str) -> Value {
    match projection {
        Projection::Star => json!({ binding: row.doc }),
        Projection::Items(items) => {
            let mut out = Map::new();
            for (position, item) in items.iter().enumerate() {
                match item {
                    ResultItem::AllOf(alias) if alias == binding => {
                        if let Value::Object(fields) = &row.doc {
                            out.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                        }
                    }
                    ResultItem::AllOf(_) => {}
                    ResultItem::Expr { expr, alias } => {
                        if let Some(value) = eval(expr, row, binding) {
                            let name = alias
                                .clone()
                                .unwrap_or_else(|| implicit_name(expr, position));
                            out.insert(name, value);
                        }
                    }
                }
            }
            Value::Object(out)
        }
    }
}

fn implicit_name(expr: &Expr, position: usize) -> String {
    match expr {
        Expr::Path(segments) | Expr::Meta(segments) if !segments.is_empty() => {
            segments[segments.len() - 1].clone()
        }
        _ => format!("${}", position + 1),
    }
}

// =============================================================================
// Expressions
// =============================================================================

fn strip_binding<'a>(path: &'a [String], binding: &str) -> &'a [String] {
    if path.len() > 1 && path[0] == binding {
        &path[1..]
    } else {
        path
    }
}

fn lookup(root: &Value, segments: &[String]) -> Option<Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

/// `None` is MISSING
fn eval(expr: &Expr, row: &Row, binding: &str) -> Option<Value> {
    match expr {
        Expr::Literal(value) => Some(value.clone()),
        Expr::Path(segments) if segments.len() == 1 && segments[0] == binding => {
            Some(row.doc.clone())
        }
        Expr::Path(segments) => lookup(&row.doc, strip_binding(segments, binding)),
        Expr::Meta(fields) => lookup(&json!({ "id": row.id, "type": "json" }), fields),
        Expr::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| eval(item, row, binding).unwrap_or(Value::Null))
                .collect(),
        )),
        Expr::Object(fields) => {
            let mut map = Map::new();
            for (name, field) in fields {
                if let Some(value) = eval(field, row, binding) {
                    map.insert(name.clone(), value);
                }
            }
            Some(Value::Object(map))
        }
        Expr::Not(inner) => match eval(inner, row, binding) {
            None => None,
            Some(Value::Null) => Some(Value::Null),
            value => Some(Value::Bool(!truthy(&value))),
        },
        Expr::And(l, r) => Some(Value::Bool(
            truthy(&eval(l, row, binding)) && truthy(&eval(r, row, binding)),
        )),
        Expr::Or(l, r) => Some(Value::Bool(
            truthy(&eval(l, row, binding)) || truthy(&eval(r, row, binding)),
        )),
        Expr::Compare(op, l, r) => {
            let left = eval(l, row, binding)?;
            let right = eval(r, row, binding)?;
            if left.is_null() || right.is_null() {
                return Some(Value::Null);
            }
            let ord = compare(&left, &right);
            let result = match op {
                CompareOp::Eq => ord == Ordering::Equal,
                CompareOp::Ne => ord != Ordering::Equal,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
            };
            Some(Value::Bool(result))
        }
        Expr::IsNull { expr, negated } => {
            let value = eval(expr, row, binding);
            let is_null = matches!(value, Some(Value::Null));
            let result = if *negated {
                value.is_some() && !is_null
            } else {
                is_null
            };
            Some(Value::Bool(result))
        }
        Expr::IsMissing { expr, negated } => {
            let missing = eval(expr, row, binding).is_none();
            Some(Value::Bool(missing != *negated))
        }
    }
}

/// MISSING, NULL, false, 0, and empty strings, arrays and objects are false
fn truthy(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Bool(true)) => true,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}
