//! Materialized view indexes
//!
//! A [`ViewIndex`] is the sorted output of one map function over a bucket,
//! stamped with the bucket sequence number it was built at. Queries filter
//! by key, optionally reduce, then page.

use super::collation::compare;
use super::mapfn::MapFunction;
use datastore_client::{ClientError, ClientResult, RawViewRow, ViewOptions};
use serde_json::{json, Value};
use std::cmp::Ordering;

/// Built-in reduce functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Count,
    Sum,
    Stats,
}

impl Reducer {
    /// Parse a reduce definition; only the built-ins are supported
    pub fn parse(source: &str) -> ClientResult<Self> {
        match source.trim() {
            "_count" => Ok(Reducer::Count),
            "_sum" => Ok(Reducer::Sum),
            "_stats" => Ok(Reducer::Stats),
            other => Err(ClientError::invalid_argument(format!(
                "unsupported reduce function '{}': only _count, _sum and _stats are available",
                other
            ))),
        }
    }

    fn reduce(&self, values: &[&Value]) -> ClientResult<Value> {
        match self {
            Reducer::Count => Ok(Value::from(values.len())),
            Reducer::Sum => {
                let numbers = numeric(values, "_sum")?;
                Ok(number(numbers.iter().sum()))
            }
            Reducer::Stats => {
                let numbers = numeric(values, "_stats")?;
                let sum: f64 = numbers.iter().sum();
                let min = numbers.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let sumsqr: f64 = numbers.iter().map(|n| n * n).sum();
                Ok(json!({
                    "sum": number(sum),
                    "count": numbers.len(),
                    "min": number(min),
                    "max": number(max),
                    "sumsqr": number(sumsqr),
                }))
            }
        }
    }
}

fn numeric(values: &[&Value], reducer: &str) -> ClientResult<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| ClientError::Internal {
                reason: format!("{} reduce received a non-numeric value: {}", reducer, v),
            })
        })
        .collect()
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// One emitted row
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub key: Value,
    pub id: String,
    pub value: Value,
}

/// Sorted map output of one view
#[derive(Debug, Default)]
pub struct ViewIndex {
    entries: Vec<IndexEntry>,
    built_at: Option<u64>,
}

impl ViewIndex {
    /// An index that has never been built
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the last build, if any
    pub fn built_at(&self) -> Option<u64> {
        self.built_at
    }

    /// Check if the index reflects `seqno`
    pub fn is_current(&self, seqno: u64) -> bool {
        self.built_at == Some(seqno)
    }

    /// Number of emitted rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replace the contents with `map` applied over `docs`
    pub fn rebuild(&mut self, map: &MapFunction, docs: &[(String, Value)], seqno: u64) {
        let mut entries: Vec<IndexEntry> = docs
            .iter()
            .flat_map(|(id, doc)| {
                map.apply(id, doc)
                    .into_iter()
                    .map(move |(key, value)| IndexEntry {
                        key,
                        id: id.clone(),
                        value,
                    })
            })
            .collect();
        entries.sort_by(|a, b| compare(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));
        self.entries = entries;
        self.built_at = Some(seqno);
    }

    /// Run a query against the current contents
    ///
    /// Returns the rows plus the total number of rows in the index.
    pub fn query(
        &self,
        reducer: Option<Reducer>,
        options: &ViewOptions,
    ) -> ClientResult<(Vec<RawViewRow>, u64)> {
        let filter = Filter::from_options(options)?;
        let selected = filter.select(&self.entries);

        let reduce = match (options.reduce, reducer) {
            (Some(true), None) => {
                return Err(ClientError::invalid_argument(
                    "reduce=true is invalid for a view without a reduce function",
                ))
            }
            (Some(false), _) | (None, None) => None,
            (_, Some(reducer)) => Some(reducer),
        };
        if reduce.is_none() && (options.group || options.group_level.is_some()) {
            return Err(ClientError::invalid_argument(
                "group and group_level are only valid for reduced queries",
            ));
        }

        let rows = match reduce {
            None => selected
                .into_iter()
                .map(|entry| RawViewRow {
                    id: Some(entry.id.clone()),
                    key: entry.key.to_string(),
                    value: entry.value.to_string(),
                })
                .collect(),
            Some(reducer) => reduce_rows(reducer, &selected, options)?,
        };

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        let rows = rows.into_iter().skip(skip).take(limit).collect();
        Ok((rows, self.entries.len() as u64))
    }
}

fn group_key(key: &Value, options: &ViewOptions) -> Value {
    match (options.group_level, key) {
        (Some(level), Value::Array(items)) => {
            Value::Array(items.iter().take(level as usize).cloned().collect())
        }
        (Some(_), other) => other.clone(),
        (None, other) if options.group => other.clone(),
        (None, _) => Value::Null,
    }
}

fn reduce_rows(
    reducer: Reducer,
    selected: &[&IndexEntry],
    options: &ViewOptions,
) -> ClientResult<Vec<RawViewRow>> {
    if selected.is_empty() {
        return Ok(Vec::new());
    }
    // Rows arrive in key order (or reverse), so equal group keys are adjacent
    let mut groups: Vec<(Value, Vec<&Value>)> = Vec::new();
    for entry in selected {
        let key = group_key(&entry.key, options);
        match groups.last_mut() {
            Some((last, values)) if compare(last, &key) == Ordering::Equal => {
                values.push(&entry.value)
            }
            _ => groups.push((key, vec![&entry.value])),
        }
    }
    groups
        .into_iter()
        .map(|(key, values)| {
            Ok(RawViewRow {
                id: None,
                key: key.to_string(),
                value: reducer.reduce(&values)?.to_string(),
            })
        })
        .collect()
}

// =============================================================================
// Key filtering
// =============================================================================

enum KeyFilter {
    All,
    Exact(Value),
    Keys(Vec<Value>),
    Range {
        start: Option<Value>,
        end: Option<Value>,
    },
}

fn parse_key(name: &str, raw: &str) -> ClientResult<Value> {
    serde_json::from_str(raw).map_err(|e| {
        ClientError::invalid_argument(format!("{} is not valid JSON ({}): {}", name, e, raw))
    })
}

struct Filter {
    kind: KeyFilter,
    descending: bool,
    inclusive_end: bool,
}

impl Filter {
    fn from_options(options: &ViewOptions) -> ClientResult<Filter> {
        let kind = if let Some(raw) = &options.keys {
            match parse_key("keys", raw)? {
                Value::Array(keys) => KeyFilter::Keys(keys),
                _ => return Err(ClientError::invalid_argument("keys must be a JSON array")),
            }
        } else if let Some(raw) = &options.key {
            KeyFilter::Exact(parse_key("key", raw)?)
        } else if options.startkey.is_some() || options.endkey.is_some() {
            KeyFilter::Range {
                start: options
                    .startkey
                    .as_deref()
                    .map(|raw| parse_key("startkey", raw))
                    .transpose()?,
                end: options
                    .endkey
                    .as_deref()
                    .map(|raw| parse_key("endkey", raw))
                    .transpose()?,
            }
        } else {
            KeyFilter::All
        };
        Ok(Filter {
            kind,
            descending: options.descending,
            inclusive_end: options.inclusive_end.unwrap_or(true),
        })
    }

    fn select<'a>(&self, entries: &'a [IndexEntry]) -> Vec<&'a IndexEntry> {
        let ordered: Vec<&IndexEntry> = if self.descending {
            entries.iter().rev().collect()
        } else {
            entries.iter().collect()
        };

        match &self.kind {
            KeyFilter::All => ordered,
            KeyFilter::Exact(key) => ordered
                .into_iter()
                .filter(|e| compare(&e.key, key) == Ordering::Equal)
                .collect(),
            // Rows come back grouped in the order the keys were given
            KeyFilter::Keys(keys) => keys
                .iter()
                .flat_map(|key| {
                    ordered
                        .iter()
                        .filter(move |e| compare(&e.key, key) == Ordering::Equal)
                        .copied()
                })
                .collect(),
            KeyFilter::Range { start, end } => ordered
                .into_iter()
                .filter(|e| self.after_start(&e.key, start.as_ref()))
                .filter(|e| self.before_end(&e.key, end.as_ref()))
                .collect(),
        }
    }

    /// In iteration direction: descending queries start from the high end
    fn after_start(&self, key: &Value, start: Option<&Value>) -> bool {
        let Some(start) = start else { return true };
        let ord = compare(key, start);
        if self.descending {
            ord != Ordering::Greater
        } else {
            ord != Ordering::Less
        }
    }

    fn before_end(&self, key: &Value, end: Option<&Value>) -> bool {
        let Some(end) = end else { return true };
        let ord = compare(key, end);
        match (self.descending, self.inclusive_end) {
            (false, true) => ord != Ordering::Greater,
            (false, false) => ord == Ordering::Less,
            (true, true) => ord != Ordering::Less,
            (true, false) => ord == Ordering::Greater,
        }
    }
}
