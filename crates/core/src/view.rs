//! View and design-document types
//!
//! A design document is a named bundle of view definitions. Views are
//! precomputed map(/reduce) indexes maintained by the store; the facade only
//! publishes definitions and reads rows back.
//!
//! Design documents are replaced wholesale: there is no partial update.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Rows
// =============================================================================

/// One row of a view query result
///
/// `key` and `value` are whatever the map function emitted, already decoded.
/// `id` is the id of the document that produced the row (absent for reduced
/// rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    /// Source document id
    pub id: Option<String>,
    /// Emitted key
    pub key: Value,
    /// Emitted value
    pub value: Value,
}

// =============================================================================
// Design documents
// =============================================================================

/// A single view: a map function and an optional reduce function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    /// Map function source
    pub map: String,
    /// Reduce function source (built-ins like `_count` included)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

impl ViewDefinition {
    /// View with only a map function
    pub fn map(source: impl Into<String>) -> Self {
        ViewDefinition {
            map: source.into(),
            reduce: None,
        }
    }

    /// Attach a reduce function
    pub fn with_reduce(mut self, source: impl Into<String>) -> Self {
        self.reduce = Some(source.into());
        self
    }
}

/// A named collection of view definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Design document name, without namespace prefix
    pub name: String,
    /// Views keyed by view name
    #[serde(default)]
    pub views: BTreeMap<String, ViewDefinition>,
}

impl DesignDocument {
    /// Empty design document
    pub fn new(name: impl Into<String>) -> Self {
        DesignDocument {
            name: name.into(),
            views: BTreeMap::new(),
        }
    }

    /// Add (or replace) a view
    pub fn with_view(mut self, name: impl Into<String>, view: ViewDefinition) -> Self {
        self.views.insert(name.into(), view);
        self
    }

    /// Build from the JSON body shape `{"views": {"v": {"map": "...", "reduce": "..."}}}`
    ///
    /// Unknown top-level keys are ignored, matching what stores accept.
    pub fn from_json(name: impl Into<String>, body: &Value) -> Result<Self> {
        let name = name.into();
        let views = match body.get("views") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(views) => BTreeMap::<String, ViewDefinition>::deserialize(views).map_err(|e| {
                Error::invalid_argument(format!("design document '{}': {}", name, e))
            })?,
        };
        Ok(DesignDocument { name, views })
    }

    /// The JSON body shape, without the name
    pub fn to_json(&self) -> Value {
        let views: serde_json::Map<String, Value> = self
            .views
            .iter()
            .map(|(name, view)| {
                let mut body = serde_json::Map::new();
                body.insert("map".to_string(), Value::String(view.map.clone()));
                if let Some(reduce) = &view.reduce {
                    body.insert("reduce".to_string(), Value::String(reduce.clone()));
                }
                (name.clone(), Value::Object(body))
            })
            .collect();
        serde_json::json!({ "views": views })
    }
}

/// Which namespace a design document lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignNamespace {
    /// Published views, served to queries
    #[default]
    Production,
    /// Development views, stored under a `dev_` prefix
    Development,
}

impl DesignNamespace {
    /// Namespace selected by a `use_devmode` flag
    pub fn from_devmode(use_devmode: bool) -> Self {
        if use_devmode {
            DesignNamespace::Development
        } else {
            DesignNamespace::Production
        }
    }
}

// =============================================================================
// Staleness
// =============================================================================

/// How fresh a view read must be
///
/// The accepted spellings are the classic view-engine ones: `false`, `ok`,
/// `update_after`. Anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stale {
    /// `stale=false`: bring the index up to date before reading
    False,
    /// `stale=ok`: read whatever the index holds now
    Ok,
    /// `stale=update_after`: read now, refresh the index afterwards
    #[default]
    UpdateAfter,
}

impl Stale {
    /// Wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Stale::False => "false",
            Stale::Ok => "ok",
            Stale::UpdateAfter => "update_after",
        }
    }

    /// Parse a JSON option value (`false`, `"false"`, `"ok"`, `"update_after"`)
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(false) => Ok(Stale::False),
            Value::String(s) => s.parse(),
            other => Err(Error::invalid_argument(format!(
                "stale must be false, \"ok\" or \"update_after\", got {}",
                other
            ))),
        }
    }
}

impl FromStr for Stale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "false" => Ok(Stale::False),
            "ok" => Ok(Stale::Ok),
            "update_after" => Ok(Stale::UpdateAfter),
            other => Err(Error::invalid_argument(format!(
                "stale must be \"false\", \"ok\" or \"update_after\", got \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for Stale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
