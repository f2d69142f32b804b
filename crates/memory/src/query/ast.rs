//! Query statement syntax tree

use serde_json::Value;
use std::fmt;

/// `[namespace:]name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceRef {
    pub namespace: Option<String>,
    pub name: String,
}

impl KeyspaceRef {
    pub fn is_system_indexes(&self) -> bool {
        self.namespace.as_deref() == Some("system") && self.name == "indexes"
    }
}

impl fmt::Display for KeyspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Field path; the first segment may name the keyspace alias
    Path(Vec<String>),
    /// `META([alias]).field...`
    Meta(Vec<String>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    IsNull { expr: Box<Expr>, negated: bool },
    IsMissing { expr: Box<Expr>, negated: bool },
}

impl Expr {
    /// Every field path the expression reads
    pub fn paths(&self) -> Vec<&[String]> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a [String]>) {
        match self {
            Expr::Path(segments) => out.push(segments),
            Expr::Literal(_) | Expr::Meta(_) => {}
            Expr::Array(items) => items.iter().for_each(|e| e.collect_paths(out)),
            Expr::Object(fields) => fields.iter().for_each(|(_, e)| e.collect_paths(out)),
            Expr::Not(inner) => inner.collect_paths(out),
            Expr::And(l, r) | Expr::Or(l, r) | Expr::Compare(_, l, r) => {
                l.collect_paths(out);
                r.collect_paths(out);
            }
            Expr::IsNull { expr, .. } | Expr::IsMissing { expr, .. } => expr.collect_paths(out),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultItem {
    /// `alias.*`
    AllOf(String),
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Star,
    Items(Vec<ResultItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub projection: Projection,
    pub from: KeyspaceRef,
    pub alias: Option<String>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderTerm>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    /// Name rows are bound to: the alias, else the keyspace name
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.from.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateIndex {
        name: String,
        keyspace: KeyspaceRef,
        /// Empty for a primary index
        keys: Vec<Vec<String>>,
        primary: bool,
        with: Option<Value>,
    },
    DropIndex {
        keyspace: KeyspaceRef,
        name: String,
    },
    BuildIndex {
        keyspace: KeyspaceRef,
        names: Vec<String>,
    },
    Select(Select),
}

/// Index key as the catalog renders it: `` `a`.`b` ``
pub fn render_path(path: &[String]) -> String {
    path.iter()
        .map(|segment| format!("`{}`", segment))
        .collect::<Vec<_>>()
        .join(".")
}
