//! Map-function interpreter
//!
//! Views are defined by JavaScript map functions. This module understands the
//! subset that view definitions use in practice:
//!
//! ```text
//! function (doc, meta) {
//!     if (doc.type == "user" && doc.age >= 18) {
//!         emit([doc.last, doc.first], doc.age);
//!     } else emit(meta.id, null);
//! }
//! ```
//!
//! - statements: `emit(key[, value])`, `if (...) ... [else ...]`, blocks
//! - expressions: `doc`/`meta` paths with `.field` and `[index]`, literals,
//!   array and object literals, `== === != !== < <= > >=`, `&& || !`
//! - JavaScript truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""`
//!   are falsy
//!
//! Anything else is rejected when the design document is stored, so a
//! query never meets a function it cannot run.

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use thiserror::Error;

/// Map function that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid map function at offset {offset}: {message}")]
pub struct MapFunctionError {
    pub offset: usize,
    pub message: String,
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Punct(&'static str),
}

const PUNCTUATION: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "(", ")", "{", "}", "[",
    "]", ",", ";", ".", ":",
];

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, MapFunctionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // Line and block comments
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i += 2;
            continue;
        }

        let start = i;
        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push((start, Token::Ident(chars[start..i].iter().collect())));
        } else if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).map_or(false, |d| d.is_ascii_digit())) {
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let number = text.parse::<f64>().map_err(|_| MapFunctionError {
                offset: start,
                message: format!("bad number literal '{}'", text),
            })?;
            tokens.push((start, Token::Num(number)));
        } else if c == '"' || c == '\'' {
            i += 1;
            let mut text = String::new();
            loop {
                match chars.get(i) {
                    None => {
                        return Err(MapFunctionError {
                            offset: start,
                            message: "unterminated string".to_string(),
                        })
                    }
                    Some(&q) if q == c => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = chars.get(i + 1).copied().unwrap_or('\\');
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        });
                        i += 2;
                    }
                    Some(&other) => {
                        text.push(other);
                        i += 1;
                    }
                }
            }
            tokens.push((start, Token::Str(text)));
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let punct = PUNCTUATION
                .iter()
                .find(|p| rest.starts_with(*p))
                .ok_or_else(|| MapFunctionError {
                    offset: start,
                    message: format!("unexpected character '{}'", c),
                })?;
            i += punct.len();
            tokens.push((start, Token::Punct(*punct)));
        }
    }
    Ok(tokens)
}

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Root {
    Doc,
    Meta,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    LooseEq,
    StrictEq,
    LooseNe,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Undefined,
    Literal(Value),
    Path(Root, Vec<Segment>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Emit(Expr, Option<Expr>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Block(Vec<Stmt>),
    Empty,
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    doc_param: String,
    meta_param: Option<String>,
}

impl Parser {
    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, MapFunctionError> {
        Err(MapFunctionError {
            offset: self.offset(),
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn at_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == punct)
    }

    fn at_ident(&self, ident: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(i)) if i == ident)
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), MapFunctionError> {
        if self.at_punct(punct) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(format!("expected '{}'", punct))
        }
    }

    fn expect_ident(&mut self) -> Result<String, MapFunctionError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            _ => {
                self.pos -= 1;
                self.error("expected identifier")
            }
        }
    }

    fn function(&mut self) -> Result<Vec<Stmt>, MapFunctionError> {
        if !self.at_ident("function") {
            return self.error("map must start with 'function'");
        }
        self.pos += 1;
        // Optional function name
        if matches!(self.peek(), Some(Token::Ident(_))) {
            self.pos += 1;
        }
        self.expect_punct("(")?;
        self.doc_param = self.expect_ident()?;
        if self.at_punct(",") {
            self.pos += 1;
            self.meta_param = Some(self.expect_ident()?);
        }
        self.expect_punct(")")?;
        self.expect_punct("{")?;
        let body = self.statements_until_brace()?;
        self.expect_punct("}")?;
        if self.pos < self.tokens.len() {
            return self.error("unexpected input after function body");
        }
        Ok(body)
    }

    fn statements_until_brace(&mut self) -> Result<Vec<Stmt>, MapFunctionError> {
        let mut statements = Vec::new();
        while !self.at_punct("}") {
            if self.peek().is_none() {
                return self.error("unexpected end of input");
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Stmt, MapFunctionError> {
        if self.at_punct(";") {
            self.pos += 1;
            return Ok(Stmt::Empty);
        }
        if self.at_punct("{") {
            self.pos += 1;
            let body = self.statements_until_brace()?;
            self.expect_punct("}")?;
            return Ok(Stmt::Block(body));
        }
        if self.at_ident("if") {
            self.pos += 1;
            self.expect_punct("(")?;
            let condition = self.expression()?;
            self.expect_punct(")")?;
            let then = self.statement()?;
            let otherwise = if self.at_ident("else") {
                self.pos += 1;
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If(condition, Box::new(then), otherwise));
        }
        if self.at_ident("emit") {
            self.pos += 1;
            self.expect_punct("(")?;
            let key = self.expression()?;
            let value = if self.at_punct(",") {
                self.pos += 1;
                Some(self.expression()?)
            } else {
                None
            };
            self.expect_punct(")")?;
            if self.at_punct(";") {
                self.pos += 1;
            }
            return Ok(Stmt::Emit(key, value));
        }
        self.error("expected emit, if or a block")
    }

    fn expression(&mut self) -> Result<Expr, MapFunctionError> {
        self.binary_level(0)
    }

    fn binary_level(&mut self, level: usize) -> Result<Expr, MapFunctionError> {
        const LEVELS: &[&[(&str, BinaryOp)]] = &[
            &[("||", BinaryOp::Or)],
            &[("&&", BinaryOp::And)],
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::LooseEq),
                ("!=", BinaryOp::LooseNe),
            ],
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
        ];
        if level == LEVELS.len() {
            return self.unary();
        }
        let mut left = self.binary_level(level + 1)?;
        loop {
            let op = LEVELS[level]
                .iter()
                .find(|(punct, _)| self.at_punct(punct))
                .map(|(_, op)| *op);
            match op {
                Some(op) => {
                    self.pos += 1;
                    let right = self.binary_level(level + 1)?;
                    left = Expr::Binary(op, Box::new(left), Box::new(right));
                }
                None => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, MapFunctionError> {
        if self.at_punct("!") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, MapFunctionError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Literal(number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Punct("(")) => {
                let inner = self.expression()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Some(Token::Punct("[")) => {
                let mut items = Vec::new();
                while !self.at_punct("]") {
                    items.push(self.expression()?);
                    if !self.at_punct("]") {
                        self.expect_punct(",")?;
                    }
                }
                self.pos += 1;
                Ok(Expr::Array(items))
            }
            Some(Token::Punct("{")) => {
                let mut fields = Vec::new();
                while !self.at_punct("}") {
                    let name = match self.next() {
                        Some(Token::Str(s)) | Some(Token::Ident(s)) => s,
                        _ => {
                            self.pos -= 1;
                            return self.error("expected object key");
                        }
                    };
                    self.expect_punct(":")?;
                    fields.push((name, self.expression()?));
                    if !self.at_punct("}") {
                        self.expect_punct(",")?;
                    }
                }
                self.pos += 1;
                Ok(Expr::Object(fields))
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "undefined" => Ok(Expr::Undefined),
                _ if name == self.doc_param => self.path(Root::Doc),
                _ if self.meta_param.as_deref() == Some(name.as_str()) => self.path(Root::Meta),
                _ => {
                    self.pos -= 1;
                    self.error(format!("unknown identifier '{}'", name))
                }
            },
            Some(_) => {
                self.pos -= 1;
                self.error("expected expression")
            }
            None => self.error("unexpected end of input"),
        }
    }

    fn path(&mut self, root: Root) -> Result<Expr, MapFunctionError> {
        let mut segments = Vec::new();
        loop {
            if self.at_punct(".") {
                self.pos += 1;
                segments.push(Segment::Field(self.expect_ident()?));
            } else if self.at_punct("[") {
                self.pos += 1;
                match self.next() {
                    Some(Token::Str(s)) => segments.push(Segment::Field(s)),
                    Some(Token::Num(n)) if n >= 0.0 && n.fract() == 0.0 => {
                        segments.push(Segment::Index(n as usize))
                    }
                    _ => {
                        self.pos -= 1;
                        return self.error("expected string or index in brackets");
                    }
                }
                self.expect_punct("]")?;
            } else {
                return Ok(Expr::Path(root, segments));
            }
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn truthy(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn strict_equal(a: &Option<Value>, b: &Option<Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.as_f64() == y.as_f64(),
        // Arrays and objects are compared by identity in JavaScript; two
        // distinct literals are never equal
        (Some(Value::Array(_)), _) | (Some(Value::Object(_)), _) => false,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn loose_equal(a: &Option<Value>, b: &Option<Value>) -> bool {
    match (a, b) {
        (None, None) | (None, Some(Value::Null)) | (Some(Value::Null), None) => true,
        _ => strict_equal(a, b),
    }
}

fn relational(a: &Option<Value>, b: &Option<Value>) -> Option<Ordering> {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Some(Value::String(x)), Some(Value::String(y))) => Some(x.cmp(y)),
        _ => None,
    }
}

struct Scope<'a> {
    doc: &'a Value,
    meta: &'a Value,
}

fn lookup(root: &Value, segments: &[Segment]) -> Option<Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Field(name), Value::Object(map)) => map.get(name)?,
            (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
            (Segment::Field(name), Value::Array(items)) if name == "length" => {
                return Some(Value::from(items.len()))
            }
            (Segment::Field(name), Value::String(s)) if name == "length" => {
                return Some(Value::from(s.chars().count()))
            }
            _ => return None,
        };
    }
    Some(current.clone())
}

fn eval(expr: &Expr, scope: &Scope<'_>) -> Option<Value> {
    match expr {
        Expr::Undefined => None,
        Expr::Literal(v) => Some(v.clone()),
        Expr::Path(Root::Doc, segments) => lookup(scope.doc, segments),
        Expr::Path(Root::Meta, segments) => lookup(scope.meta, segments),
        // Undefined array elements serialize as null
        Expr::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| eval(item, scope).unwrap_or(Value::Null))
                .collect(),
        )),
        // Undefined object members are dropped
        Expr::Object(fields) => {
            let mut map = Map::new();
            for (name, field) in fields {
                if let Some(value) = eval(field, scope) {
                    map.insert(name.clone(), value);
                }
            }
            Some(Value::Object(map))
        }
        Expr::Not(inner) => Some(Value::Bool(!truthy(&eval(inner, scope)))),
        Expr::Binary(BinaryOp::And, l, r) => {
            let left = eval(l, scope);
            if truthy(&left) {
                eval(r, scope)
            } else {
                left
            }
        }
        Expr::Binary(BinaryOp::Or, l, r) => {
            let left = eval(l, scope);
            if truthy(&left) {
                left
            } else {
                eval(r, scope)
            }
        }
        Expr::Binary(op, l, r) => {
            let left = eval(l, scope);
            let right = eval(r, scope);
            let result = match op {
                BinaryOp::LooseEq => loose_equal(&left, &right),
                BinaryOp::StrictEq => strict_equal(&left, &right),
                BinaryOp::LooseNe => !loose_equal(&left, &right),
                BinaryOp::StrictNe => !strict_equal(&left, &right),
                BinaryOp::Lt => relational(&left, &right) == Some(Ordering::Less),
                BinaryOp::Le => matches!(
                    relational(&left, &right),
                    Some(Ordering::Less) | Some(Ordering::Equal)
                ),
                BinaryOp::Gt => relational(&left, &right) == Some(Ordering::Greater),
                BinaryOp::Ge => matches!(
                    relational(&left, &right),
                    Some(Ordering::Greater) | Some(Ordering::Equal)
                ),
                BinaryOp::And | BinaryOp::Or => false,
            };
            Some(Value::Bool(result))
        }
    }
}

fn run(stmt: &Stmt, scope: &Scope<'_>, out: &mut Vec<(Value, Value)>) {
    match stmt {
        Stmt::Emit(key, value) => {
            let key = eval(key, scope).unwrap_or(Value::Null);
            let value = value
                .as_ref()
                .and_then(|v| eval(v, scope))
                .unwrap_or(Value::Null);
            out.push((key, value));
        }
        Stmt::If(condition, then, otherwise) => {
            if truthy(&eval(condition, scope)) {
                run(then, scope, out);
            } else if let Some(otherwise) = otherwise {
                run(otherwise, scope, out);
            }
        }
        Stmt::Block(body) => body.iter().for_each(|s| run(s, scope, out)),
        Stmt::Empty => {}
    }
}

// =============================================================================
// MapFunction
// =============================================================================

/// A compiled map function
#[derive(Debug, Clone, PartialEq)]
pub struct MapFunction {
    body: Vec<Stmt>,
}

impl MapFunction {
    /// Parse map-function source
    pub fn parse(source: &str) -> Result<Self, MapFunctionError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
            doc_param: String::new(),
            meta_param: None,
        };
        let body = parser.function()?;
        Ok(MapFunction { body })
    }

    /// Run against one document, returning every emitted `(key, value)`
    pub fn apply(&self, id: &str, doc: &Value) -> Vec<(Value, Value)> {
        let meta = serde_json::json!({ "id": id, "type": "json" });
        let scope = Scope { doc, meta: &meta };
        let mut out = Vec::new();
        for stmt in &self.body {
            run(stmt, &scope, &mut out);
        }
        out
    }
}
