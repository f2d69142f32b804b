//! Recursive-descent parser for query statements

use super::ast::{CompareOp, Expr, KeyspaceRef, OrderTerm, Projection, ResultItem, Select, Statement};
use super::lexer::{tokenize, Spanned, Token};
use super::QueryError;
use serde_json::{Map, Value};

const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AS", "ORDER", "BY", "ASC", "DESC", "LIMIT", "OFFSET", "CREATE",
    "DROP", "BUILD", "PRIMARY", "INDEX", "ON", "WITH", "USING", "AND", "OR", "NOT", "IS", "NULL",
    "MISSING", "VALUED", "TRUE", "FALSE", "META",
];

/// Parse one statement
pub fn parse(statement: &str) -> Result<Statement, QueryError> {
    let tokens = tokenize(statement)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: statement.len(),
    };
    let parsed = parser.statement()?;
    if parser.at_symbol(";") {
        parser.pos += 1;
    }
    if parser.pos < parser.tokens.len() {
        return parser.error("unexpected input after statement");
    }
    Ok(parsed)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, QueryError> {
        Err(QueryError::syntax(self.offset(), message))
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(_, t)| t)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), QueryError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            self.error(format!("expected {}", keyword))
        }
    }

    fn at_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol)
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), QueryError> {
        if self.at_symbol(symbol) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(format!("expected '{}'", symbol))
        }
    }

    /// Identifier that is not a reserved word, or any escaped identifier
    fn at_name(&self) -> bool {
        match self.peek() {
            Some(Token::Escaped(_)) => true,
            Some(Token::Ident(word)) => !is_reserved(word),
            _ => false,
        }
    }

    fn name(&mut self) -> Result<String, QueryError> {
        match self.peek().cloned() {
            Some(Token::Escaped(name)) => {
                self.pos += 1;
                Ok(name)
            }
            Some(Token::Ident(name)) if !is_reserved(&name) => {
                self.pos += 1;
                Ok(name)
            }
            _ => self.error("expected identifier"),
        }
    }

    fn number(&mut self) -> Result<u64, QueryError> {
        match self.peek() {
            Some(Token::Num(n)) if *n >= 0.0 && n.fract() == 0.0 => {
                let n = *n as u64;
                self.pos += 1;
                Ok(n)
            }
            _ => self.error("expected non-negative integer"),
        }
    }

    fn keyspace(&mut self) -> Result<KeyspaceRef, QueryError> {
        let first = self.name()?;
        if self.at_symbol(":") {
            self.pos += 1;
            let name = self.name()?;
            return Ok(KeyspaceRef {
                namespace: Some(first),
                name,
            });
        }
        Ok(KeyspaceRef {
            namespace: None,
            name: first,
        })
    }

    fn skip_using(&mut self) -> Result<(), QueryError> {
        if self.eat_keyword("USING") {
            if self.eat_keyword("GSI") || self.eat_keyword("VIEW") {
                return Ok(());
            }
            return self.error("expected GSI or VIEW after USING");
        }
        Ok(())
    }

    // ========== Statements ==========

    fn statement(&mut self) -> Result<Statement, QueryError> {
        if self.eat_keyword("SELECT") {
            return self.select().map(Statement::Select);
        }
        if self.eat_keyword("CREATE") {
            return self.create_index();
        }
        if self.eat_keyword("DROP") {
            return self.drop_index();
        }
        if self.eat_keyword("BUILD") {
            return self.build_index();
        }
        self.error("expected SELECT, CREATE, DROP or BUILD")
    }

    fn create_index(&mut self) -> Result<Statement, QueryError> {
        let primary = self.eat_keyword("PRIMARY");
        self.expect_keyword("INDEX")?;

        let name = if primary {
            if self.at_keyword("ON") {
                "#primary".to_string()
            } else {
                self.name()?
            }
        } else {
            self.name()?
        };
        self.expect_keyword("ON")?;
        let keyspace = self.keyspace()?;

        let mut keys = Vec::new();
        if !primary {
            self.expect_symbol("(")?;
            loop {
                keys.push(self.path_segments()?);
                if self.at_symbol(",") {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            self.expect_symbol(")")?;
        }

        self.skip_using()?;
        let with = if self.eat_keyword("WITH") {
            match self.primary()? {
                Expr::Literal(value @ Value::Object(_)) => Some(value),
                Expr::Object(fields) => Some(constant_object(fields).ok_or_else(|| {
                    QueryError::syntax(self.offset(), "WITH options must be constants")
                })?),
                _ => return self.error("WITH expects an object"),
            }
        } else {
            None
        };

        Ok(Statement::CreateIndex {
            name,
            keyspace,
            keys,
            primary,
            with,
        })
    }

    fn drop_index(&mut self) -> Result<Statement, QueryError> {
        if self.eat_keyword("PRIMARY") {
            self.expect_keyword("INDEX")?;
            let name = if self.at_keyword("ON") {
                "#primary".to_string()
            } else {
                self.name()?
            };
            self.expect_keyword("ON")?;
            let keyspace = self.keyspace()?;
            self.skip_using()?;
            return Ok(Statement::DropIndex { keyspace, name });
        }

        self.expect_keyword("INDEX")?;
        let first = self.keyspace()?;
        let statement = if self.at_symbol(".") {
            self.pos += 1;
            let name = self.name()?;
            Statement::DropIndex {
                keyspace: first,
                name,
            }
        } else if first.namespace.is_none() && self.eat_keyword("ON") {
            let keyspace = self.keyspace()?;
            Statement::DropIndex {
                keyspace,
                name: first.name,
            }
        } else {
            return self.error("expected keyspace.index or index ON keyspace");
        };
        self.skip_using()?;
        Ok(statement)
    }

    fn build_index(&mut self) -> Result<Statement, QueryError> {
        self.expect_keyword("INDEX")?;
        self.expect_keyword("ON")?;
        let keyspace = self.keyspace()?;
        self.expect_symbol("(")?;
        let mut names = vec![self.name()?];
        while self.at_symbol(",") {
            self.pos += 1;
            names.push(self.name()?);
        }
        self.expect_symbol(")")?;
        self.skip_using()?;
        Ok(Statement::BuildIndex { keyspace, names })
    }

    fn select(&mut self) -> Result<Select, QueryError> {
        let projection = self.projection()?;
        self.expect_keyword("FROM")?;
        let from = self.keyspace()?;
        let alias = if self.eat_keyword("AS") || self.at_name() {
            Some(self.name()?)
        } else {
            None
        };

        let filter = if self.eat_keyword("WHERE") {
            Some(self.expression()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let expr = self.expression()?;
                let descending = if self.eat_keyword("DESC") {
                    true
                } else {
                    self.eat_keyword("ASC");
                    false
                };
                order_by.push(OrderTerm { expr, descending });
                if self.at_symbol(",") {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }

        let mut limit = None;
        let mut offset = None;
        loop {
            if limit.is_none() && self.eat_keyword("LIMIT") {
                limit = Some(self.number()?);
            } else if offset.is_none() && self.eat_keyword("OFFSET") {
                offset = Some(self.number()?);
            } else {
                break;
            }
        }

        Ok(Select {
            projection,
            from,
            alias,
            filter,
            order_by,
            limit,
            offset,
        })
    }

    fn projection(&mut self) -> Result<Projection, QueryError> {
        if self.at_symbol("*") {
            self.pos += 1;
            return Ok(Projection::Star);
        }
        let mut items = Vec::new();
        loop {
            let all_of = self.at_name()
                && matches!(self.peek_at(1), Some(Token::Symbol(".")))
                && matches!(self.peek_at(2), Some(Token::Symbol("*")));
            if all_of {
                let alias = self.name()?;
                self.pos += 2;
                items.push(ResultItem::AllOf(alias));
            } else {
                let expr = self.expression()?;
                let alias = if self.eat_keyword("AS") || self.at_name() {
                    Some(self.name()?)
                } else {
                    None
                };
                items.push(ResultItem::Expr { expr, alias });
            }
            if self.at_symbol(",") {
                self.pos += 1;
            } else {
                return Ok(Projection::Items(items));
            }
        }
    }

    // ========== Expressions ==========

    fn expression(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.conjunction()?;
        while self.eat_keyword("OR") {
            let right = self.conjunction()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Expr, QueryError> {
        let mut left = self.negation()?;
        while self.eat_keyword("AND") {
            let right = self.negation()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn negation(&mut self) -> Result<Expr, QueryError> {
        if self.eat_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.negation()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, QueryError> {
        let left = self.primary()?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            let expr = Box::new(left);
            if self.eat_keyword("NULL") {
                return Ok(Expr::IsNull { expr, negated });
            }
            if self.eat_keyword("MISSING") {
                return Ok(Expr::IsMissing { expr, negated });
            }
            // VALUED is NOT NULL and NOT MISSING
            if self.eat_keyword("VALUED") {
                let valued = Expr::And(
                    Box::new(Expr::IsNull {
                        expr: expr.clone(),
                        negated: true,
                    }),
                    Box::new(Expr::IsMissing {
                        expr,
                        negated: true,
                    }),
                );
                return Ok(if negated {
                    Expr::Not(Box::new(valued))
                } else {
                    valued
                });
            }
            return self.error("expected NULL, MISSING or VALUED");
        }

        let op = match self.peek() {
            Some(Token::Symbol("=")) | Some(Token::Symbol("==")) => CompareOp::Eq,
            Some(Token::Symbol("!=")) | Some(Token::Symbol("<>")) => CompareOp::Ne,
            Some(Token::Symbol("<")) => CompareOp::Lt,
            Some(Token::Symbol("<=")) => CompareOp::Le,
            Some(Token::Symbol(">")) => CompareOp::Gt,
            Some(Token::Symbol(">=")) => CompareOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.primary()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn primary(&mut self) -> Result<Expr, QueryError> {
        match self.peek().cloned() {
            Some(Token::Num(n)) => {
                self.pos += 1;
                Ok(Expr::Literal(number(n)))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::String(s)))
            }
            Some(Token::Symbol("(")) => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Some(Token::Symbol("[")) => {
                self.pos += 1;
                let mut items = Vec::new();
                while !self.at_symbol("]") {
                    items.push(self.expression()?);
                    if !self.at_symbol("]") {
                        self.expect_symbol(",")?;
                    }
                }
                self.pos += 1;
                Ok(Expr::Array(items))
            }
            Some(Token::Symbol("{")) => {
                self.pos += 1;
                let mut fields = Vec::new();
                while !self.at_symbol("}") {
                    let key = match self.peek().cloned() {
                        Some(Token::Str(s)) | Some(Token::Escaped(s)) | Some(Token::Ident(s)) => s,
                        _ => return self.error("expected object key"),
                    };
                    self.pos += 1;
                    self.expect_symbol(":")?;
                    fields.push((key, self.expression()?));
                    if !self.at_symbol("}") {
                        self.expect_symbol(",")?;
                    }
                }
                self.pos += 1;
                Ok(Expr::Object(fields))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("TRUE") => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(true)))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("FALSE") => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(false)))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("NULL") => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Null))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("META") => {
                self.pos += 1;
                self.expect_symbol("(")?;
                if self.at_name() {
                    self.name()?;
                }
                self.expect_symbol(")")?;
                let mut fields = Vec::new();
                while self.at_symbol(".") {
                    self.pos += 1;
                    fields.push(self.name()?);
                }
                Ok(Expr::Meta(fields))
            }
            _ => self.path_segments().map(Expr::Path),
        }
    }

    fn path_segments(&mut self) -> Result<Vec<String>, QueryError> {
        let mut segments = vec![self.name()?];
        loop {
            if self.at_symbol(".") && !matches!(self.peek_at(1), Some(Token::Symbol("*"))) {
                self.pos += 1;
                segments.push(self.name()?);
            } else if self.at_symbol("[") {
                self.pos += 1;
                let index = self.number()?;
                self.expect_symbol("]")?;
                segments.push(index.to_string());
            } else {
                return Ok(segments);
            }
        }
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
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

fn constant(expr: Expr) -> Option<Value> {
    match expr {
        Expr::Literal(value) => Some(value),
        Expr::Array(items) => items.into_iter().map(constant).collect::<Option<Vec<_>>>().map(Value::Array),
        Expr::Object(fields) => constant_object(fields),
        _ => None,
    }
}

fn constant_object(fields: Vec<(String, Expr)>) -> Option<Value> {
    let mut map = Map::new();
    for (key, expr) in fields {
        map.insert(key, constant(expr)?);
    }
    Some(Value::Object(map))
}
