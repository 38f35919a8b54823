//! Parser and matcher for the query subset the engine emits.
//!
//! Supported syntax:
//!
//! ```text
//! *                      every message
//! field:value            exact term match, `field:*` means "field present"
//! field: "quoted \" v"   quoted value, `\\` and `\"` unescaped
//! streams:<id>           stream membership
//! a AND b, a OR b        AND binds tighter than OR
//! ( ... )                grouping
//! ```

use std::collections::BTreeMap;

use aggcount_core::Message;

use crate::backend::BackendError;

/// Parsed query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    All,
    Term { field: String, value: String },
    And(Vec<QueryExpr>),
    Or(Vec<QueryExpr>),
}

impl QueryExpr {
    /// Parse a query string. A blank query matches everything.
    pub fn parse(query: &str) -> Result<Self, BackendError> {
        let mut parser = Parser {
            query,
            chars: query.chars().collect(),
            pos: 0,
        };
        parser.skip_ws();
        if parser.at_end() {
            return Ok(QueryExpr::All);
        }
        let expr = parser.parse_or()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    pub fn matches(&self, message: &Message) -> bool {
        match self {
            QueryExpr::All => true,
            QueryExpr::Term { field, value } if field == "streams" => {
                message.streams.iter().any(|s| s == value)
            }
            QueryExpr::Term { field, value } => match message.term(field) {
                Some(term) => value == "*" || term == *value,
                None => false,
            },
            QueryExpr::And(items) => items.iter().all(|e| e.matches(message)),
            QueryExpr::Or(items) => items.iter().any(|e| e.matches(message)),
        }
    }
}

/// Replace `$name$` placeholders with parameter values.
///
/// Unknown placeholders are left as they are.
pub fn substitute_parameters(query: &str, parameters: &BTreeMap<String, String>) -> String {
    let mut out = query.to_string();
    for (name, value) in parameters {
        out = out.replace(&format!("${name}$"), value);
    }
    out
}

struct Parser<'a> {
    query: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn parse_or(&mut self) -> Result<QueryExpr, BackendError> {
        let mut items = vec![self.parse_and()?];
        while self.eat_keyword("OR") {
            items.push(self.parse_and()?);
        }
        Ok(collapse(items, QueryExpr::Or))
    }

    fn parse_and(&mut self) -> Result<QueryExpr, BackendError> {
        let mut items = vec![self.parse_primary()?];
        while self.eat_keyword("AND") {
            items.push(self.parse_primary()?);
        }
        Ok(collapse(items, QueryExpr::And))
    }

    fn parse_primary(&mut self) -> Result<QueryExpr, BackendError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of query")),
            Some('(') => {
                self.pos += 1;
                let expr = self.parse_or()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(self.error("missing closing parenthesis"));
                }
                self.pos += 1;
                Ok(expr)
            }
            Some('*') => {
                self.pos += 1;
                Ok(QueryExpr::All)
            }
            Some(_) => self.parse_term(),
        }
    }

    fn parse_term(&mut self) -> Result<QueryExpr, BackendError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_field_char(c)) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a field name"));
        }
        let field: String = self.chars[start..self.pos].iter().collect();

        if self.peek() != Some(':') {
            return Err(self.error("expected ':' after field name"));
        }
        self.pos += 1;
        self.skip_ws();

        let value = if self.peek() == Some('"') {
            self.pos += 1;
            self.quoted_value()?
        } else {
            let start = self.pos;
            while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != ')') {
                self.pos += 1;
            }
            if self.pos == start {
                return Err(self.error("expected a value"));
            }
            self.chars[start..self.pos].iter().collect()
        };

        Ok(QueryExpr::Term { field, value })
    }

    fn quoted_value(&mut self) -> Result<String, BackendError> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated quoted value")),
                Some('"') => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("dangling escape"))?;
                    value.push(escaped);
                    self.pos += 1;
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let end = self.pos + keyword.len();
        if end > self.chars.len() {
            return false;
        }
        let word: String = self.chars[self.pos..end].iter().collect();
        let boundary = matches!(self.chars.get(end), Some(c) if c.is_whitespace() || *c == '(');
        if word == keyword && boundary {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, reason: &str) -> BackendError {
        BackendError::MalformedQuery {
            query: self.query.to_string(),
            reason: format!("{reason} at position {}", self.pos),
        }
    }
}

fn is_field_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '@')
}

fn collapse(mut items: Vec<QueryExpr>, wrap: fn(Vec<QueryExpr>) -> QueryExpr) -> QueryExpr {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}
