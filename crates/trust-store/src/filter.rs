//! Filter expressions over records.
//!
//! The textual form is the store's query language:
//!
//! ```text
//! business_id="abc" && status="published"
//! tx_hash="0x12" || blockchain_id="chain_7"
//! migrated_from!="" && (rating>=4 || title~"coffee")
//! ```
//!
//! Operators are `=`, `!=`, `~` (case-insensitive contains), `!~`, `>`,
//! `>=`, `<`, `<=`. `&&` binds tighter than `||`. Literals are quoted
//! strings, numbers, `true`, `false` and `null`. A missing field compares as
//! `null`, which equals `""` and `false`.
//!
//! Filters built with [`Filter::eq`] and friends never go through text, so
//! values cannot break out of their literal.

use crate::error::{Result, StoreError};
use crate::record::Record;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `~`
    Like,
    /// `!~`
    NotLike,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl CompareOp {
    // Longest tokens first so `!=` is not read as `!` `=`.
    const TOKENS: [(&'static str, Self); 8] = [
        ("!=", Self::NotEq),
        ("!~", Self::NotLike),
        (">=", Self::Gte),
        ("<=", Self::Lte),
        ("=", Self::Eq),
        ("~", Self::Like),
        (">", Self::Gt),
        ("<", Self::Lt),
    ];

    fn token(self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("=", |(token, _)| *token)
    }

    fn apply(self, actual: &Value, expected: &Value) -> bool {
        match self {
            Self::Eq => loose_eq(actual, expected),
            Self::NotEq => !loose_eq(actual, expected),
            Self::Like => contains(actual, expected),
            Self::NotLike => !contains(actual, expected),
            Self::Gt => order(actual, expected) == Some(Ordering::Greater),
            Self::Gte => matches!(order(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
            Self::Lt => order(actual, expected) == Some(Ordering::Less),
            Self::Lte => matches!(order(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

/// A boolean filter over record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field <op> value`
    Compare {
        /// Field name.
        field: String,
        /// Operator.
        op: CompareOp,
        /// Literal to compare against.
        value: Value,
    },
    /// Both sides hold.
    And(Box<Filter>, Box<Filter>),
    /// Either side holds.
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    /// `field <op> value`.
    #[must_use]
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// `field = value`.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// `field != value`.
    #[must_use]
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::NotEq, value)
    }

    /// `self && other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self || other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Parse the textual query language.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidFilter`] with the byte offset of the
    /// first problem.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser { src: input, pos: 0 };
        let filter = parser.parse_or()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(filter)
    }

    /// Evaluate against a record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Compare { field, op, value } => {
                let actual = record.get(field).unwrap_or(Value::Null);
                op.apply(&actual, value)
            }
            Self::And(left, right) => left.matches(record) && right.matches(record),
            Self::Or(left, right) => left.matches(record) || right.matches(record),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // serde_json renders strings quoted and escaped, which the parser reads back.
            Self::Compare { field, op, value } => write!(f, "{field}{}{value}", op.token()),
            Self::And(left, right) => write!(f, "({left} && {right})"),
            Self::Or(left, right) => write!(f, "({left} || {right})"),
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn loose_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Bool(b)) | (Value::Bool(b), Value::Null) => !b,
        _ => text(actual) == text(expected),
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    text(actual)
        .to_lowercase()
        .contains(&text(expected).to_lowercase())
}

fn order(actual: &Value, expected: &Value) -> Option<Ordering> {
    if actual.is_null() {
        return None;
    }
    match (number(actual), number(expected)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(text(actual).cmp(&text(expected))),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> StoreError {
        StoreError::InvalidFilter {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Filter> {
        let mut left = self.parse_and()?;
        while self.eat("||") {
            left = left.or(self.parse_and()?);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut left = self.parse_primary()?;
        while self.eat("&&") {
            left = left.and(self.parse_primary()?);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Filter> {
        if self.eat("(") {
            let inner = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("expected ')'"));
            }
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Filter> {
        self.skip_ws();
        let field = self.identifier()?;
        self.skip_ws();
        let op = CompareOp::TOKENS
            .iter()
            .find(|(token, _)| self.rest().starts_with(token))
            .map(|(token, op)| (token.len(), *op));
        let Some((len, op)) = op else {
            return Err(self.error("expected a comparison operator"));
        };
        self.pos += len;
        self.skip_ws();
        let value = self.literal()?;
        Ok(Filter::Compare { field, op, value })
    }

    fn identifier(&mut self) -> Result<String> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(i, c)| {
                !(c.is_ascii_alphabetic() || *c == '_' || (*i > 0 && (c.is_ascii_digit() || *c == '.')))
            })
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return Err(self.error("expected a field name"));
        }
        let ident = rest[..len].to_string();
        self.pos += len;
        Ok(ident)
    }

    fn literal(&mut self) -> Result<Value> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => self.string(quote),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(_) => {
                for (word, value) in [
                    ("true", Value::Bool(true)),
                    ("false", Value::Bool(false)),
                    ("null", Value::Null),
                ] {
                    if rest.starts_with(word) {
                        self.pos += word.len();
                        return Ok(value);
                    }
                }
                Err(self.error("expected a literal"))
            }
            None => Err(self.error("unexpected end of filter")),
        }
    }

    fn string(&mut self, quote: char) -> Result<Value> {
        let start = self.pos;
        let mut out = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, 'b')) => out.push('\u{8}'),
                    Some((_, 'f')) => out.push('\u{c}'),
                    Some((_, 'u')) => {
                        let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                        let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
                        match decoded {
                            Some(c) => out.push(c),
                            None => break,
                        }
                    }
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.pos = start + i + c.len_utf8();
                    return Ok(Value::String(out));
                }
                c => out.push(c),
            }
        }
        Err(StoreError::InvalidFilter {
            offset: start,
            message: "unterminated string".to_string(),
        })
    }

    fn number(&mut self) -> Result<Value> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
            .map_or(rest.len(), |(i, _)| i);
        let token = &rest[..len];
        let value = if let Ok(int) = token.parse::<i64>() {
            Value::from(int)
        } else if let Ok(float) = token.parse::<f64>() {
            Value::from(float)
        } else {
            return Err(self.error(format!("invalid number {token:?}")));
        };
        self.pos += len;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fields;
    use chrono::Utc;
    use serde_json::json;
    use test_case::test_case;

    fn record(value: Value) -> Record {
        let now = Utc::now();
        Record {
            id: "rec1".into(),
            collection: "reviews".into(),
            created: now,
            updated: now,
            fields: fields(value).expect("object"),
        }
    }

    fn review() -> Record {
        record(json!({
            "business_id": "biz1",
            "status": "published",
            "rating": 4,
            "tx_hash": "0xabc",
            "title": "Great Coffee",
            "migrated_from": "",
            "chain_verified": false,
        }))
    }

    #[test_case(r#"business_id="biz1""#, true ; "string equality")]
    #[test_case(r#"business_id="biz2""#, false ; "string inequality")]
    #[test_case(r#"business_id="biz1" && status="published""#, true ; "conjunction")]
    #[test_case(r#"business_id="biz1" && status="pending""#, false ; "failed conjunction")]
    #[test_case(r#"tx_hash="0xnope" || business_id="biz1""#, true ; "disjunction")]
    #[test_case(r#"migrated_from!="""#, false ; "empty provenance")]
    #[test_case(r#"reviewer_address="""#, true ; "missing field equals empty")]
    #[test_case("rating=4", true ; "number")]
    #[test_case("rating>=4 && rating<5", true ; "ranges")]
    #[test_case("rating>4", false ; "strict greater")]
    #[test_case("chain_verified=false", true ; "bool")]
    #[test_case("world_id_verified=false", true ; "missing bool is false")]
    #[test_case(r#"title~"coffee""#, true ; "contains ignores case")]
    #[test_case(r#"title!~"tea""#, true ; "not contains")]
    #[test_case(r#"id="rec1""#, true ; "system id")]
    #[test_case(r#"(status="x" || status="published") && rating=4"#, true ; "parentheses")]
    #[test_case(r#"status="x" || status="published" && rating=5"#, false ; "and binds tighter")]
    fn test_matches(expr: &str, expected: bool) {
        let filter = Filter::parse(expr).expect("should parse");
        assert_eq!(filter.matches(&review()), expected, "{expr}");
    }

    #[test_case("" ; "empty")]
    #[test_case("status=" ; "missing literal")]
    #[test_case(r#"status="open"# ; "unterminated")]
    #[test_case(r#"status "x""# ; "missing operator")]
    #[test_case(r#"(status="x""# ; "unclosed paren")]
    #[test_case(r#"status="x" &&"# ; "dangling and")]
    #[test_case(r#"status="x" garbage"# ; "trailing input")]
    #[test_case(r#"="x""# ; "missing field")]
    fn test_parse_errors(expr: &str) {
        assert!(matches!(
            Filter::parse(expr),
            Err(StoreError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_escaped_quotes() {
        let filter = Filter::parse(r#"title="say \"hi\"""#).expect("should parse");
        assert_eq!(filter, Filter::eq("title", "say \"hi\""));
    }

    #[test]
    fn test_single_quotes() {
        let filter = Filter::parse("status='published'").expect("should parse");
        assert!(filter.matches(&review()));
    }

    #[test]
    fn test_builders_match_parsed() {
        let built = Filter::eq("business_id", "biz1").and(Filter::eq("status", "published"));
        let parsed = Filter::parse(r#"business_id="biz1" && status="published""#).expect("parse");
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_display_round_trips() {
        let filter = Filter::eq("tx_hash", "0xabc")
            .or(Filter::eq("blockchain_id", "c1"))
            .and(Filter::ne("migrated_from", ""));
        let reparsed = Filter::parse(&filter.to_string()).expect("display should parse");
        assert_eq!(reparsed, filter);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn rendered_filters_match_their_own_value(value in ".{0,40}") {
                let target = record(json!({ "name": value.clone() }));
                let filter = Filter::parse(&Filter::eq("name", value).to_string())
                    .expect("rendered filter should parse");
                prop_assert!(filter.matches(&target));
            }

            #[test]
            fn injected_values_stay_literal(value in r#"[a-z"|&=() ]{0,20}"#) {
                let target = record(json!({ "name": "someone-else" }));
                let filter = Filter::parse(&Filter::eq("name", value.clone()).to_string())
                    .expect("rendered filter should parse");
                prop_assert_eq!(filter.matches(&target), value == "someone-else");
            }
        }
    }
}
