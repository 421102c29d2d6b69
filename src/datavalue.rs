use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QueryError;
use crate::hierarchy::ValueKind;

/// A literal value: used for filter values, mutation values, statement parameters and result cells.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "@type", content = "value")]
pub enum DataValue {
    ///No value
    Null,
    String(String),
    Bool(bool),
    Int(isize),
    Float(f64),

    //Value is an ordered list (sets are normalised to lists)
    List(Vec<DataValue>),
}

impl Default for DataValue {
    fn default() -> Self {
        Self::Null
    }
}

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the kind of value, `None` for null and lists
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::String(_) => Some(ValueKind::String),
            Self::Bool(_) => Some(ValueKind::Boolean),
            Self::Int(_) => Some(ValueKind::Integer),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Null | Self::List(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Encodes the value as a literal in the statement language.
    /// Strings are single-quoted with backslash escapes, lists are encoded element-wise.
    pub fn to_literal(&self) -> String {
        let mut s = String::new();
        self.write_literal(&mut s);
        s
    }

    fn write_literal(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(true) => out.push_str("true"),
            Self::Bool(false) => out.push_str("false"),
            Self::Int(v) => out.push_str(&v.to_string()),
            Self::Float(v) => {
                if v.is_nan() {
                    out.push_str("toFloat('NaN')");
                } else if v.is_infinite() {
                    if v.is_sign_positive() {
                        out.push_str("toFloat('Infinity')");
                    } else {
                        out.push_str("toFloat('-Infinity')");
                    }
                } else {
                    //debug formatting always keeps a fractional part or exponent (3.0, 1e-7)
                    out.push_str(&format!("{:?}", v));
                }
            }
            Self::String(v) => {
                out.push('\'');
                for c in v.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
            }
            Self::List(values) => {
                out.push('[');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    value.write_literal(out);
                }
                out.push(']');
            }
        }
    }

    /// Decodes a literal as produced by [`Self::to_literal()`]
    pub fn parse_literal(literal: &str) -> Result<Self, QueryError> {
        let mut parser = LiteralParser {
            input: literal,
            pos: 0,
        };
        let value = parser.value()?;
        parser.skip_whitespace();
        if parser.pos != literal.len() {
            return Err(QueryError::LiteralError(
                literal.to_string(),
                "trailing characters after literal",
            ));
        }
        Ok(value)
    }
}

impl fmt::Display for DataValue {
    /// Plain textual rendering, used for tabular output
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::String(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

struct LiteralParser<'a> {
    input: &'a str,
    pos: usize,
}

const KEYWORD_LITERALS: &[(&str, DataValue)] = &[
    ("null", DataValue::Null),
    ("true", DataValue::Bool(true)),
    ("false", DataValue::Bool(false)),
    ("toFloat('NaN')", DataValue::Float(f64::NAN)),
    ("toFloat('Infinity')", DataValue::Float(f64::INFINITY)),
    ("toFloat('-Infinity')", DataValue::Float(f64::NEG_INFINITY)),
];

impl<'a> LiteralParser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn error(&self, msg: &'static str) -> QueryError {
        QueryError::LiteralError(self.input.to_string(), msg)
    }

    fn value(&mut self) -> Result<DataValue, QueryError> {
        self.skip_whitespace();
        match self.rest().chars().next() {
            None => Err(self.error("unexpected end of literal")),
            Some('\'') => self.string(),
            Some('[') => self.list(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(_) => {
                for (keyword, value) in KEYWORD_LITERALS {
                    if self.eat(keyword) {
                        return Ok(value.clone());
                    }
                }
                Err(self.error("unknown literal"))
            }
        }
    }

    fn string(&mut self) -> Result<DataValue, QueryError> {
        self.pos += 1; //opening quote
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\'' => {
                    self.pos += i + 1;
                    return Ok(DataValue::String(out));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn number(&mut self) -> Result<DataValue, QueryError> {
        let rest = self.rest();
        let mut end = 0;
        for (i, c) in rest.char_indices() {
            let sign_allowed = i == 0 || matches!(rest[..i].chars().last(), Some('e') | Some('E'));
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E') || (sign_allowed && matches!(c, '-' | '+')) {
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
        let token = &rest[..end];
        self.pos += end;
        if token.contains(['.', 'e', 'E']) {
            token
                .parse::<f64>()
                .map(DataValue::Float)
                .map_err(|_| self.error("invalid float literal"))
        } else {
            token
                .parse::<isize>()
                .map(DataValue::Int)
                .map_err(|_| self.error("invalid integer literal"))
        }
    }

    fn list(&mut self) -> Result<DataValue, QueryError> {
        self.pos += 1; //opening bracket
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.eat("]") {
            return Ok(DataValue::List(values));
        }
        loop {
            values.push(self.value()?);
            self.skip_whitespace();
            if self.eat(",") {
                continue;
            } else if self.eat("]") {
                return Ok(DataValue::List(values));
            } else {
                return Err(self.error("expected ',' or ']' in list literal"));
            }
        }
    }
}

impl From<&str> for DataValue {
    fn from(item: &str) -> Self {
        Self::String(item.to_string())
    }
}

impl From<String> for DataValue {
    fn from(item: String) -> Self {
        Self::String(item)
    }
}

impl From<f64> for DataValue {
    fn from(item: f64) -> Self {
        Self::Float(item)
    }
}

impl From<f32> for DataValue {
    fn from(item: f32) -> Self {
        Self::Float(item as f64)
    }
}

impl From<isize> for DataValue {
    fn from(item: isize) -> Self {
        Self::Int(item)
    }
}

impl From<i64> for DataValue {
    fn from(item: i64) -> Self {
        Self::Int(item as isize)
    }
}

impl From<i32> for DataValue {
    fn from(item: i32) -> Self {
        Self::Int(item as isize)
    }
}

impl From<bool> for DataValue {
    fn from(item: bool) -> Self {
        Self::Bool(item)
    }
}

impl<T> From<Option<T>> for DataValue
where
    T: Into<DataValue>,
{
    fn from(item: Option<T>) -> Self {
        match item {
            Some(item) => item.into(),
            None => Self::Null,
        }
    }
}

impl<T> From<Vec<T>> for DataValue
where
    T: Into<DataValue>,
{
    fn from(item: Vec<T>) -> Self {
        Self::List(item.into_iter().map(|x| x.into()).collect())
    }
}

// These PartialEq implementation allow for more direct comparisons

impl PartialEq<str> for DataValue {
    fn eq(&self, other: &str) -> bool {
        match self {
            Self::String(v) => v == other,
            _ => false,
        }
    }
}

impl PartialEq<&str> for DataValue {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Self::String(v) => v == *other,
            _ => false,
        }
    }
}

impl PartialEq<f64> for DataValue {
    fn eq(&self, other: &f64) -> bool {
        match self {
            Self::Float(v) => v == other,
            _ => false,
        }
    }
}

impl PartialEq<isize> for DataValue {
    fn eq(&self, other: &isize) -> bool {
        match self {
            Self::Int(v) => v == other,
            _ => false,
        }
    }
}
