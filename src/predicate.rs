use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::datavalue::DataValue;
use crate::error::QueryError;
use crate::path::AttributePath;

/// Comparison operators a [`Filter`] can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "regex")]
    Regex,
}

impl Operator {
    /// The textual form used by callers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Regex => "regex",
        }
    }

    /// The operator as written in the statement language. `NotIn` is rendered as a negated `IN`.
    pub fn as_statement_str(&self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::In | Self::NotIn => "IN",
            Self::Regex => "=~",
        }
    }

    /// The operator with swapped operands (`a < b` is `b > a`), `None` when not symmetric
    pub fn flipped(&self) -> Option<Self> {
        match self {
            Self::Equals => Some(Self::Equals),
            Self::NotEquals => Some(Self::NotEquals),
            Self::GreaterThan => Some(Self::LessThan),
            Self::GreaterThanOrEqual => Some(Self::LessThanOrEqual),
            Self::LessThan => Some(Self::GreaterThan),
            Self::LessThanOrEqual => Some(Self::GreaterThanOrEqual),
            Self::In | Self::NotIn | Self::Regex => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" | "=" => Ok(Self::Equals),
            "!=" | "<>" => Ok(Self::NotEquals),
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterThanOrEqual),
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessThanOrEqual),
            "in" | "IN" => Ok(Self::In),
            "not in" | "NOT IN" | "not_in" => Ok(Self::NotIn),
            "regex" | "=~" => Ok(Self::Regex),
            other => Err(QueryError::InvalidFilter(format!(
                "Unknown operator '{}'",
                other
            ))),
        }
    }
}

/// Alignment relations as offered to end users, normalised to boundary comparisons by [`Filter::aligned()`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Both annotations end at the same instant
    RightAligned,
    /// Both annotations begin at the same instant
    LeftAligned,
    NotRightAligned,
    NotLeftAligned,
}

impl Alignment {
    fn boundary(&self) -> &'static str {
        match self {
            Self::RightAligned | Self::NotRightAligned => "end",
            Self::LeftAligned | Self::NotLeftAligned => "begin",
        }
    }

    fn operator(&self) -> Operator {
        match self {
            Self::RightAligned | Self::LeftAligned => Operator::Equals,
            Self::NotRightAligned | Self::NotLeftAligned => Operator::NotEquals,
        }
    }
}

impl FromStr for Alignment {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "right aligned with" => Ok(Self::RightAligned),
            "left aligned with" => Ok(Self::LeftAligned),
            "not right aligned with" => Ok(Self::NotRightAligned),
            "not left aligned with" => Ok(Self::NotLeftAligned),
            other => Err(QueryError::InvalidFilter(format!(
                "Unknown alignment relation '{}'",
                other
            ))),
        }
    }
}

/// The right-hand side of a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Literal(DataValue),
    Path(AttributePath),
}

impl FilterValue {
    pub fn as_path(&self) -> Option<&AttributePath> {
        match self {
            Self::Path(path) => Some(path),
            Self::Literal(_) => None,
        }
    }
}

impl From<DataValue> for FilterValue {
    fn from(value: DataValue) -> Self {
        Self::Literal(value)
    }
}

impl From<AttributePath> for FilterValue {
    fn from(path: AttributePath) -> Self {
        Self::Path(path)
    }
}

/// Strings are always literals, wrap paths in [`AttributePath`] to compare against another attribute
impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.into())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Literal(value.into())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Literal(value.into())
    }
}

impl From<isize> for FilterValue {
    fn from(value: isize) -> Self {
        Self::Literal(value.into())
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Literal(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Literal(value.into())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Literal(value.into())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Literal(values.into())
    }
}

/// A structured condition: `attribute-path operator value-or-attribute-path`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    path: AttributePath,
    operator: Operator,
    value: FilterValue,
}

impl Filter {
    pub fn new(
        path: impl Into<AttributePath>,
        operator: Operator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            path: path.into(),
            operator,
            value: value.into(),
        }
    }

    /// Normalises an alignment relation between two annotations to a boundary comparison.
    /// Both arguments are paths to annotations (without `begin`/`end`).
    pub fn aligned(
        annotation: impl Into<AttributePath>,
        alignment: Alignment,
        other: impl Into<AttributePath>,
    ) -> Self {
        let boundary = alignment.boundary();
        Self {
            path: annotation.into().join(boundary),
            operator: alignment.operator(),
            value: FilterValue::Path(other.into().join(boundary)),
        }
    }

    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Does this filter state that two annotations share a boundary, rather than compare a value?
    pub fn is_alignment(&self) -> bool {
        let boundary = match self.path.last() {
            Some(b @ "begin") | Some(b @ "end") => b,
            _ => return false,
        };
        matches!(self.operator, Operator::Equals | Operator::NotEquals)
            && matches!(&self.value, FilterValue::Path(other) if other.last() == Some(boundary))
    }

    /// Checks that the operator fits the value
    pub fn validate(&self) -> Result<(), QueryError> {
        match (&self.operator, &self.value) {
            (Operator::Regex, FilterValue::Literal(DataValue::String(pattern))) => {
                Regex::new(pattern).map_err(|e| {
                    QueryError::InvalidFilter(format!(
                        "Invalid regular expression in filter on {}: {}",
                        self.path, e
                    ))
                })?;
            }
            (Operator::Regex, _) => {
                return Err(QueryError::InvalidFilter(format!(
                    "Regular expression filter on {} requires a string pattern",
                    self.path
                )))
            }
            (Operator::In | Operator::NotIn, FilterValue::Literal(DataValue::List(_))) => {}
            (Operator::In | Operator::NotIn, FilterValue::Literal(_)) => {
                return Err(QueryError::InvalidFilter(format!(
                    "Operator '{}' on {} requires a list value",
                    self.operator, self.path
                )))
            }
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.value {
            FilterValue::Literal(value) => {
                write!(f, "{} {} {}", self.path, self.operator, value.to_literal())
            }
            FilterValue::Path(path) => write!(f, "{} {} {}", self.path, self.operator, path),
        }
    }
}
