//! A small syntax tree for the graph pattern-matching statements the compiler emits,
//! and the single printer that renders it. All quoting of identifiers and literals happens here.

use std::collections::BTreeSet;
use std::fmt;

use crate::datavalue::DataValue;
use crate::predicate::Operator;

/// Writes an identifier (label, property key, relationship type), backtick-quoted when needed
fn write_identifier(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
    let simple = !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        write!(f, "{}", s)
    } else {
        write!(f, "`{}`", s.replace('`', "``"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub alias: String,
    /// Empty when the alias is already bound by an earlier pattern
    pub labels: Vec<String>,
}

impl NodePattern {
    pub fn bound(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            labels: Vec::new(),
        }
    }

    pub fn new(alias: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            alias: alias.into(),
            labels,
        }
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}", self.alias)?;
        for label in self.labels.iter() {
            write!(f, ":")?;
            write_identifier(f, label)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(a)-[]->(b)`
    Outgoing,
    /// `(a)<-[]-(b)`
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hops {
    One,
    /// A variable-length path constrained to exactly this many hops
    Exactly(usize),
}

impl Hops {
    pub fn new(count: usize) -> Self {
        if count == 1 {
            Self::One
        } else {
            Self::Exactly(count)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    pub rel_type: String,
    pub direction: Direction,
    pub hops: Hops,
}

impl RelPattern {
    pub fn new(rel_type: impl Into<String>, direction: Direction, hops: Hops) -> Self {
        Self {
            rel_type: rel_type.into(),
            direction,
            hops,
        }
    }
}

impl fmt::Display for RelPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.direction == Direction::Incoming {
            write!(f, "<")?;
        }
        write!(f, "-[:")?;
        write_identifier(f, &self.rel_type)?;
        if let Hops::Exactly(n) = self.hops {
            write!(f, "*{}..{}", n, n)?;
        }
        write!(f, "]-")?;
        if self.direction == Direction::Outgoing {
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// A path: a start node followed by relationship/node pairs
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub steps: Vec<(RelPattern, NodePattern)>,
}

impl PathPattern {
    pub fn node(start: NodePattern) -> Self {
        Self {
            start,
            steps: Vec::new(),
        }
    }

    pub fn then(mut self, rel: RelPattern, node: NodePattern) -> Self {
        self.steps.push((rel, node));
        self
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.start.alias.as_str())
            .chain(self.steps.iter().map(|(_, node)| node.alias.as_str()))
    }

    /// Does any relationship in this path span more than one hop?
    pub fn has_variable_length(&self) -> bool {
        self.steps
            .iter()
            .any(|(rel, _)| matches!(rel.hops, Hops::Exactly(_)))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.start)?;
        for (rel, node) in self.steps.iter() {
            write!(f, "{}{}", rel, node)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Alias(String),
    /// A result column by its output name
    Column(String),
    Property(String, String),
    /// `alias.end - alias.begin`
    Duration(String),
    Literal(DataValue),
    Parameter(String),
    HasLabel(String, String),
    Compare(Box<Expr>, Operator, Box<Expr>),
    /// `expr IS NULL` or, negated, `expr IS NOT NULL`
    IsNull(Box<Expr>, bool),
    Not(Box<Expr>),
    Function(&'static str, Vec<Expr>),
    /// Pattern comprehension: `[pattern | projection]`
    Collect(PathPattern, Box<Expr>),
}

impl Expr {
    pub fn property(alias: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Property(alias.into(), key.into())
    }

    pub fn compare(lhs: Expr, operator: Operator, rhs: Expr) -> Self {
        match operator {
            Operator::NotIn => Self::Not(Box::new(Self::Compare(
                Box::new(lhs),
                Operator::In,
                Box::new(rhs),
            ))),
            operator => Self::Compare(Box::new(lhs), operator, Box::new(rhs)),
        }
    }

    /// Collects the aliases this expression refers to (aliases local to pattern comprehensions excluded)
    pub fn collect_aliases<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Alias(alias)
            | Self::Property(alias, _)
            | Self::Duration(alias)
            | Self::HasLabel(alias, _) => {
                out.insert(alias.as_str());
            }
            Self::Column(_) | Self::Literal(_) | Self::Parameter(_) => {}
            Self::Compare(lhs, _, rhs) => {
                lhs.collect_aliases(out);
                rhs.collect_aliases(out);
            }
            Self::IsNull(expr, _) | Self::Not(expr) => expr.collect_aliases(out),
            Self::Function(_, args) => {
                for arg in args.iter() {
                    arg.collect_aliases(out);
                }
            }
            Self::Collect(pattern, _) => {
                //only the start node comes from outside the comprehension
                out.insert(pattern.start.alias.as_str());
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Alias(alias) => write!(f, "{}", alias),
            Self::Column(name) => write_identifier(f, name),
            Self::Property(alias, key) => {
                write!(f, "{}.", alias)?;
                write_identifier(f, key)
            }
            Self::Duration(alias) => write!(f, "({}.end - {}.begin)", alias, alias),
            Self::Literal(value) => write!(f, "{}", value.to_literal()),
            Self::Parameter(name) => write!(f, "${}", name),
            Self::HasLabel(alias, label) => {
                write!(f, "{}:", alias)?;
                write_identifier(f, label)
            }
            Self::Compare(lhs, operator, rhs) => {
                write!(f, "{} {} {}", lhs, operator.as_statement_str(), rhs)
            }
            Self::IsNull(expr, false) => write!(f, "{} IS NULL", expr),
            Self::IsNull(expr, true) => write!(f, "{} IS NOT NULL", expr),
            Self::Not(expr) => write!(f, "NOT ({})", expr),
            Self::Function(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Self::Collect(pattern, projection) => write!(f, "[{} | {}]", pattern, projection),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: Expr,
    /// Output name, `None` when the expression is returned under its own name
    pub name: Option<String>,
}

impl ReturnItem {
    /// The column name this item produces
    pub fn column_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.expr.to_string(),
        }
    }
}

impl fmt::Display for ReturnItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(name) = &self.name {
            write!(f, " AS ")?;
            write_identifier(f, name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetItem {
    Property(String, String, Expr),
    Label(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveItem {
    Property(String, String),
    Label(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(Vec<PathPattern>),
    OptionalMatch(Vec<PathPattern>),
    /// Conditions, joined by AND
    Where(Vec<Expr>),
    /// Carry-forward of bound aliases
    With(Vec<String>),
    Return {
        distinct: bool,
        items: Vec<ReturnItem>,
        order_by: Vec<OrderItem>,
        limit: Option<usize>,
    },
    Set(Vec<SetItem>),
    Remove(Vec<RemoveItem>),
    Delete {
        detach: bool,
        aliases: Vec<String>,
    },
}

impl Clause {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Match(..) => "MATCH",
            Self::OptionalMatch(..) => "OPTIONAL MATCH",
            Self::Where(..) => "WHERE",
            Self::With(..) => "WITH",
            Self::Return { .. } => "RETURN",
            Self::Set(..) => "SET",
            Self::Remove(..) => "REMOVE",
            Self::Delete { detach: true, .. } => "DETACH DELETE",
            Self::Delete { detach: false, .. } => "DELETE",
        }
    }

    /// Aliases this clause refers to, including the ones it binds
    pub fn collect_aliases<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Match(patterns) | Self::OptionalMatch(patterns) => {
                for pattern in patterns.iter() {
                    out.extend(pattern.aliases());
                }
            }
            Self::Where(exprs) => {
                for expr in exprs.iter() {
                    expr.collect_aliases(out);
                }
            }
            Self::With(aliases) | Self::Delete { aliases, .. } => {
                out.extend(aliases.iter().map(|s| s.as_str()))
            }
            Self::Return {
                items, order_by, ..
            } => {
                for item in items.iter() {
                    item.expr.collect_aliases(out);
                }
                for item in order_by.iter() {
                    item.expr.collect_aliases(out);
                }
            }
            Self::Set(items) => {
                for item in items.iter() {
                    match item {
                        SetItem::Property(alias, _, expr) => {
                            out.insert(alias.as_str());
                            expr.collect_aliases(out);
                        }
                        SetItem::Label(alias, _) => {
                            out.insert(alias.as_str());
                        }
                    }
                }
            }
            Self::Remove(items) => {
                for item in items.iter() {
                    match item {
                        RemoveItem::Property(alias, _) | RemoveItem::Label(alias, _) => {
                            out.insert(alias.as_str());
                        }
                    }
                }
            }
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ", self.keyword())?;
        match self {
            Self::Match(patterns) | Self::OptionalMatch(patterns) => {
                write_joined(f, patterns, ", ")
            }
            Self::Where(exprs) => write_joined(f, exprs, " AND "),
            Self::With(aliases) | Self::Delete { aliases, .. } => {
                write_joined(f, aliases, ", ")
            }
            Self::Return {
                distinct,
                items,
                order_by,
                limit,
            } => {
                if *distinct {
                    write!(f, "DISTINCT ")?;
                }
                write_joined(f, items, ", ")?;
                if !order_by.is_empty() {
                    write!(f, "\nORDER BY ")?;
                    for (i, item) in order_by.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", item.expr)?;
                        if item.descending {
                            write!(f, " DESC")?;
                        }
                    }
                }
                if let Some(limit) = limit {
                    write!(f, "\nLIMIT {}", limit)?;
                }
                Ok(())
            }
            Self::Set(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        SetItem::Property(alias, key, expr) => {
                            write!(f, "{}.", alias)?;
                            write_identifier(f, key)?;
                            write!(f, " = {}", expr)?;
                        }
                        SetItem::Label(alias, label) => {
                            write!(f, "{}:", alias)?;
                            write_identifier(f, label)?;
                        }
                    }
                }
                Ok(())
            }
            Self::Remove(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        RemoveItem::Property(alias, key) => {
                            write!(f, "{}.", alias)?;
                            write_identifier(f, key)?;
                        }
                        RemoveItem::Label(alias, label) => {
                            write!(f, "{}:", alias)?;
                            write_identifier(f, label)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// A complete statement: clauses in generation order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    clauses: Vec<Clause>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn iter(&self) -> std::slice::Iter<Clause> {
        self.clauses.iter()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// All aliases bound by MATCH or OPTIONAL MATCH patterns
    pub fn bound_aliases(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        for clause in self.clauses.iter() {
            if let Clause::Match(..) | Clause::OptionalMatch(..) = clause {
                clause.collect_aliases(&mut out);
            }
        }
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}
