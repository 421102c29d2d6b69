//! Compiles a [`QueryIntent`] into a [`CompiledStatement`].
//!
//! Compilation happens in three passes:
//!
//! 1. Every attribute path (filters, columns, aggregates, ordering) is resolved by the [`PathResolver`]
//!    into the graph nodes it needs. Nodes referenced by a filter are *required*, nodes only referenced
//!    for output are *optional*. Dependencies (the position-0 annotation a relative position is counted
//!    from, the containing annotation a containment node hangs off) inherit the requirement of their dependents.
//! 2. Nodes are bound in order of nesting depth and distance to their chain base. A relative position
//!    is chained from the nearest position that is already bound on the anchor side, which yields a
//!    single-hop edge whenever the adjacent position is bound and an exact-length path otherwise.
//! 3. The clauses are emitted in a fixed order: `MATCH`, `WHERE`, `WITH`, one `OPTIONAL MATCH` per optional
//!    annotation (with its own `WHERE`), and the terminal clause(s).
//!
//! Compilation is deterministic and does not mutate its input.

use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, trace};

use crate::config::Config;
use crate::datavalue::DataValue;
use crate::error::QueryError;
use crate::hierarchy::{Hierarchy, PropertySide};
use crate::intent::{Intent, LabelUpdates, Projection, PropertyUpdates, QueryIntent};
use crate::path::{
    AnnotationAttribute, AttributePath, Axis, Leaf, PathResolver, ResolvedPath, Target,
};
use crate::predicate::{Filter, FilterValue, Operator};
use crate::statement::{
    Clause, Direction, Expr, Hops, NodePattern, OrderItem, PathPattern, RelPattern, RemoveItem,
    ReturnItem, SetItem, Statement,
};

const PRECEDES: &str = "precedes";
const PRECEDES_PAUSE: &str = "precedes_pause";
const CONTAINED_BY: &str = "contained_by";
const IS_A: &str = "is_a";
const ANNOTATES: &str = "annotates";
const SPOKEN_BY: &str = "spoken_by";
const SPOKEN_IN: &str = "spoken_in";

/// What the store is expected to do with a compiled statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementMode {
    /// Returns rows
    Read,
    /// Mutates the graph, returns nothing
    Write,
    /// Returns nothing inline, results go to a side cache keyed by [`CompiledStatement::fingerprint()`].
    /// The statement ends with a `WITH` carrying every bound alias, which is not a valid final clause:
    /// the executor appends its own sink clause (writing to the cache) before running it.
    Cache,
}

/// The output of compilation: the statement and the parameters to bind when executing it
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    statement: Statement,
    text: String,
    parameters: BTreeMap<String, DataValue>,
    columns: Vec<String>,
    mode: StatementMode,
}

impl CompiledStatement {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// The rendered statement text
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn parameters(&self) -> &BTreeMap<String, DataValue> {
        &self.parameters
    }

    /// Names of the result columns, empty for mutations and cache mode
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn mode(&self) -> StatementMode {
        self.mode
    }

    /// All aliases bound by the statement's match clauses
    pub fn bound_aliases(&self) -> BTreeSet<&str> {
        self.statement.bound_aliases()
    }

    /// SHA-1 over the text and the parameters, as a lowercase hex string.
    /// Two statements with the same fingerprint return the same results on the same graph.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.text.as_bytes());
        for (name, value) in self.parameters.iter() {
            hasher.update(b"\n$");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_literal().as_bytes());
        }
        base16ct::lower::encode_string(&hasher.finalize())
    }
}

impl fmt::Display for CompiledStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A graph node a statement may bind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Annotation(AnnotationAttribute),
    Type(AnnotationAttribute),
    Speaker(AnnotationAttribute),
    Discourse(AnnotationAttribute),
    Subannotation(AnnotationAttribute, String),
}

impl Node {
    fn annotation(&self) -> &AnnotationAttribute {
        match self {
            Self::Annotation(a)
            | Self::Type(a)
            | Self::Speaker(a)
            | Self::Discourse(a)
            | Self::Subannotation(a, _) => a,
        }
    }

    fn alias(&self) -> String {
        match self {
            Self::Annotation(a) => a.alias(),
            Self::Type(a) => a.type_alias(),
            Self::Speaker(a) => format!("{}_speaker", a.alias()),
            Self::Discourse(a) => format!("{}_discourse", a.alias()),
            Self::Subannotation(a, name) => format!("{}_{}", a.alias(), name),
        }
    }

    fn labels(&self) -> Vec<String> {
        let a = self.annotation();
        let label = match self {
            Self::Annotation(_) => a.tier().to_string(),
            Self::Type(_) => format!("{}_type", a.tier()),
            Self::Speaker(_) => "Speaker".to_string(),
            Self::Discourse(_) => "Discourse".to_string(),
            Self::Subannotation(_, name) => name.clone(),
        };
        vec![label, a.corpus().to_string()]
    }

    /// The node that must be bound before this one
    fn dependency(&self) -> Option<Node> {
        match self {
            Self::Annotation(a) if a.position() != 0 => Some(Self::Annotation(a.base())),
            Self::Annotation(a) => a.parent().map(|p| Self::Annotation(p.clone())),
            Self::Type(a) | Self::Speaker(a) | Self::Discourse(a) | Self::Subannotation(a, _) => {
                Some(Self::Annotation(a.clone()))
            }
        }
    }

    /// Binding order: dependencies always sort before their dependents
    fn sort_key(&self) -> (usize, usize, u8, isize, String) {
        let a = self.annotation();
        let rank = match self {
            Self::Annotation(_) => 0,
            Self::Type(_) => 1,
            Self::Speaker(_) => 2,
            Self::Discourse(_) => 3,
            Self::Subannotation(..) => 4,
        };
        (
            a.depth(),
            a.position().unsigned_abs(),
            rank,
            a.position(),
            self.alias(),
        )
    }
}

fn sorted(nodes: &HashSet<Node>) -> Vec<Node> {
    let mut nodes: Vec<Node> = nodes.iter().cloned().collect();
    nodes.sort_by_key(|node| node.sort_key());
    nodes
}

/// Compiles query intents against a hierarchy
pub struct StatementCompiler<'a> {
    hierarchy: &'a Hierarchy,
    config: &'a Config,
}

impl<'a> StatementCompiler<'a> {
    pub fn new(hierarchy: &'a Hierarchy, config: &'a Config) -> Self {
        Self { hierarchy, config }
    }

    pub fn compile(&self, intent: &QueryIntent) -> Result<CompiledStatement, QueryError> {
        check_mutation(intent.intent())?;
        let resolver = PathResolver::new(self.hierarchy, self.config, intent.tier())?;
        let mut generation = Generation {
            hierarchy: self.hierarchy,
            resolver: &resolver,
            parameterize: self.config.parameterize(),
            parameters: BTreeMap::new(),
            required: HashSet::new(),
            optional: HashSet::new(),
            required_conditions: Vec::new(),
        };
        let anchor = Node::Annotation(resolver.anchor().clone());
        generation.require(&anchor);

        for filter in intent.effective_filters().iter() {
            generation.add_filter(filter)?;
        }

        let (terminal, columns, mode) = match intent.intent() {
            Intent::Project(projection) => {
                let (clause, columns) = generation.projection(projection)?;
                (vec![clause], columns, StatementMode::Read)
            }
            Intent::SetProperties(updates) => {
                (generation.set_properties(updates), Vec::new(), StatementMode::Write)
            }
            Intent::SetLabels(updates) => (
                vec![Clause::Set(
                    generation
                        .label_items(updates)
                        .map(|(alias, label)| SetItem::Label(alias, label))
                        .collect(),
                )],
                Vec::new(),
                StatementMode::Write,
            ),
            Intent::RemoveLabels(updates) => (
                vec![Clause::Remove(
                    generation
                        .label_items(updates)
                        .map(|(alias, label)| RemoveItem::Label(alias, label))
                        .collect(),
                )],
                Vec::new(),
                StatementMode::Write,
            ),
            Intent::Delete => (
                vec![Clause::Delete {
                    detach: true,
                    aliases: vec![anchor.alias()],
                }],
                Vec::new(),
                StatementMode::Write,
            ),
            Intent::Cache => (Vec::new(), Vec::new(), StatementMode::Cache),
        };

        let statement = generation.assemble(terminal, mode)?;
        let text = statement.to_string();
        debug!(
            tier = intent.tier(),
            intent = intent.intent().keyword(),
            parameters = generation.parameters.len(),
            "compiled statement:\n{}",
            text
        );
        Ok(CompiledStatement {
            statement,
            text,
            parameters: generation.parameters,
            columns,
            mode,
        })
    }
}

/// Checks mutation payloads the builder can not rule out structurally
fn check_mutation(intent: &Intent) -> Result<(), QueryError> {
    match intent {
        Intent::SetProperties(updates) => {
            if updates.is_empty() {
                return Err(QueryError::InvalidMutationCombination(
                    "property mutation without any property".to_string(),
                ));
            }
            for (side, assignments) in [("token", &updates.token), ("type", &updates.types)] {
                for (i, (key, value)) in assignments.iter().enumerate() {
                    if assignments[..i].iter().any(|(k, v)| k == key && v != value) {
                        return Err(QueryError::InvalidMutationCombination(format!(
                            "{} property '{}' is assigned conflicting values",
                            side, key
                        )));
                    }
                }
            }
        }
        Intent::SetLabels(updates) | Intent::RemoveLabels(updates) => {
            if updates.is_empty() {
                return Err(QueryError::InvalidMutationCombination(format!(
                    "{} without any label",
                    intent.keyword().to_lowercase()
                )));
            }
        }
        Intent::Project(_) | Intent::Delete | Intent::Cache => {}
    }
    Ok(())
}

/// Keeps the first assignment of every key
fn deduplicated(assignments: &[(String, DataValue)]) -> Vec<&(String, DataValue)> {
    let mut seen = HashSet::new();
    assignments
        .iter()
        .filter(|(key, _)| seen.insert(key.as_str()))
        .collect()
}

/// State of a single compilation
struct Generation<'c> {
    hierarchy: &'c Hierarchy,
    resolver: &'c PathResolver<'c>,
    parameterize: bool,
    parameters: BTreeMap<String, DataValue>,
    required: HashSet<Node>,
    optional: HashSet<Node>,
    required_conditions: Vec<Expr>,
}

impl<'c> Generation<'c> {
    fn anchor(&self) -> &AnnotationAttribute {
        self.resolver.anchor()
    }

    fn require(&mut self, node: &Node) {
        let mut next = Some(node.clone());
        while let Some(node) = next {
            next = node.dependency();
            self.optional.remove(&node);
            if !self.required.insert(node) {
                break;
            }
        }
    }

    fn want(&mut self, node: &Node) {
        let mut next = Some(node.clone());
        while let Some(node) = next {
            if self.required.contains(&node) {
                break;
            }
            next = node.dependency();
            if !self.optional.insert(node) {
                break;
            }
        }
    }

    /// Literal values become parameters, or are inlined
    fn value(&mut self, value: DataValue) -> Expr {
        if self.parameterize {
            let name = format!("p{}", self.parameters.len());
            self.parameters.insert(name.clone(), value);
            Expr::Parameter(name)
        } else {
            Expr::Literal(value)
        }
    }

    /// Every node a filter refers to is required, a row lacking one of them is excluded
    fn add_filter(&mut self, filter: &Filter) -> Result<(), QueryError> {
        filter.validate()?;
        let mut nodes = Vec::new();
        let condition = self.condition(filter, &mut nodes)?;
        for node in nodes.iter() {
            self.require(node);
        }
        self.required_conditions.push(condition);
        Ok(())
    }

    fn condition(&mut self, filter: &Filter, nodes: &mut Vec<Node>) -> Result<Expr, QueryError> {
        let lhs = self.resolver.resolve(filter.path())?;
        match filter.value() {
            FilterValue::Path(other) => {
                let rhs = self.resolver.resolve(other)?;
                let mut left = self.operand(&lhs, nodes, true)?;
                let mut right = self.operand(&rhs, nodes, true)?;
                let mut operator = filter.operator();
                //either operand order yields the same condition
                if let Some(flipped) = operator.flipped() {
                    if left.to_string() > right.to_string() {
                        std::mem::swap(&mut left, &mut right);
                        operator = flipped;
                    }
                }
                Ok(Expr::compare(left, operator, right))
            }
            FilterValue::Literal(value) if lhs.leaf == Leaf::Subset => {
                self.subset_condition(filter, &lhs, value, nodes)
            }
            FilterValue::Literal(value) => {
                let left = self.operand(&lhs, nodes, true)?;
                match (filter.operator(), value) {
                    (Operator::Equals, DataValue::Null) => Ok(Expr::IsNull(Box::new(left), false)),
                    (Operator::NotEquals, DataValue::Null) => {
                        Ok(Expr::IsNull(Box::new(left), true))
                    }
                    (operator, value) => {
                        let right = self.value(value.clone());
                        Ok(Expr::compare(left, operator, right))
                    }
                }
            }
        }
    }

    fn subset_condition(
        &mut self,
        filter: &Filter,
        lhs: &ResolvedPath,
        value: &DataValue,
        nodes: &mut Vec<Node>,
    ) -> Result<Expr, QueryError> {
        let name = value.as_str().ok_or_else(|| {
            QueryError::InvalidFilter(format!(
                "Subset filter {} must compare against a subset name",
                filter
            ))
        })?;
        let annotation = lhs.annotation();
        let tier = self.hierarchy.tier(annotation.tier())?;
        let node = match tier.subset_side(name) {
            Some(PropertySide::Token) => Node::Annotation(annotation.clone()),
            Some(PropertySide::Type) => Node::Type(annotation.clone()),
            None => {
                return Err(QueryError::InvalidFilter(format!(
                    "'{}' is not a subset of tier '{}'",
                    name,
                    tier.name()
                )))
            }
        };
        let test = Expr::HasLabel(node.alias(), name.to_string());
        nodes.push(node);
        match filter.operator() {
            Operator::Equals => Ok(test),
            Operator::NotEquals => Ok(Expr::Not(Box::new(test))),
            operator => Err(QueryError::InvalidFilter(format!(
                "Subset filter {} only supports '==' and '!=', not '{}'",
                filter, operator
            ))),
        }
    }

    /// Turns a resolved path into an expression, collecting the nodes it refers to
    fn operand(
        &mut self,
        resolved: &ResolvedPath,
        nodes: &mut Vec<Node>,
        in_filter: bool,
    ) -> Result<Expr, QueryError> {
        let invalid = |msg: &str| QueryError::InvalidPath(resolved.path.to_string(), msg.to_string());
        let node = match &resolved.target {
            Target::Lower(parent, tier) => {
                if in_filter {
                    return Err(invalid("lower tier references can only be used in columns"));
                }
                nodes.push(Node::Annotation(parent.clone()));
                return self.collect_lower(resolved, parent, tier);
            }
            Target::Annotation(a) => match &resolved.leaf {
                Leaf::Property {
                    side: PropertySide::Type,
                    ..
                } => Node::Type(a.clone()),
                _ => Node::Annotation(a.clone()),
            },
            Target::Speaker(a) => Node::Speaker(a.clone()),
            Target::Discourse(a) => Node::Discourse(a.clone()),
            Target::Subannotation(a, name) => Node::Subannotation(a.clone(), name.clone()),
        };
        let alias = node.alias();
        nodes.push(node);
        match &resolved.leaf {
            Leaf::Node => Ok(Expr::Alias(alias)),
            Leaf::Property { name, .. } => Ok(Expr::property(alias, name.as_str())),
            Leaf::Duration => Ok(Expr::Duration(alias)),
            Leaf::Subset => Err(invalid("subset membership can only be filtered on")),
        }
    }

    /// Pattern comprehension collecting a property of all contained annotations of a lower tier
    fn collect_lower(
        &self,
        resolved: &ResolvedPath,
        parent: &AnnotationAttribute,
        tier: &str,
    ) -> Result<Expr, QueryError> {
        let depth = self.hierarchy.depth_between(tier, parent.tier())?;
        let alias = format!("{}_{}", parent.alias(), tier);
        let mut pattern = PathPattern::node(NodePattern::bound(parent.alias())).then(
            RelPattern::new(CONTAINED_BY, Direction::Incoming, Hops::new(depth)),
            NodePattern::new(
                alias.as_str(),
                vec![tier.to_string(), parent.corpus().to_string()],
            ),
        );
        let projection = match &resolved.leaf {
            Leaf::Property {
                name,
                side: PropertySide::Type,
                ..
            } => {
                let type_alias = format!("type_{}", alias);
                pattern = pattern.then(
                    RelPattern::new(IS_A, Direction::Outgoing, Hops::One),
                    NodePattern::new(
                        type_alias.as_str(),
                        vec![format!("{}_type", tier), parent.corpus().to_string()],
                    ),
                );
                Expr::property(type_alias, name.as_str())
            }
            Leaf::Property { name, .. } => Expr::property(alias, name.as_str()),
            Leaf::Duration => Expr::Duration(alias),
            Leaf::Node | Leaf::Subset => {
                return Err(QueryError::InvalidPath(
                    resolved.path.to_string(),
                    "lower tier references must select a property".to_string(),
                ))
            }
        };
        Ok(Expr::Collect(pattern, Box::new(projection)))
    }

    /// Resolves an output path and registers its nodes as optional
    fn output(&mut self, path: &AttributePath) -> Result<Expr, QueryError> {
        let resolved = self.resolver.resolve(path)?;
        let mut nodes = Vec::new();
        let expr = self.operand(&resolved, &mut nodes, false)?;
        for node in nodes.iter() {
            self.want(node);
        }
        Ok(expr)
    }

    fn projection(&mut self, projection: &Projection) -> Result<(Clause, Vec<String>), QueryError> {
        let mut items = Vec::new();
        for column in projection.columns.iter() {
            items.push(ReturnItem {
                expr: self.output(&column.path)?,
                name: Some(column.output_name.clone()),
            });
        }
        for aggregate in projection.aggregates.iter() {
            let argument = match &aggregate.path {
                Some(path) => self.output(path)?,
                None => Expr::Alias(self.anchor().alias()),
            };
            items.push(ReturnItem {
                expr: Expr::Function(aggregate.function.as_str(), vec![argument]),
                name: Some(aggregate.output_name.clone()),
            });
        }
        if items.is_empty() {
            items.push(ReturnItem {
                expr: Expr::Alias(self.anchor().alias()),
                name: None,
            });
        }
        let columns: Vec<String> = items.iter().map(|item| item.column_name()).collect();

        let mut order_by = Vec::new();
        for order in projection.order_by.iter() {
            let by_name = order
                .path
                .first()
                .filter(|_| order.path.len() == 1)
                .and_then(|name| columns.iter().find(|c| c.as_str() == name));
            let by_column = projection
                .columns
                .iter()
                .find(|column| column.path == order.path)
                .map(|column| &column.output_name);
            let expr = match by_name.or(by_column) {
                Some(name) => Expr::Column(name.clone()),
                None if projection.is_aggregate() => {
                    return Err(QueryError::InvalidPath(
                        order.path.to_string(),
                        "in aggregate mode results can only be ordered by a grouping column or an aggregate"
                            .to_string(),
                    ))
                }
                //after DISTINCT only the projected columns are in scope
                None if projection.distinct => {
                    return Err(QueryError::InvalidPath(
                        order.path.to_string(),
                        "distinct results can only be ordered by a returned column".to_string(),
                    ))
                }
                None => self.output(&order.path)?,
            };
            order_by.push(OrderItem {
                expr,
                descending: order.descending,
            });
        }

        let limit = if projection.is_aggregate() {
            if projection.limit.is_some() {
                debug!("ignoring row limit in aggregate mode");
            }
            None
        } else {
            projection.limit
        };
        Ok((
            Clause::Return {
                distinct: projection.distinct,
                items,
                order_by,
                limit,
            },
            columns,
        ))
    }

    fn set_properties(&mut self, updates: &PropertyUpdates) -> Vec<Clause> {
        let anchor = self.anchor().clone();
        if !updates.types.is_empty() {
            self.require(&Node::Type(anchor.clone()));
        }
        let mut sets = Vec::new();
        let mut removes = Vec::new();
        for (alias, assignments) in [
            (anchor.alias(), &updates.token),
            (anchor.type_alias(), &updates.types),
        ] {
            for (key, value) in deduplicated(assignments) {
                if value.is_null() {
                    removes.push(RemoveItem::Property(alias.clone(), key.clone()));
                } else {
                    let value = self.value(value.clone());
                    sets.push(SetItem::Property(alias.clone(), key.clone(), value));
                }
            }
        }
        let mut clauses = Vec::new();
        let has_sets = !sets.is_empty();
        if has_sets {
            clauses.push(Clause::Set(sets));
        }
        if !removes.is_empty() {
            if has_sets {
                //aliases are filled in by assemble()
                clauses.push(Clause::With(Vec::new()));
            }
            clauses.push(Clause::Remove(removes));
        }
        clauses
    }

    fn label_items<'u>(
        &mut self,
        updates: &'u LabelUpdates,
    ) -> impl Iterator<Item = (String, String)> + 'u {
        let anchor = self.anchor().clone();
        if !updates.types.is_empty() {
            self.require(&Node::Type(anchor.clone()));
        }
        let alias = anchor.alias();
        let type_alias = anchor.type_alias();
        let mut seen = HashSet::new();
        updates
            .token
            .iter()
            .map(move |label| (alias.clone(), label.clone()))
            .chain(
                updates
                    .types
                    .iter()
                    .map(move |label| (type_alias.clone(), label.clone())),
            )
            .filter(move |item| seen.insert(item.clone()))
    }

    /// Emits the pattern binding `node`, continuing from already bound nodes
    fn pattern(&self, node: &Node, bound: &HashSet<Node>) -> Result<PathPattern, QueryError> {
        let target = NodePattern::new(node.alias(), node.labels());
        let pattern = match node {
            Node::Annotation(a) if a.position() != 0 => {
                let position = a.position();
                let sign = position.signum();
                //nearest bound position on the anchor side, the base is always bound
                let from = (0..position.abs())
                    .rev()
                    .map(|distance| a.at(sign * distance))
                    .find(|candidate| bound.contains(&Node::Annotation(candidate.clone())))
                    .unwrap_or_else(|| a.base());
                let hops = (position - from.position()).unsigned_abs();
                let rel_type = match a.axis() {
                    Axis::Precedence => PRECEDES,
                    Axis::Pause => PRECEDES_PAUSE,
                };
                let direction = if position > 0 {
                    Direction::Outgoing
                } else {
                    Direction::Incoming
                };
                trace!(
                    alias = target.alias.as_str(),
                    from = from.alias().as_str(),
                    hops,
                    "chained relative position"
                );
                PathPattern::node(NodePattern::bound(from.alias())).then(
                    RelPattern::new(rel_type, direction, Hops::new(hops)),
                    target,
                )
            }
            Node::Annotation(a) => match a.parent() {
                Some(parent) => {
                    let depth = self.hierarchy.depth_between(parent.tier(), a.tier())?;
                    PathPattern::node(NodePattern::bound(parent.alias())).then(
                        RelPattern::new(CONTAINED_BY, Direction::Outgoing, Hops::new(depth)),
                        target,
                    )
                }
                None => PathPattern::node(target),
            },
            Node::Type(a) => PathPattern::node(NodePattern::bound(a.alias())).then(
                RelPattern::new(IS_A, Direction::Outgoing, Hops::One),
                target,
            ),
            Node::Speaker(a) => PathPattern::node(NodePattern::bound(a.alias())).then(
                RelPattern::new(SPOKEN_BY, Direction::Outgoing, Hops::One),
                target,
            ),
            Node::Discourse(a) => PathPattern::node(NodePattern::bound(a.alias())).then(
                RelPattern::new(SPOKEN_IN, Direction::Outgoing, Hops::One),
                target,
            ),
            Node::Subannotation(a, _) => PathPattern::node(NodePattern::bound(a.alias())).then(
                RelPattern::new(ANNOTATES, Direction::Incoming, Hops::One),
                target,
            ),
        };
        Ok(pattern)
    }

    /// Binds `node`, and its type node in the same pattern when that is part of the same group
    fn bind(
        &self,
        node: &Node,
        group: &HashSet<Node>,
        bound: &mut HashSet<Node>,
        order: &mut Vec<String>,
    ) -> Result<PathPattern, QueryError> {
        let mut pattern = self.pattern(node, bound)?;
        bound.insert(node.clone());
        order.push(node.alias());
        if let Node::Annotation(a) = node {
            let type_node = Node::Type(a.clone());
            if group.contains(&type_node) {
                pattern = pattern.then(
                    RelPattern::new(IS_A, Direction::Outgoing, Hops::One),
                    NodePattern::new(type_node.alias(), type_node.labels()),
                );
                bound.insert(type_node);
                order.push(a.type_alias());
            }
        }
        Ok(pattern)
    }

    /// Puts all clauses together in generation order
    fn assemble(
        &mut self,
        terminal: Vec<Clause>,
        mode: StatementMode,
    ) -> Result<Statement, QueryError> {
        let mut bound = HashSet::new();
        let mut order = Vec::new();
        let mut clauses = Vec::new();

        let mut patterns = Vec::new();
        for node in sorted(&self.required) {
            if !bound.contains(&node) {
                patterns.push(self.bind(&node, &self.required, &mut bound, &mut order)?);
            }
        }
        clauses.push(Clause::Match(patterns));
        if !self.required_conditions.is_empty() {
            clauses.push(Clause::Where(std::mem::take(&mut self.required_conditions)));
        }
        let required_aliases = order.clone();

        let mut later = Vec::new();
        for node in sorted(&self.optional) {
            if bound.contains(&node) {
                continue;
            }
            let pattern = self.bind(&node, &self.optional, &mut bound, &mut order)?;
            later.push(Clause::OptionalMatch(vec![pattern]));
        }
        let has_optional = !later.is_empty();
        for clause in terminal {
            match clause {
                Clause::With(aliases) if aliases.is_empty() => {
                    //placeholder, carries what the remainder of the terminal clauses need
                    later.push(Clause::With(Vec::new()));
                }
                clause => later.push(clause),
            }
        }
        if mode == StatementMode::Cache {
            later.push(Clause::With(order.clone()));
        }
        for i in 0..later.len() {
            if matches!(&later[i], Clause::With(aliases) if aliases.is_empty()) {
                let carried = self.carry_forward(&later[i + 1..], &order);
                later[i] = Clause::With(carried);
            }
        }
        if has_optional {
            let carried = self.carry_forward(&later, &required_aliases);
            clauses.push(Clause::With(carried));
        }
        clauses.extend(later);

        let mut statement = Statement::new();
        for clause in clauses {
            statement.push(clause);
        }
        Ok(statement)
    }

    /// The subset of `available` aliases (in binding order) that `clauses` refer to
    fn carry_forward(&self, clauses: &[Clause], available: &[String]) -> Vec<String> {
        let mut referenced = BTreeSet::new();
        for clause in clauses.iter() {
            clause.collect_aliases(&mut referenced);
        }
        let mut carried: Vec<String> = available
            .iter()
            .filter(|alias| referenced.contains(alias.as_str()))
            .cloned()
            .collect();
        if carried.is_empty() {
            carried.push(self.anchor().alias());
        }
        carried
    }
}
