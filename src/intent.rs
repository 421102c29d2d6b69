//! A [`QueryIntent`] accumulates everything one query wants: the anchor tier, filters, and exactly one
//! output [`Intent`] (a projection or one kind of mutation). Projection and mutation are mutually exclusive,
//! the builder methods replace one with the other so that a malformed combination can not be constructed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::datavalue::DataValue;
use crate::path::AttributePath;
use crate::predicate::{Filter, Operator};

/// A requested output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub path: AttributePath,
    pub output_name: String,
}

impl Column {
    pub fn new(path: impl Into<AttributePath>, output_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            output_name: output_name.into(),
        }
    }

    /// Names the column after its path, `phone.following.label` becomes `phone_following_label`
    pub fn from_path(path: impl Into<AttributePath>) -> Self {
        let path = path.into();
        let output_name = path.iter().collect::<Vec<_>>().join("_");
        Self { path, output_name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    Average,
    Min,
    Max,
    Stdev,
}

impl AggregateFunction {
    /// Function name in the statement language
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Average => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Stdev => "stDev",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An aggregate over all matched anchors (or over an attribute of them).
/// In aggregate mode the regular columns act as grouping keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub path: Option<AttributePath>,
    pub output_name: String,
}

impl Aggregate {
    /// Counts matched anchors
    pub fn count(output_name: impl Into<String>) -> Self {
        Self {
            function: AggregateFunction::Count,
            path: None,
            output_name: output_name.into(),
        }
    }

    pub fn new(
        function: AggregateFunction,
        path: impl Into<AttributePath>,
        output_name: impl Into<String>,
    ) -> Self {
        Self {
            function,
            path: Some(path.into()),
            output_name: output_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub path: AttributePath,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Projection {
    pub columns: Vec<Column>,
    pub aggregates: Vec<Aggregate>,
    pub order_by: Vec<OrderBy>,
    /// Row limit, ignored in aggregate mode
    pub limit: Option<usize>,
    pub distinct: bool,
}

impl Projection {
    pub fn is_aggregate(&self) -> bool {
        !self.aggregates.is_empty()
    }
}

/// Property assignments on the anchor (token) and its type node. A `Null` value removes the property.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyUpdates {
    pub token: Vec<(String, DataValue)>,
    pub types: Vec<(String, DataValue)>,
}

impl PropertyUpdates {
    pub fn is_empty(&self) -> bool {
        self.token.is_empty() && self.types.is_empty()
    }
}

/// Subset labels on the anchor (token) and its type node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelUpdates {
    pub token: Vec<String>,
    pub types: Vec<String>,
}

impl LabelUpdates {
    pub fn is_empty(&self) -> bool {
        self.token.is_empty() && self.types.is_empty()
    }
}

/// What a compiled statement does with the matched annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    Project(Projection),
    SetProperties(PropertyUpdates),
    SetLabels(LabelUpdates),
    RemoveLabels(LabelUpdates),
    Delete,
    /// Results are streamed to a side cache by the executor rather than returned
    Cache,
}

impl Default for Intent {
    fn default() -> Self {
        Self::Project(Projection::default())
    }
}

impl Intent {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Project(_))
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Project(..) => "PROJECT",
            Self::SetProperties(..) => "SET PROPERTIES",
            Self::SetLabels(..) => "SET LABELS",
            Self::RemoveLabels(..) => "REMOVE LABELS",
            Self::Delete => "DELETE",
            Self::Cache => "CACHE",
        }
    }
}

/// The full intent of a single query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    tier: String,
    discourse: Option<String>,
    filters: Vec<Filter>,
    intent: Intent,
}

impl QueryIntent {
    /// Instantiates a query anchored on annotations of the given tier
    pub fn new(tier: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            discourse: None,
            filters: Vec::new(),
            intent: Intent::default(),
        }
    }

    pub fn tier(&self) -> &str {
        self.tier.as_str()
    }

    pub fn discourse(&self) -> Option<&str> {
        self.discourse.as_deref()
    }

    /// Iterates over all filters
    pub fn filters(&self) -> std::slice::Iter<Filter> {
        self.filters.iter()
    }

    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    /// Returns the projection, `None` in mutation mode
    pub fn projection(&self) -> Option<&Projection> {
        match &self.intent {
            Intent::Project(projection) => Some(projection),
            _ => None,
        }
    }

    pub fn is_mutation(&self) -> bool {
        self.intent.is_mutation()
    }

    /// Switches to projection mode if needed (dropping any mutation) and returns the projection
    fn projection_mut(&mut self) -> &mut Projection {
        if self.intent.is_mutation() {
            self.intent = Intent::default();
        }
        match &mut self.intent {
            Intent::Project(projection) => projection,
            _ => unreachable!("intent was just reset to a projection"),
        }
    }

    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter(filter);
        self
    }

    /// Restricts the query to annotations of a single discourse
    pub fn in_discourse(&mut self, discourse: impl Into<String>) -> &mut Self {
        self.discourse = Some(discourse.into());
        self
    }

    pub fn with_discourse(mut self, discourse: impl Into<String>) -> Self {
        self.in_discourse(discourse);
        self
    }

    /// All filters, including the one implied by the discourse scope
    pub fn effective_filters(&self) -> Vec<Filter> {
        let mut filters = self.filters.clone();
        if let Some(discourse) = &self.discourse {
            filters.push(Filter::new(
                AttributePath::new([self.tier.as_str(), "discourse", "name"]),
                Operator::Equals,
                discourse.as_str(),
            ));
        }
        filters
    }

    pub fn column(&mut self, column: Column) -> &mut Self {
        self.projection_mut().columns.push(column);
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.column(column);
        self
    }

    /// Adds a grouping key, in aggregate mode this is just a column
    pub fn group_by(&mut self, column: Column) -> &mut Self {
        self.column(column)
    }

    pub fn with_group_by(self, column: Column) -> Self {
        self.with_column(column)
    }

    pub fn aggregate(&mut self, aggregate: Aggregate) -> &mut Self {
        self.projection_mut().aggregates.push(aggregate);
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate(aggregate);
        self
    }

    pub fn order_by(&mut self, path: impl Into<AttributePath>, descending: bool) -> &mut Self {
        self.projection_mut().order_by.push(OrderBy {
            path: path.into(),
            descending,
        });
        self
    }

    pub fn with_order_by(mut self, path: impl Into<AttributePath>, descending: bool) -> Self {
        self.order_by(path, descending);
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.projection_mut().limit = Some(limit);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit(limit);
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.projection_mut().distinct = true;
        self
    }

    pub fn with_distinct(mut self) -> Self {
        self.distinct();
        self
    }

    fn property_updates_mut(&mut self) -> &mut PropertyUpdates {
        if !matches!(self.intent, Intent::SetProperties(_)) {
            self.intent = Intent::SetProperties(PropertyUpdates::default());
        }
        match &mut self.intent {
            Intent::SetProperties(updates) => updates,
            _ => unreachable!("intent was just set to property updates"),
        }
    }

    /// Sets token properties on every matched anchor, replacing any projection or other mutation kind.
    /// A `Null` value removes the property.
    pub fn set_properties<I, K, V>(&mut self, properties: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DataValue>,
    {
        let updates = self.property_updates_mut();
        updates
            .token
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets type properties on the type node of every matched anchor
    pub fn set_type_properties<I, K, V>(&mut self, properties: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DataValue>,
    {
        let updates = self.property_updates_mut();
        updates
            .types
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn label_updates_mut(&mut self, remove: bool) -> &mut LabelUpdates {
        let matching = match &self.intent {
            Intent::SetLabels(_) => !remove,
            Intent::RemoveLabels(_) => remove,
            _ => false,
        };
        if !matching {
            self.intent = if remove {
                Intent::RemoveLabels(LabelUpdates::default())
            } else {
                Intent::SetLabels(LabelUpdates::default())
            };
        }
        match &mut self.intent {
            Intent::SetLabels(updates) | Intent::RemoveLabels(updates) => updates,
            _ => unreachable!("intent was just set to label updates"),
        }
    }

    /// Adds subset labels to every matched anchor
    pub fn set_labels<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_updates_mut(false)
            .token
            .extend(labels.into_iter().map(|l| l.into()));
        self
    }

    /// Adds subset labels to the type node of every matched anchor
    pub fn set_type_labels<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_updates_mut(false)
            .types
            .extend(labels.into_iter().map(|l| l.into()));
        self
    }

    pub fn remove_labels<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_updates_mut(true)
            .token
            .extend(labels.into_iter().map(|l| l.into()));
        self
    }

    pub fn remove_type_labels<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_updates_mut(true)
            .types
            .extend(labels.into_iter().map(|l| l.into()));
        self
    }

    /// Deletes every matched anchor
    pub fn delete(&mut self) -> &mut Self {
        self.intent = Intent::Delete;
        self
    }

    pub fn with_delete(mut self) -> Self {
        self.delete();
        self
    }

    pub fn cache(&mut self) -> &mut Self {
        self.intent = Intent::Cache;
        self
    }

    pub fn with_cache(mut self) -> Self {
        self.cache();
        self
    }
}
