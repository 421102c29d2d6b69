//! Attribute paths and their resolution against the [`Hierarchy`].
//!
//! An [`AttributePath`] is a plain sequence of step names starting at a tier, for instance
//! `["phone", "following", "following", "label"]`. The [`PathResolver`] turns it into a
//! [`ResolvedPath`]: the annotation (or related entity) the path ends on, expressed as an
//! [`AnnotationAttribute`] with a signed position relative to the query anchor, plus the
//! terminal [`Leaf`]. All validity checks happen here, ahead of statement generation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::config::Config;
use crate::error::QueryError;
use crate::hierarchy::{Hierarchy, PropertySide, ValueKind};

pub const PREVIOUS: &str = "previous";
pub const FOLLOWING: &str = "following";
pub const PREVIOUS_PAUSE: &str = "previous_pause";
pub const FOLLOWING_PAUSE: &str = "following_pause";
pub const SPEAKER: &str = "speaker";
pub const DISCOURSE: &str = "discourse";
pub const SUBSET: &str = "subset";
pub const DURATION: &str = "duration";

/// A chain of step names, starting at a tier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath(SmallVec<[String; 4]>);

impl AttributePath {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(steps.into_iter().map(|s| s.into()).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first step, normally the anchor tier
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(|s| s.as_str())
    }

    /// The final step
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(|s| s.as_str())
    }

    /// Returns a copy with one more step appended
    pub fn join(&self, step: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.0.push(step.into());
        path
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl<const N: usize> From<[&str; N]> for AttributePath {
    fn from(steps: [&str; N]) -> Self {
        Self::new(steps)
    }
}

impl From<&[&str]> for AttributePath {
    fn from(steps: &[&str]) -> Self {
        Self::new(steps.iter().copied())
    }
}

impl From<Vec<String>> for AttributePath {
    fn from(steps: Vec<String>) -> Self {
        Self::new(steps)
    }
}

/// Parses a dotted path like `phone.following.label`
impl From<&str> for AttributePath {
    fn from(dotted: &str) -> Self {
        Self::new(dotted.split('.').filter(|s| !s.is_empty()))
    }
}

/// Along which edge type positions are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// Regular precedence between annotations of the same tier
    Precedence,
    /// Precedence that skips over pause annotations
    Pause,
}

/// A reference to an annotation of a specific tier at a position relative to a reference annotation.
///
/// The anchor has no enclosing reference and position 0. An annotation reached by containment
/// (for instance the word containing the anchor phone) has the annotation it was reached from as
/// its enclosing reference, and its position is counted relative to that containing annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationAttribute {
    tier: String,
    position: isize,
    axis: Axis,
    corpus: String,
    parent: Option<Arc<AnnotationAttribute>>,
}

impl AnnotationAttribute {
    /// Creates the anchor reference for a query
    pub fn anchor(tier: impl Into<String>, corpus: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            position: 0,
            axis: Axis::Precedence,
            corpus: corpus.into(),
            parent: None,
        }
    }

    /// The annotation of the higher `tier` that contains this one
    pub fn contained_by(&self, tier: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            position: 0,
            axis: Axis::Precedence,
            corpus: self.corpus.clone(),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Moves along the given axis, negative is towards preceding annotations
    pub fn moved(&self, delta: isize, axis: Axis) -> Self {
        let position = self.position + delta;
        Self {
            tier: self.tier.clone(),
            position,
            axis: if position == 0 { Axis::Precedence } else { axis },
            corpus: self.corpus.clone(),
            parent: self.parent.clone(),
        }
    }

    /// Returns the same reference at another position
    pub fn at(&self, position: isize) -> Self {
        Self {
            position,
            axis: if position == 0 {
                Axis::Precedence
            } else {
                self.axis
            },
            ..self.clone()
        }
    }

    /// The position-0 annotation this one is counted from
    pub fn base(&self) -> Self {
        self.at(0)
    }

    pub fn tier(&self) -> &str {
        self.tier.as_str()
    }

    pub fn position(&self) -> isize {
        self.position
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn corpus(&self) -> &str {
        self.corpus.as_str()
    }

    pub fn parent(&self) -> Option<&AnnotationAttribute> {
        self.parent.as_deref()
    }

    pub fn is_anchor(&self) -> bool {
        self.parent.is_none() && self.position == 0
    }

    /// Number of containment steps between the anchor and this reference
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map(|p| p.depth() + 1).unwrap_or(0)
    }

    fn segment(&self) -> String {
        let prefix = match self.axis {
            Axis::Precedence => "",
            Axis::Pause => "pause",
        };
        if self.position < 0 {
            format!("prev{}{}_{}", prefix, -self.position, self.tier)
        } else if self.position > 0 {
            format!("foll{}{}_{}", prefix, self.position, self.tier)
        } else {
            self.tier.clone()
        }
    }

    /// The variable name binding this annotation in a compiled statement.
    /// Equal references always produce equal aliases.
    pub fn alias(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}_{}", parent.alias(), self.segment()),
            None => format!("node_{}", self.segment()),
        }
    }

    /// The variable name binding the type node of this annotation
    pub fn type_alias(&self) -> String {
        format!("type_{}", self.alias())
    }
}

/// The entity a path ends on
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Annotation(AnnotationAttribute),
    /// A named sub-annotation attached to an annotation
    Subannotation(AnnotationAttribute, String),
    /// The speaker of an annotation
    Speaker(AnnotationAttribute),
    /// The discourse an annotation belongs to
    Discourse(AnnotationAttribute),
    /// All annotations of a lower tier contained in an annotation, only usable in projections
    Lower(AnnotationAttribute, String),
}

impl Target {
    /// The annotation the target is attached to (or is)
    pub fn annotation(&self) -> &AnnotationAttribute {
        match self {
            Self::Annotation(a)
            | Self::Subannotation(a, _)
            | Self::Speaker(a)
            | Self::Discourse(a)
            | Self::Lower(a, _) => a,
        }
    }
}

/// What a path selects on its target
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// The node itself
    Node,
    Property {
        name: String,
        side: PropertySide,
        kind: ValueKind,
    },
    /// Computed as `end - begin`
    Duration,
    /// Subset membership, the subset name is supplied by the filter value
    Subset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub path: AttributePath,
    pub target: Target,
    pub leaf: Leaf,
}

impl ResolvedPath {
    pub fn annotation(&self) -> &AnnotationAttribute {
        self.target.annotation()
    }

    /// Does the final step select `begin` or `end`?
    pub fn boundary(&self) -> Option<&str> {
        match &self.leaf {
            Leaf::Property { name, .. } if name == "begin" || name == "end" => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Resolves attribute paths relative to a query anchor
pub struct PathResolver<'a> {
    hierarchy: &'a Hierarchy,
    config: &'a Config,
    anchor: AnnotationAttribute,
}

impl<'a> PathResolver<'a> {
    pub fn new(
        hierarchy: &'a Hierarchy,
        config: &'a Config,
        anchor_tier: &str,
    ) -> Result<Self, QueryError> {
        let tier = hierarchy.tier(anchor_tier)?;
        Ok(Self {
            hierarchy,
            config,
            anchor: AnnotationAttribute::anchor(tier.name(), hierarchy.corpus()),
        })
    }

    pub fn anchor(&self) -> &AnnotationAttribute {
        &self.anchor
    }

    fn invalid(path: &AttributePath, msg: impl Into<String>) -> QueryError {
        QueryError::InvalidPath(path.to_string(), msg.into())
    }

    /// Attaches `tier` relative to `from`: the containing annotation for higher tiers,
    /// the collected contained annotations for lower tiers
    fn relate(
        &self,
        path: &AttributePath,
        from: &AnnotationAttribute,
        tier: &str,
    ) -> Result<Target, QueryError> {
        if tier == from.tier() {
            Err(Self::invalid(
                path,
                format!("already at tier '{}', use previous/following to move", tier),
            ))
        } else if self.hierarchy.is_higher(tier, from.tier())? {
            Ok(Target::Annotation(from.contained_by(tier)))
        } else {
            Ok(Target::Lower(from.clone(), tier.to_string()))
        }
    }

    pub fn resolve(&self, path: &AttributePath) -> Result<ResolvedPath, QueryError> {
        let mut steps = path.iter().peekable();
        let first = steps
            .next()
            .ok_or_else(|| Self::invalid(path, "path is empty"))?;
        let first_tier = self.hierarchy.tier(first)?;
        let mut target = if first_tier.name() == self.anchor.tier() {
            Target::Annotation(self.anchor.clone())
        } else {
            self.relate(path, &self.anchor, first_tier.name())?
        };
        let mut leaf = Leaf::Node;

        while let Some(step) = steps.next() {
            if leaf != Leaf::Node {
                return Err(Self::invalid(
                    path,
                    format!("unexpected step '{}' after terminal step", step),
                ));
            }
            target = match target {
                Target::Annotation(current) => match step {
                    PREVIOUS | FOLLOWING => {
                        if current.axis() == Axis::Pause {
                            return Err(Self::invalid(
                                path,
                                "can not mix pause-skipping and regular precedence",
                            ));
                        }
                        let delta = if step == PREVIOUS { -1 } else { 1 };
                        Target::Annotation(current.moved(delta, Axis::Precedence))
                    }
                    PREVIOUS_PAUSE | FOLLOWING_PAUSE => {
                        if current.tier() != self.config.pause_tier() {
                            return Err(Self::invalid(
                                path,
                                format!(
                                    "pause-skipping steps are only valid on tier '{}'",
                                    self.config.pause_tier()
                                ),
                            ));
                        }
                        if current.axis() == Axis::Precedence && current.position() != 0 {
                            return Err(Self::invalid(
                                path,
                                "can not mix pause-skipping and regular precedence",
                            ));
                        }
                        let delta = if step == PREVIOUS_PAUSE { -1 } else { 1 };
                        Target::Annotation(current.moved(delta, Axis::Pause))
                    }
                    SPEAKER | DISCOURSE => {
                        let entity = if step == SPEAKER {
                            Target::Speaker(current)
                        } else {
                            Target::Discourse(current)
                        };
                        let name = steps.next().unwrap_or("name");
                        let lookup = if step == SPEAKER {
                            self.hierarchy.speaker_property(name)
                        } else {
                            self.hierarchy.discourse_property(name)
                        };
                        let (name, kind) = lookup.ok_or_else(|| {
                            Self::invalid(path, format!("no {} property '{}'", step, name))
                        })?;
                        leaf = Leaf::Property {
                            name: name.to_string(),
                            side: PropertySide::Token,
                            kind,
                        };
                        entity
                    }
                    SUBSET => {
                        leaf = Leaf::Subset;
                        Target::Annotation(current)
                    }
                    DURATION => {
                        leaf = Leaf::Duration;
                        Target::Annotation(current)
                    }
                    step if self.hierarchy.has_tier(step) => self.relate(path, &current, step)?,
                    step => {
                        let tier = self.hierarchy.tier(current.tier())?;
                        if let Some(subannotation) = tier.subannotation(step) {
                            if let Some(property) = steps.next() {
                                let (name, kind) =
                                    subannotation.property(property).ok_or_else(|| {
                                        Self::invalid(
                                            path,
                                            format!(
                                                "sub-annotation '{}' has no property '{}'",
                                                step, property
                                            ),
                                        )
                                    })?;
                                leaf = Leaf::Property {
                                    name: name.to_string(),
                                    side: PropertySide::Token,
                                    kind,
                                };
                            }
                            Target::Subannotation(current, subannotation.name.clone())
                        } else if let Some(property) = tier.property(step) {
                            leaf = Leaf::Property {
                                name: property.name.to_string(),
                                side: property.side,
                                kind: property.kind,
                            };
                            Target::Annotation(current)
                        } else {
                            return Err(Self::invalid(
                                path,
                                format!(
                                    "'{}' is not a tier, property or sub-annotation of '{}'",
                                    step,
                                    current.tier()
                                ),
                            ));
                        }
                    }
                },
                Target::Lower(parent, tier_name) => {
                    let tier = self.hierarchy.tier(&tier_name)?;
                    if step == DURATION {
                        leaf = Leaf::Duration;
                    } else {
                        let property = tier.property(step).ok_or_else(|| {
                            Self::invalid(
                                path,
                                format!("'{}' is not a property of '{}'", step, tier_name),
                            )
                        })?;
                        leaf = Leaf::Property {
                            name: property.name.to_string(),
                            side: property.side,
                            kind: property.kind,
                        };
                    }
                    Target::Lower(parent, tier_name)
                }
                Target::Subannotation(..) | Target::Speaker(..) | Target::Discourse(..) => {
                    return Err(Self::invalid(
                        path,
                        format!("unexpected step '{}' after terminal step", step),
                    ));
                }
            };
        }

        if let Target::Lower(_, tier) = &target {
            if leaf == Leaf::Node {
                return Err(Self::invalid(
                    path,
                    format!("lower tier '{}' must be followed by a property", tier),
                ));
            }
        }
        trace!(path = %path, ?target, ?leaf, "resolved attribute path");
        Ok(ResolvedPath {
            path: path.clone(),
            target,
            leaf,
        })
    }
}
