//! The hierarchy describes which annotation tiers exist in a corpus, how they contain each other,
//! and which properties, subsets and sub-annotations are declared on them.
//! It is static data supplied from outside; the compiler only reads it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::error::QueryError;
use crate::file::from_json_file;

/// The kind of value a declared property holds
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Boolean,
}

/// Properties and subsets are stored either on the individual annotation (the token)
/// or on the type node shared by all tokens with the same label.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertySide {
    Token,
    Type,
}

impl fmt::Display for PropertySide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::Type => write!(f, "type"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PropertyDeclaration {
    pub name: String,
    pub kind: ValueKind,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A resolved property lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredProperty<'a> {
    pub name: &'a str,
    pub kind: ValueKind,
    pub side: PropertySide,
}

/// Every tier carries these token properties without declaring them
const IMPLICIT_TOKEN_PROPERTIES: &[(&str, ValueKind)] = &[
    ("id", ValueKind::String),
    ("begin", ValueKind::Float),
    ("end", ValueKind::Float),
];

/// Every tier carries these type properties without declaring them
const IMPLICIT_TYPE_PROPERTIES: &[(&str, ValueKind)] = &[("label", ValueKind::String)];

/// Sub-annotations and speaker/discourse entities carry these implicitly
const IMPLICIT_SUBANNOTATION_PROPERTIES: &[(&str, ValueKind)] = &[
    ("id", ValueKind::String),
    ("begin", ValueKind::Float),
    ("end", ValueKind::Float),
    ("label", ValueKind::String),
];
const IMPLICIT_ENTITY_PROPERTIES: &[(&str, ValueKind)] = &[("name", ValueKind::String)];

fn find_property<'a>(
    implicit: &'static [(&'static str, ValueKind)],
    declared: &'a [PropertyDeclaration],
    name: &str,
) -> Option<(&'a str, ValueKind)> {
    implicit
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(n, kind)| (*n, *kind))
        .or_else(|| {
            declared
                .iter()
                .find(|p| p.name == name)
                .map(|p| (p.name.as_str(), p.kind))
        })
}

/// A sub-annotation (burst, voicing, ...) attaches to individual annotations of one tier, it is not a tier itself
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubannotationDeclaration {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
}

impl SubannotationDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.properties.push(PropertyDeclaration::new(name, kind));
        self
    }

    pub fn property(&self, name: &str) -> Option<(&str, ValueKind)> {
        find_property(IMPLICIT_SUBANNOTATION_PROPERTIES, &self.properties, name)
    }
}

/// A named level in the annotation hierarchy
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnnotationTier {
    pub name: String,
    #[serde(default)]
    pub token_properties: Vec<PropertyDeclaration>,
    #[serde(default)]
    pub type_properties: Vec<PropertyDeclaration>,
    #[serde(default)]
    pub token_subsets: Vec<String>,
    #[serde(default)]
    pub type_subsets: Vec<String>,
    #[serde(default)]
    pub subannotations: Vec<SubannotationDeclaration>,
}

impl AnnotationTier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token_properties: Vec::new(),
            type_properties: Vec::new(),
            token_subsets: Vec::new(),
            type_subsets: Vec::new(),
            subannotations: Vec::new(),
        }
    }

    pub fn with_token_property(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.token_properties
            .push(PropertyDeclaration::new(name, kind));
        self
    }

    pub fn with_type_property(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.type_properties.push(PropertyDeclaration::new(name, kind));
        self
    }

    pub fn with_token_subset(mut self, name: impl Into<String>) -> Self {
        self.token_subsets.push(name.into());
        self
    }

    pub fn with_type_subset(mut self, name: impl Into<String>) -> Self {
        self.type_subsets.push(name.into());
        self
    }

    pub fn with_subannotation(mut self, subannotation: SubannotationDeclaration) -> Self {
        self.subannotations.push(subannotation);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Looks up a token or type property, implicit ones included. Token properties take precedence.
    pub fn property(&self, name: &str) -> Option<DeclaredProperty> {
        if let Some((name, kind)) = find_property(IMPLICIT_TOKEN_PROPERTIES, &self.token_properties, name) {
            Some(DeclaredProperty {
                name,
                kind,
                side: PropertySide::Token,
            })
        } else {
            find_property(IMPLICIT_TYPE_PROPERTIES, &self.type_properties, name).map(
                |(name, kind)| DeclaredProperty {
                    name,
                    kind,
                    side: PropertySide::Type,
                },
            )
        }
    }

    /// Returns all properties, implicit ones first
    pub fn properties(&self) -> Vec<DeclaredProperty> {
        let token = IMPLICIT_TOKEN_PROPERTIES
            .iter()
            .map(|(name, kind)| (*name, *kind))
            .chain(self.token_properties.iter().map(|p| (p.name.as_str(), p.kind)))
            .map(|(name, kind)| DeclaredProperty {
                name,
                kind,
                side: PropertySide::Token,
            });
        let types = IMPLICIT_TYPE_PROPERTIES
            .iter()
            .map(|(name, kind)| (*name, *kind))
            .chain(self.type_properties.iter().map(|p| (p.name.as_str(), p.kind)))
            .map(|(name, kind)| DeclaredProperty {
                name,
                kind,
                side: PropertySide::Type,
            });
        token.chain(types).collect()
    }

    /// On which side is this subset defined, if at all?
    pub fn subset_side(&self, name: &str) -> Option<PropertySide> {
        if self.token_subsets.iter().any(|s| s == name) {
            Some(PropertySide::Token)
        } else if self.type_subsets.iter().any(|s| s == name) {
            Some(PropertySide::Type)
        } else {
            None
        }
    }

    pub fn subannotation(&self, name: &str) -> Option<&SubannotationDeclaration> {
        self.subannotations.iter().find(|s| s.name == name)
    }
}

/// The full static description of a corpus' annotation tiers, ordered from highest (largest span) to lowest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Hierarchy {
    corpus: String,
    tiers: Vec<AnnotationTier>,
    #[serde(default)]
    speaker_properties: Vec<PropertyDeclaration>,
    #[serde(default)]
    discourse_properties: Vec<PropertyDeclaration>,
}

impl Hierarchy {
    /// Instantiates an empty hierarchy for the named corpus, add tiers from highest to lowest with [`Self::with_tier()`]
    pub fn new(corpus: impl Into<String>) -> Self {
        Self {
            corpus: corpus.into(),
            tiers: Vec::new(),
            speaker_properties: Vec::new(),
            discourse_properties: Vec::new(),
        }
    }

    /// Adds a tier directly below the current lowest tier
    pub fn with_tier(mut self, tier: AnnotationTier) -> Result<Self, QueryError> {
        if self.tiers.iter().any(|t| t.name == tier.name) {
            return Err(QueryError::HierarchyError(format!(
                "Tier '{}' is declared twice",
                tier.name
            )));
        }
        self.tiers.push(tier);
        Ok(self)
    }

    pub fn with_speaker_property(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.speaker_properties
            .push(PropertyDeclaration::new(name, kind));
        self
    }

    pub fn with_discourse_property(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.discourse_properties
            .push(PropertyDeclaration::new(name, kind));
        self
    }

    /// Loads a hierarchy from a JSON file and validates it
    pub fn from_file(filename: &str, config: &Config) -> Result<Self, QueryError> {
        let hierarchy: Self = from_json_file(filename, config, "Reading hierarchy from file")?;
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    /// Checks the invariants that can not be enforced by the builder (deserialised hierarchies)
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.corpus.is_empty() {
            return Err(QueryError::HierarchyError(
                "Hierarchy has no corpus name".to_string(),
            ));
        }
        if self.tiers.is_empty() {
            return Err(QueryError::HierarchyError(
                "Hierarchy has no tiers".to_string(),
            ));
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if self.tiers[..i].iter().any(|t| t.name == tier.name) {
                return Err(QueryError::HierarchyError(format!(
                    "Tier '{}' is declared twice",
                    tier.name
                )));
            }
        }
        Ok(())
    }

    pub fn corpus(&self) -> &str {
        self.corpus.as_str()
    }

    pub fn tiers_highest_to_lowest(&self) -> impl Iterator<Item = &AnnotationTier> {
        self.tiers.iter()
    }

    pub fn highest(&self) -> Option<&AnnotationTier> {
        self.tiers.first()
    }

    pub fn lowest(&self) -> Option<&AnnotationTier> {
        self.tiers.last()
    }

    pub fn has_tier(&self, name: &str) -> bool {
        self.tiers.iter().any(|t| t.name == name)
    }

    pub fn tier(&self, name: &str) -> Result<&AnnotationTier, QueryError> {
        self.tiers
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| QueryError::UnknownTier(name.to_string()))
    }

    /// Index of the tier, 0 is the highest
    fn index_of(&self, name: &str) -> Result<usize, QueryError> {
        self.tiers
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| QueryError::UnknownTier(name.to_string()))
    }

    /// Returns the tier directly containing the given one, `None` for the highest tier
    pub fn parent_of(&self, name: &str) -> Result<Option<&AnnotationTier>, QueryError> {
        let index = self.index_of(name)?;
        Ok(index.checked_sub(1).map(|i| &self.tiers[i]))
    }

    /// Returns all tiers below the given one, nearest first
    pub fn lower_tiers_of(&self, name: &str) -> Result<&[AnnotationTier], QueryError> {
        let index = self.index_of(name)?;
        Ok(&self.tiers[index + 1..])
    }

    /// Returns all tiers above the given one, highest first
    pub fn higher_tiers_of(&self, name: &str) -> Result<&[AnnotationTier], QueryError> {
        let index = self.index_of(name)?;
        Ok(&self.tiers[..index])
    }

    /// Is `name` a tier strictly above `other`?
    pub fn is_higher(&self, name: &str, other: &str) -> Result<bool, QueryError> {
        Ok(self.index_of(name)? < self.index_of(other)?)
    }

    /// Number of containment edges between a lower and a higher tier
    pub fn depth_between(&self, lower: &str, higher: &str) -> Result<usize, QueryError> {
        let lower_index = self.index_of(lower)?;
        let higher_index = self.index_of(higher)?;
        if higher_index >= lower_index {
            return Err(QueryError::HierarchyError(format!(
                "Tier '{}' is not contained in tier '{}'",
                lower, higher
            )));
        }
        Ok(lower_index - higher_index)
    }

    pub fn subannotations_of(&self, name: &str) -> Result<&[SubannotationDeclaration], QueryError> {
        Ok(&self.tier(name)?.subannotations)
    }

    /// Returns the names of all subsets defined on a tier, token subsets first
    pub fn subset_names(&self, name: &str) -> Result<Vec<(&str, PropertySide)>, QueryError> {
        let tier = self.tier(name)?;
        Ok(tier
            .token_subsets
            .iter()
            .map(|s| (s.as_str(), PropertySide::Token))
            .chain(
                tier.type_subsets
                    .iter()
                    .map(|s| (s.as_str(), PropertySide::Type)),
            )
            .collect())
    }

    pub fn declared_properties(&self, name: &str) -> Result<Vec<DeclaredProperty>, QueryError> {
        Ok(self.tier(name)?.properties())
    }

    pub fn speaker_property(&self, name: &str) -> Option<(&str, ValueKind)> {
        find_property(IMPLICIT_ENTITY_PROPERTIES, &self.speaker_properties, name)
    }

    pub fn discourse_property(&self, name: &str) -> Option<(&str, ValueKind)> {
        find_property(IMPLICIT_ENTITY_PROPERTIES, &self.discourse_properties, name)
    }
}
