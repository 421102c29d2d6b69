/*
    tierql - hierarchical annotation query compiler
        by the tierql developers

        Licensed under the GNU General Public License v3
*/

//! ## Introduction
//!
//! tierql compiles declarative queries over hierarchical, time-aligned linguistic annotation
//! graphs (utterances, words, syllables, phones, and sub-annotations such as bursts) into graph
//! pattern-matching statements, and runs them against a graph store, optionally split into one
//! statement per speaker or per discourse.
//!
//! **What can you do with this library?**
//!
//! * Describe the annotation tiers of a corpus in a [`Hierarchy`] (built in code or loaded from JSON)
//! * Build a [`QueryIntent`] anchored on a tier: filter on attributes of the anchor and of annotations
//!   related to it (preceding and following annotations, containing annotations, sub-annotations,
//!   speakers and discourses), project columns and aggregates, or request a mutation.
//! * Compile it to a [`CompiledStatement`]: statement text plus a parameter map.
//! * Execute it with any [`GraphStore`] implementation, directly or partitioned with a [`PartitionedQueryIntent`],
//!   and export the resulting [`ResultTable`] to CSV or JSON.
//!
//! Attribute paths are plain sequences of step names, for instance `["phone", "following", "label"]`
//! selects the label of the phone following the anchor phone, `["phone", "word", "begin"]` the start
//! of the word containing it.
//!
//! Main types:
//! * [`Corpus`]
//! * [`QueryIntent`]
//! * [`Filter`]
//! * [`Column`]
//! * [`Aggregate`]
//! * [`StatementCompiler`]
//! * [`CompiledStatement`]
//! * [`PartitionedQueryIntent`]
//! * [`ResultTable`]
//! * [`DataValue`]

mod compiler;
mod config;
mod corpus;
mod datavalue;
mod error;
mod file;
mod hierarchy;
mod intent;
mod partition;
mod path;
mod predicate;
mod results;
mod statement;

// Our internal crate structure is not very relevant to the outside world,
// expose all structs and traits in the root namespace, and be explicit about it:

pub use compiler::{CompiledStatement, StatementCompiler, StatementMode};
pub use config::{Config, Configurable};
pub use corpus::Corpus;
pub use datavalue::DataValue;
pub use error::{QueryError, QueryResult};
pub use hierarchy::{
    AnnotationTier, DeclaredProperty, Hierarchy, PropertyDeclaration, PropertySide,
    SubannotationDeclaration, ValueKind,
};
pub use intent::{
    Aggregate, AggregateFunction, Column, Intent, LabelUpdates, OrderBy, Projection,
    PropertyUpdates, QueryIntent,
};
pub use partition::{CancellationToken, GraphStore, PartitionKey, PartitionedQueryIntent};
pub use path::{
    AnnotationAttribute, AttributePath, Axis, Leaf, PathResolver, ResolvedPath, Target,
};
pub use predicate::{Alignment, Filter, FilterValue, Operator};
pub use results::ResultTable;
pub use statement::{
    Clause, Direction, Expr, Hops, NodePattern, OrderItem, PathPattern, RelPattern, RemoveItem,
    ReturnItem, SetItem, Statement,
};
