//! Partitioned execution: one logical query is run once per speaker or discourse and the results
//! are merged. Each partition's statement only matches within one partition value, which bounds
//! the size of the pattern the store has to materialise.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::compiler::CompiledStatement;
use crate::config::Configurable;
use crate::corpus::Corpus;
use crate::error::QueryError;
use crate::intent::QueryIntent;
use crate::path::{AttributePath, DISCOURSE, SPEAKER};
use crate::predicate::{Filter, Operator};
use crate::results::ResultTable;

/// The external store collaborator: lists partition values and executes compiled statements.
/// Errors are passed on to the caller as they are, retrying is up to the caller.
pub trait GraphStore {
    /// Names of all speakers in the corpus
    fn speakers(&self) -> Result<Vec<String>, QueryError>;

    /// Names of all discourses in the corpus
    fn discourses(&self) -> Result<Vec<String>, QueryError>;

    /// Executes a statement with its parameters bound. Blocking.
    fn execute(&self, statement: &CompiledStatement) -> Result<ResultTable, QueryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKey {
    Speaker,
    Discourse,
}

impl PartitionKey {
    /// The path step that leads from an annotation to the partition entity
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speaker => SPEAKER,
            Self::Discourse => DISCOURSE,
        }
    }

    /// Lists all values of this key in the store
    pub fn values<S: GraphStore + ?Sized>(&self, store: &S) -> Result<Vec<String>, QueryError> {
        match self {
            Self::Speaker => store.speakers(),
            Self::Discourse => store.discourses(),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cooperative cancellation signal, cheap to clone and share between threads.
/// It is checked before each partition starts, a running partition is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A [`QueryIntent`] that is executed once per partition value
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionedQueryIntent {
    base: QueryIntent,
    key: PartitionKey,
}

impl PartitionedQueryIntent {
    pub fn new(base: QueryIntent, key: PartitionKey) -> Self {
        Self { base, key }
    }

    pub fn base(&self) -> &QueryIntent {
        &self.base
    }

    pub fn key(&self) -> PartitionKey {
        self.key
    }

    /// The query for a single partition value: the base query plus one filter scoping the anchor
    pub fn partition(&self, value: &str) -> QueryIntent {
        self.base.clone().with_filter(Filter::new(
            AttributePath::new([self.base.tier(), self.key.as_str(), "name"]),
            Operator::Equals,
            value,
        ))
    }

    /// Lists the partition values and builds one query per value, in listing order
    pub fn expand<S: GraphStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<(String, QueryIntent)>, QueryError> {
        let values = self.key.values(store)?;
        debug!(key = %self.key, partitions = values.len(), "expanding partitioned query");
        Ok(values
            .into_iter()
            .map(|value| {
                let intent = self.partition(&value);
                (value, intent)
            })
            .collect())
    }

    /// Compiles and executes every partition, then merges the results in listing order.
    ///
    /// The column header is taken from the first partition that returned at least one row, rows of
    /// later partitions are rearranged to it by column name. When no partition returned rows, the
    /// compiled column names are used. The first failing partition (in listing order) aborts the
    /// remaining ones and its error is returned, wrapped in [`QueryError::PartitionError`].
    pub fn execute<S>(
        &self,
        corpus: &Corpus,
        store: &S,
        cancel: &CancellationToken,
    ) -> Result<ResultTable, QueryError>
    where
        S: GraphStore + Sync + ?Sized,
    {
        let partitions = self.expand(store)?;
        //compilation errors are the same for every partition, surface them before anything runs
        let compiled = partitions
            .iter()
            .map(|(value, intent)| Ok((value.as_str(), corpus.compile(intent)?)))
            .collect::<Result<Vec<_>, QueryError>>()?;
        let fallback_columns = match compiled.first() {
            Some((_, statement)) => statement.columns().to_vec(),
            None => corpus.compile(&self.base)?.columns().to_vec(),
        };

        let tables = if corpus.config().parallel_partitions() {
            self.execute_parallel(&compiled, store, cancel)?
        } else {
            self.execute_sequential(&compiled, store, cancel)?
        };
        Ok(merge(tables, fallback_columns))
    }

    fn execute_sequential<S>(
        &self,
        compiled: &[(&str, CompiledStatement)],
        store: &S,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultTable>, QueryError>
    where
        S: GraphStore + ?Sized,
    {
        let mut tables = Vec::with_capacity(compiled.len());
        for (value, statement) in compiled.iter() {
            if cancel.is_cancelled() {
                warn!(partition = value, "partitioned execution cancelled");
                return Err(QueryError::Cancelled(value.to_string()));
            }
            info!(key = %self.key, partition = value, "executing partition");
            let table = store
                .execute(statement)
                .map_err(|e| QueryError::PartitionError {
                    partition: value.to_string(),
                    source: Box::new(e),
                })?;
            tables.push(table);
        }
        Ok(tables)
    }

    fn execute_parallel<S>(
        &self,
        compiled: &[(&str, CompiledStatement)],
        store: &S,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultTable>, QueryError>
    where
        S: GraphStore + Sync + ?Sized,
    {
        //index of the earliest partition that failed so far, partitions after it are not started
        let first_failure = AtomicUsize::new(usize::MAX);
        //collecting an indexed parallel iterator keeps listing order
        let outcomes: Vec<Result<Option<ResultTable>, QueryError>> = compiled
            .par_iter()
            .enumerate()
            .map(|(index, (value, statement))| {
                if cancel.is_cancelled() {
                    warn!(partition = value, "partitioned execution cancelled");
                    return Err(QueryError::Cancelled(value.to_string()));
                }
                if index > first_failure.load(Ordering::SeqCst) {
                    debug!(partition = value, "skipping partition after earlier failure");
                    return Ok(None);
                }
                info!(key = %self.key, partition = value, "executing partition");
                match store.execute(statement) {
                    Ok(table) => Ok(Some(table)),
                    Err(e) => {
                        first_failure.fetch_min(index, Ordering::SeqCst);
                        Err(QueryError::PartitionError {
                            partition: value.to_string(),
                            source: Box::new(e),
                        })
                    }
                }
            })
            .collect();

        let mut tables = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            //a skipped partition implies an error elsewhere, which is returned below
            if let Some(table) = outcome? {
                tables.push(table);
            }
        }
        Ok(tables)
    }
}

/// Concatenates partition results in order. Partitions without rows do not define the header.
fn merge(tables: Vec<ResultTable>, fallback_columns: Vec<String>) -> ResultTable {
    let header = tables
        .iter()
        .find(|table| !table.is_empty())
        .map(|table| table.columns().to_vec())
        .unwrap_or(fallback_columns);
    let mut merged = ResultTable::new(header);
    for table in tables {
        if !table.is_empty() {
            merged.append(table);
        }
    }
    merged
}
