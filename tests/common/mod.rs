#![allow(dead_code)]
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tierql::*;

/// A four-tier hierarchy: utterance > word > syllable > phone
pub fn setup_hierarchy() -> Result<Hierarchy, QueryError> {
    Hierarchy::new("test")
        .with_speaker_property("gender", ValueKind::String)
        .with_tier(AnnotationTier::new("utterance"))?
        .with_tier(
            AnnotationTier::new("word")
                .with_token_property("frequency", ValueKind::Float)
                .with_type_property("transcription", ValueKind::String),
        )?
        .with_tier(AnnotationTier::new("syllable").with_token_subset("stressed"))?
        .with_tier(
            AnnotationTier::new("phone")
                .with_type_subset("stop")
                .with_type_subset("syllabic")
                .with_subannotation(
                    SubannotationDeclaration::new("burst")
                        .with_property("amplitude", ValueKind::Float),
                ),
        )
}

pub fn setup_corpus() -> Result<Corpus, QueryError> {
    Corpus::new(setup_hierarchy()?)
}

pub fn table(columns: &[&str], rows: &[&[DataValue]]) -> Result<ResultTable, QueryError> {
    let mut table = ResultTable::new(columns.iter().copied());
    for row in rows {
        table.push_row(row.to_vec())?;
    }
    Ok(table)
}

/// In-memory graph store returning canned results per partition value.
/// The partition a statement belongs to is recognised by its parameters.
#[derive(Default)]
pub struct MockStore {
    speakers: Vec<String>,
    discourses: Vec<String>,
    partitions: HashMap<String, ResultTable>,
    failing: HashSet<String>,
    executed: Mutex<Vec<String>>,
    on_execute: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speaker(mut self, name: &str, table: ResultTable) -> Self {
        self.speakers.push(name.to_string());
        self.partitions.insert(name.to_string(), table);
        self
    }

    pub fn with_discourse(mut self, name: &str, table: ResultTable) -> Self {
        self.discourses.push(name.to_string());
        self.partitions.insert(name.to_string(), table);
        self
    }

    pub fn with_failing_discourse(mut self, name: &str) -> Self {
        self.discourses.push(name.to_string());
        self.failing.insert(name.to_string());
        self
    }

    /// Calls `hook` with the partition value each time a statement is executed
    pub fn with_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_execute = Some(Box::new(hook));
        self
    }

    /// Partition values in the order their statements were executed
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn partition_of(&self, statement: &CompiledStatement) -> Option<String> {
        statement
            .parameters()
            .values()
            .filter_map(|value| value.as_str())
            .find(|value| self.partitions.contains_key(*value) || self.failing.contains(*value))
            .map(|value| value.to_string())
    }
}

impl GraphStore for MockStore {
    fn speakers(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.speakers.clone())
    }

    fn discourses(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.discourses.clone())
    }

    fn execute(&self, statement: &CompiledStatement) -> Result<ResultTable, QueryError> {
        let partition = self.partition_of(statement).ok_or_else(|| {
            QueryError::StoreError("statement does not match any partition".to_string())
        })?;
        self.executed.lock().unwrap().push(partition.clone());
        if let Some(hook) = &self.on_execute {
            hook(&partition);
        }
        if self.failing.contains(&partition) {
            return Err(QueryError::StoreError(format!(
                "connection lost while executing {}",
                partition
            )));
        }
        Ok(self.partitions[&partition].clone())
    }
}

/// Three discourses, the second has no matching annotations and the third returns its columns in another order
pub fn setup_discourse_store() -> Result<MockStore, QueryError> {
    Ok(MockStore::new()
        .with_discourse(
            "d1",
            table(
                &["label", "begin"],
                &[
                    &[DataValue::from("p"), DataValue::from(0.1)],
                    &[DataValue::from("t"), DataValue::from(0.4)],
                ],
            )?,
        )
        .with_discourse("d2", table(&[], &[])?)
        .with_discourse(
            "d3",
            table(
                &["begin", "label"],
                &[&[DataValue::from(1.2), DataValue::from("k")]],
            )?,
        ))
}
