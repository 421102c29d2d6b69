use tracing::debug;

use crate::compiler::{CompiledStatement, StatementCompiler};
use crate::config::{Config, Configurable};
use crate::error::QueryError;
use crate::hierarchy::Hierarchy;
use crate::intent::QueryIntent;
use crate::partition::{GraphStore, PartitionKey, PartitionedQueryIntent};
use crate::results::ResultTable;

/// A corpus: its annotation hierarchy plus the configuration queries are compiled with.
/// This is the main entry point, queries are built with [`Corpus::query()`] and compiled
/// or executed against a [`GraphStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    hierarchy: Hierarchy,
    config: Config,
}

impl Configurable for Corpus {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    fn set_config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }
}

impl Corpus {
    /// Instantiates a corpus with the default configuration, the hierarchy is validated first
    pub fn new(hierarchy: Hierarchy) -> Result<Self, QueryError> {
        hierarchy.validate()?;
        Ok(Self {
            hierarchy,
            config: Config::default(),
        })
    }

    /// Loads the hierarchy from a JSON file
    pub fn from_file(filename: &str, config: Config) -> Result<Self, QueryError> {
        debug!(filename, "loading corpus hierarchy");
        let hierarchy = Hierarchy::from_file(filename, &config)?;
        Ok(Self { hierarchy, config })
    }

    pub fn name(&self) -> &str {
        self.hierarchy.corpus()
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Starts a query anchored on the given tier
    pub fn query(&self, tier: &str) -> Result<QueryIntent, QueryError> {
        let tier = self.hierarchy.tier(tier)?;
        Ok(QueryIntent::new(tier.name()))
    }

    /// Wraps a query for execution per speaker or per discourse
    pub fn partitioned(&self, intent: QueryIntent, key: PartitionKey) -> PartitionedQueryIntent {
        PartitionedQueryIntent::new(intent, key)
    }

    pub fn compiler(&self) -> StatementCompiler<'_> {
        StatementCompiler::new(&self.hierarchy, &self.config)
    }

    pub fn compile(&self, intent: &QueryIntent) -> Result<CompiledStatement, QueryError> {
        self.compiler().compile(intent)
    }

    /// Compiles the query and has the store execute it. Store errors are returned unchanged.
    pub fn execute<S: GraphStore + ?Sized>(
        &self,
        intent: &QueryIntent,
        store: &S,
    ) -> Result<ResultTable, QueryError> {
        let statement = self.compile(intent)?;
        store.execute(&statement)
    }
}
