use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::QueryError;
use crate::file::*;

pub trait Configurable: Sized {
    //// Obtain the configuration
    fn config(&self) -> &Config;

    //// Obtain the configuration mutably
    fn config_mut(&mut self) -> &mut Config;

    ///Builder pattern to associate a configuration
    fn with_config(mut self, config: Config) -> Self {
        self.set_config(config);
        self
    }

    ///Setter to associate a configuration
    fn set_config(&mut self, config: Config) -> &mut Self;
}

/// This holds the configuration for compilation and execution.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The working directory, relative filenames are resolved against it
    pub(crate) workdir: Option<PathBuf>,

    /// Emit literal values as statement parameters (`$p0`) instead of inlining them
    pub(crate) parameterize: bool,

    /// The tier whose annotations may be pauses, pause-skipping traversals (`previous_pause`, `following_pause`) are only valid here
    pub(crate) pause_tier: String,

    /// Run the partitions of a partitioned query in parallel. Requires a store that tolerates concurrent statements.
    pub(crate) parallel_partitions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workdir: None,
            parameterize: true,
            pause_tier: "word".to_string(),
            parallel_partitions: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit literal values as statement parameters (default) or inline them as encoded literals
    pub fn with_parameterize(mut self, value: bool) -> Self {
        self.parameterize = value;
        self
    }

    /// Are literal values emitted as statement parameters?
    pub fn parameterize(&self) -> bool {
        self.parameterize
    }

    /// Sets the tier on which pause-skipping traversal is allowed
    pub fn with_pause_tier(mut self, value: impl Into<String>) -> Self {
        self.pause_tier = value.into();
        self
    }

    pub fn pause_tier(&self) -> &str {
        self.pause_tier.as_str()
    }

    /// Enable or disable parallel execution of partitions.
    /// The merged result is identical either way, rows are always ordered by partition listing order.
    pub fn with_parallel_partitions(mut self, value: bool) -> Self {
        self.parallel_partitions = value;
        self
    }

    pub fn parallel_partitions(&self) -> bool {
        self.parallel_partitions
    }

    /// Sets the working directory
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    ///  Return the working directory, if set
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    /// Loads configuration from a JSON file
    pub fn from_file(filename: &str) -> Result<Self, QueryError> {
        from_json_file(filename, &Config::default(), "Reading config from file")
    }
}
