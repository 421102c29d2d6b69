use thiserror::Error;

// ------------------------------ ERROR DEFINITIONS & IMPLEMENTATIONS -------------------------------------------------------------

/// All errors raised by this library. Store errors come from the [`crate::GraphStore`]
/// collaborator and are passed on unchanged, the library never retries them.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A referenced tier name does not exist in the hierarchy
    #[error("UnknownTierError: No such tier: {0}")]
    UnknownTier(String),

    /// A step in an attribute path could not be resolved. Holds the path (dotted) and an explanation
    #[error("InvalidPathError: Unable to resolve {0}: {1}")]
    InvalidPath(String, String),

    /// The requested mutation can not be expressed in a single statement
    #[error("InvalidMutationCombinationError: {0}")]
    InvalidMutationCombination(String),

    /// A filter is malformed (bad regular expression, operator not applicable to this kind of leaf)
    #[error("InvalidFilterError: {0}")]
    InvalidFilter(String),

    /// The hierarchy description itself is inconsistent
    #[error("HierarchyError: {0}")]
    HierarchyError(String),

    /// Raised by the graph store collaborator
    #[error("StoreError: {0}")]
    StoreError(String),

    /// Executing one partition of a partitioned query failed, the remaining partitions were not run
    #[error("PartitionError: Partition '{partition}' failed: {source}")]
    PartitionError {
        partition: String,
        #[source]
        source: Box<QueryError>,
    },

    /// Execution was cancelled between partitions
    #[error("Cancelled: Execution cancelled before partition '{0}'")]
    Cancelled(String),

    /// A literal could not be decoded
    #[error("LiteralError: Unable to parse literal {0}: {1}")]
    LiteralError(String, &'static str),

    #[error("IOError: {0} ({1}): {2}")]
    IOError(#[source] std::io::Error, String, &'static str),

    #[error("JsonError: {0} ({1}): {2}")]
    JsonError(
        #[source] serde_path_to_error::Error<serde_json::Error>,
        String,
        &'static str,
    ),

    #[error("SerializationError: {0}")]
    SerializationError(String),

    #[cfg(feature = "csv")]
    #[error("CsvError: {0} ({1})")]
    CsvError(#[source] csv::Error, &'static str),
}

impl QueryError {
    /// Is this an error raised before anything reached the store?
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTier(..)
                | Self::InvalidPath(..)
                | Self::InvalidMutationCombination(..)
                | Self::InvalidFilter(..)
                | Self::HierarchyError(..)
        )
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
