//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised while accumulating observations or freezing the tries
///
/// Both kinds are fatal for the build that raised them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("unsigned integer overflow in {field}: {value} exceeds {max}")]
    CapacityOverflow {
        field: &'static str,
        value: u128,
        max: u128,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AggregationError {
    pub(crate) fn overflow(field: &'static str, value: u128, max: u128) -> Self {
        AggregationError::CapacityOverflow { field, value, max }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AggregationError::InvalidArgument(message.into())
    }
}

/// Errors that can occur while parsing an observation stream
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid observation format: {0}")]
    InvalidFormat(String),

    #[error("Record {id} references unknown parent {parent}")]
    UnknownParent { id: u64, parent: u64 },

    #[error("Duplicate record id: {0}")]
    DuplicateId(u64),

    #[error("Aggregation failed at record {id}: {source}")]
    Aggregation {
        id: u64,
        #[source]
        source: AggregationError,
    },

    #[error("Layout build failed: {0}")]
    Build(#[from] AggregationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur while loading deduplication tables
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Deduplication TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid deduplication table: {0}")]
    InvalidTable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty heap tree")]
    EmptyTree,

    #[error("Flamegraph rendering failed: {0}")]
    RenderFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
