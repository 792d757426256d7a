//! Error types for the dimension catalog.
//!
//! Only schema wiring and configuration loading can fail. Registering,
//! removing and querying resources never returns an error: mismatches
//! degrade to empty results.

use thiserror::Error;

use crate::time::TimeParseError;

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Primary error type for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    // === Schema Errors ===
    #[error("Unknown dimension node: {0}")]
    UnknownNode(usize),

    #[error("Unknown variable collection: {0}")]
    UnknownCollection(String),

    #[error("Variable collection already defined: {0}")]
    DuplicateCollection(String),

    #[error("Edge {parent} -> {child} would create a cycle")]
    CycleDetected { parent: String, child: String },

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(String),
}

impl CatalogError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error stems from how the dimension schema is wired.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            CatalogError::UnknownNode(_)
                | CatalogError::UnknownCollection(_)
                | CatalogError::DuplicateCollection(_)
                | CatalogError::CycleDetected { .. }
        )
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(err: serde_yaml::Error) -> Self {
        CatalogError::Config(format!("YAML error: {}", err))
    }
}

impl From<TimeParseError> for CatalogError {
    fn from(err: TimeParseError) -> Self {
        CatalogError::InvalidTime(err.to_string())
    }
}
