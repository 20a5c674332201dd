//! Error types for the EduMesh community graph

use thiserror::Error;

/// Error type for graph store operations (both backends).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing or unusable configuration. Fatal at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Graph database connection error: {0}")]
    Connection(String),
    #[error("Graph query execution error: {0}")]
    Query(String),
    #[error("Data mapping error from graph result: {0}")]
    Mapping(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Graph store is closed")]
    Closed,
}

impl StoreError {
    /// True for failures raised by the backend connection rather than by the caller's input.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_) | StoreError::Query(_) | StoreError::Mapping(_)
        )
    }
}

/// Error type for the bulk loader.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed dataset: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid dataset entry: {0}")]
    InvalidEntry(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error type for loading gap analysis rule tables.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read rule table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed rule table (YAML): {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Malformed rule table (JSON): {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}
