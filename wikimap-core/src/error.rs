use std::path::PathBuf;
use thiserror::Error;

/// Failures of graph store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid title: {0}")]
    InvalidTitle(String),

    #[error("Node error: {0}")]
    Node(String),

    #[error("Relationship error: {0}")]
    Relationship(String),

    #[error("Graph creation failed: {0}")]
    Creation(String),
}

/// Boxed cause carried by service-level errors.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// The single failure mode of a mapping call.
    #[error("Page mapping failed: {reason}")]
    PageMapping {
        reason: String,
        #[source]
        source: Option<GraphError>,
    },

    #[error("Search failed: {reason}")]
    Search {
        reason: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Article content retrieval failed: {reason}")]
    PageContent {
        reason: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl ServiceError {
    pub fn page_mapping(reason: impl Into<String>) -> Self {
        ServiceError::PageMapping {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn mapping_failed(source: GraphError) -> Self {
        ServiceError::PageMapping {
            reason: source.to_string(),
            source: Some(source),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
