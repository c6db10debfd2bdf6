use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`GraphStore`](crate::store::GraphStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The property set cannot be written as a node. Recoverable per record.
    #[error("node rejected: {0}")]
    NodeRejected(String),

    /// Store misuse or an unexpected backend response.
    #[error("graph store error: {0}")]
    Backend(String),

    #[error("neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),
}

/// Fatal import failures. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    RecordParse { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ImportError>;
