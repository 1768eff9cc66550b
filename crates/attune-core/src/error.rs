//! Error types for attune-core

use thiserror::Error;

/// Result type alias using attune-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in attune-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Network connectivity is required but absent
    #[error("No network connectivity")]
    NoNetwork,

    /// No effective user session is available
    #[error("No active session")]
    NoSession,

    /// A sync pass is already running for this engine
    #[error("Sync already in progress")]
    SyncInProgress,

    /// Remote store reported an error
    #[error("Remote store error: {0}")]
    Remote(String),

    /// Remote HTTP transport error
    #[error("Remote HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// libSQL error (local store failure)
    #[error("Local store error: {0}")]
    Database(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Some entity types failed while siblings succeeded
    #[error("Partial sync failure: {failed} of {attempted} data types failed")]
    PartialSync { failed: usize, attempted: usize },
}
