//! Error types shared across the sync services.

use thiserror::Error;

/// Errors from roster reconciliation, diff generation and remote provisioning.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A course or teacher identifier could not be resolved.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient connectivity failure against the LMS, registrar or remote store.
    /// The caller may retry the whole run.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// An input row is missing one of its key columns. Aborts the current diff.
    #[error("malformed row at position {position}: missing key column '{missing}'")]
    MalformedRow { position: usize, missing: String },

    /// A created remote folder never showed up in subsequent listings.
    #[error("remote listing inconsistency: {0}")]
    ProvisioningInconsistency(String),

    /// An artifact with the same title already exists in the remote store.
    #[error("{0}")]
    DuplicateArtifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::UpstreamUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
