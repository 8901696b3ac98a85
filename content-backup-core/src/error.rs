//! Error taxonomy shared by every step of the backup run.
//!
//! Each external failure point maps onto exactly one variant. Nothing is
//! retried or swallowed: a step returns its error and the run stops there.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    /// The settings document is missing, unreadable, malformed or incomplete.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The run marker exists but does not hold a valid timestamp.
    #[error("run marker {path:?} is corrupt: {reason}")]
    StateCorruption { path: PathBuf, reason: String },

    /// The credential exchange failed or returned no token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The content query failed or returned an unusable body.
    #[error("content fetch failed: {0}")]
    Fetch(String),

    /// A write against the storage bucket failed.
    #[error("storage write failed for {key}: {reason}")]
    Storage { key: String, reason: String },

    /// The run marker could not be read or written on the local filesystem.
    #[error("run marker {path:?} could not be persisted: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BackupError {
    /// Short stable label, used as a structured logging field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::StateCorruption { .. } => "state_corruption",
            Self::Authentication(_) => "authentication",
            Self::Fetch(_) => "fetch",
            Self::Storage { .. } => "storage",
            Self::Persistence { .. } => "persistence",
        }
    }
}
