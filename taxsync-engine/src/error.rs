//! Error types for taxsync-engine.

use std::path::PathBuf;

use thiserror::Error;

use taxsync_core::{ConfigError, RemoteError};
use taxsync_store::StoreError;

/// All errors that can arise from synchronization runs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A fatal error from the remote concept service. Per-item remote
    /// failures are absorbed at the batch level and never surface here.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// An error from the local node store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error from the connection configuration layer.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (sync state store).
    #[error("sync state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Batch size outside the validated 1–100 range.
    #[error("batch size {given} out of range (1-100)")]
    InvalidBatchSize { given: usize },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
