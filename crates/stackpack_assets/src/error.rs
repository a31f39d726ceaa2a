//! Error types for asset handling.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors that can occur while reading manifests or relocating assets.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid asset manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("Asset source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Archiver '{program}' could not be started: {message}")]
    ArchiverUnavailable { program: String, message: String },

    #[error("Archiving {archive} failed: {message}")]
    ArchiveFailed { archive: String, message: String },

    #[error("File transfer failed: {0}")]
    Transfer(#[from] fs_extra::error::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
