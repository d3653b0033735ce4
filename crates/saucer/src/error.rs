//! Error types for scene loading.

use std::path::PathBuf;

use saucer_decode::DecodeError;
use thiserror::Error;

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a scene.
#[derive(Debug, Error)]
pub enum Error {
    /// Decoding the archive, the map or a derived asset failed.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No archive file exists at the resolved location.
    #[error("archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    /// Writing or reading a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
