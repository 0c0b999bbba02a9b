//! Station directory error types.

use std::path::PathBuf;

/// Errors that can occur when loading the station directory.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// The directory file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The directory file is not valid JSON of the expected shape.
    #[error("JSON parse error: {message}")]
    Parse { message: String },

    /// The blocking load task panicked or was cancelled.
    #[error("station directory load failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
