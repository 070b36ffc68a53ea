use std::{io, path};

use thiserror::Error;

/// Errors from loading or saving a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot file {path} could not be accessed: {error}")]
    Io {
        path: path::PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The file holds valid JSON that is not an object.
    #[error("snapshot file {path} does not contain a JSON object")]
    NotAnObject { path: path::PathBuf },
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
