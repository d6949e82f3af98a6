//! Error types for filesystem operations.

use thiserror::Error;

use swiftsync_common::error::PathError;

/// Errors from local directory scanning and filtering.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// An ignore pattern could not be compiled.
    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern that failed to compile.
        pattern: String,
        /// Why compilation failed.
        reason: String,
    },

    /// The folder to walk does not exist or is not a directory.
    #[error("Folder not found: {path}")]
    FolderNotFound {
        /// The missing folder.
        path: String,
    },

    /// IO error while walking or inspecting files.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Path conversion failed.
    #[error(transparent)]
    Path(#[from] PathError),
}
