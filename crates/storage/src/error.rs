//! Error types for storage operations.

use thiserror::Error;

/// Errors from object store transfer operations.
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    /// Object does not exist in the container.
    #[error("Object not found: {container}/{name}")]
    NotFound {
        /// Container searched.
        container: String,
        /// Object name searched for.
        name: String,
    },

    /// Container does not exist.
    #[error("Container not found: {container}")]
    ContainerNotFound {
        /// The missing container.
        container: String,
    },

    /// An upload request carried no content source.
    #[error("No file path, data, or stream supplied to upload")]
    ContentSourceMissing,

    /// No object name was given and none could be derived from the source.
    #[error("No object name supplied and none could be derived from the content source")]
    NameUnresolvable,

    /// Temp URL signing was asked for an unsupported HTTP method.
    #[error("Invalid method '{method}' for temp URL; only GET and PUT are supported")]
    InvalidMethod {
        /// The rejected method.
        method: String,
    },

    /// Temp URL signing input could not be encoded.
    #[error("Cannot sign path '{path}': {reason}")]
    InvalidSignatureInput {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A local path required by the operation does not exist.
    #[error("Local path does not exist: {path}")]
    LocalPathMissing {
        /// The missing path.
        path: String,
    },

    /// A segmented upload failed partway; earlier segments may remain stored.
    #[error(
        "Upload of '{name}' failed after {uploaded_segments} of {total_segments} segments: {source}"
    )]
    PartialTransfer {
        /// Object name being uploaded.
        name: String,
        /// Segments stored before the failure.
        uploaded_segments: u64,
        /// Total segments planned.
        total_segments: u64,
        /// The failure that interrupted the upload.
        source: Box<StorageError>,
    },

    /// IO error during a transfer.
    #[error("IO error at {path}: {message}")]
    Io {
        /// Path where the error occurred.
        path: String,
        /// Error message.
        message: String,
    },

    /// Transport-level failure talking to the store.
    #[error("Network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// A request or option combination is invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

impl StorageError {
    /// Create an Io error tagged with the path it occurred at.
    ///
    /// # Arguments
    /// * `path` - Path where the error occurred
    /// * `err` - The underlying IO error
    pub fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
