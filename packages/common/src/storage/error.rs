use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),
    /// A blob already exists under the requested key. Blobs are write-once.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),
    /// The blob key is malformed or escapes its upload directory.
    #[error("invalid blob key: {0}")]
    InvalidKey(String),
    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
