use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::key::BlobKey;
use crate::upload_type::UploadType;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Write-once blob storage addressed by [`BlobKey`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a key that must not exist yet. Returns the number of bytes written.
    ///
    /// Fails with [`StorageError::AlreadyExists`] instead of overwriting.
    async fn put_new(&self, key: &BlobKey, data: &[u8]) -> Result<u64, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn get(&self, key: &BlobKey) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, key: &BlobKey) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &BlobKey) -> Result<bool, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, key: &BlobKey) -> Result<u64, StorageError>;

    /// List the file names stored for an upload type.
    async fn list(&self, upload_type: UploadType) -> Result<Vec<String>, StorageError>;

    /// Physical location of a blob, for diagnostics.
    fn path_of(&self, key: &BlobKey) -> PathBuf;
}
