use std::fmt;

use super::error::StorageError;
use crate::upload_type::UploadType;

/// Location of a blob: an upload type subdirectory plus a flat file name.
///
/// Renders as `"{upload_type}/{filename}"`, the form stored in `file_record.file_path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    upload_type: UploadType,
    filename: String,
}

impl BlobKey {
    pub fn new(upload_type: UploadType, filename: &str) -> Result<Self, StorageError> {
        validate_blob_filename(filename)?;
        Ok(Self {
            upload_type,
            filename: filename.to_string(),
        })
    }

    /// Parse a stored `"{upload_type}/{filename}"` key.
    pub fn parse(key: &str) -> Result<Self, StorageError> {
        let (dir, filename) = key
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidKey(format!("missing upload type in '{key}'")))?;
        let upload_type = dir
            .parse::<UploadType>()
            .map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        Self::new(upload_type, filename)
    }

    pub fn upload_type(&self) -> UploadType {
        self.upload_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.upload_type, self.filename)
    }
}

fn validate_blob_filename(filename: &str) -> Result<(), StorageError> {
    let reason = if filename.is_empty() {
        Some("empty file name")
    } else if filename.contains('/') || filename.contains('\\') {
        Some("path separators are not allowed")
    } else if filename.starts_with('.') {
        Some("hidden or relative names are not allowed")
    } else if filename.chars().any(|c| c.is_control()) {
        Some("control characters are not allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StorageError::InvalidKey(format!("{filename:?}: {reason}"))),
        None => Ok(()),
    }
}
