use std::path::Path;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use common::UploadType;
use common::storage::{BlobKey, BlobStore, StorageError};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::records::{FileRecordStore, NewFileRecord};
use crate::config::StorageConfig;
use crate::utils::filename::validate_flat_filename;

const MIB: u64 = 1024 * 1024;

/// Attempts at finding a free storage name before giving up on a file.
const MAX_NAME_ATTEMPTS: usize = 3;

/// Limits applied to one upload type.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UploadConstraints {
    pub max_files: usize,
    pub max_file_size_bytes: u64,
    /// Exact MIME types or `type/*` patterns.
    pub accepted_mime_types: Vec<String>,
}

impl UploadConstraints {
    pub fn gallery() -> Self {
        Self {
            max_files: 20,
            max_file_size_bytes: 4 * MIB,
            accepted_mime_types: vec!["image/*".into()],
        }
    }

    pub fn news() -> Self {
        Self {
            max_files: 5,
            max_file_size_bytes: 4 * MIB,
            accepted_mime_types: vec!["image/*".into()],
        }
    }

    pub fn events() -> Self {
        Self {
            max_files: 5,
            max_file_size_bytes: 4 * MIB,
            accepted_mime_types: vec!["image/*".into()],
        }
    }

    pub fn documents() -> Self {
        Self {
            max_files: 10,
            max_file_size_bytes: 10 * MIB,
            accepted_mime_types: [
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "application/vnd.ms-excel",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "application/vnd.oasis.opendocument.text",
                "application/vnd.oasis.opendocument.spreadsheet",
                "text/plain",
                "text/csv",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    pub fn accepts(&self, mime: &str) -> bool {
        self.accepted_mime_types.iter().any(|pattern| {
            match pattern.strip_suffix("/*") {
                Some(top_level) => mime
                    .split_once('/')
                    .is_some_and(|(top, _)| top.eq_ignore_ascii_case(top_level)),
                None => pattern.eq_ignore_ascii_case(mime),
            }
        })
    }
}

/// One file received from a client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: Option<String>,
    pub declared_mime: Option<String>,
    pub data: Bytes,
}

/// Per-file outcome of an upload.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UploadResult {
    pub success: bool,
    #[schema(example = "Village fete.JPG")]
    pub original_name: String,
    /// Server-assigned storage name.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "1718000000000-3f2b9c0e8d7a4b6f9e1d2c3b4a5f6e7d.jpg")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "/uploads/gallery/1718000000000-3f2b9c0e8d7a4b6f9e1d2c3b4a5f6e7d.jpg")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "image/jpeg")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 2097152)]
    pub size: Option<u64>,
    /// Id of the tracking record, once one has been created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "file exceeds maximum size")]
    pub error: Option<String>,
}

impl UploadResult {
    fn failed(original_name: String, error: impl Into<String>) -> Self {
        Self {
            success: false,
            original_name,
            filename: None,
            url: None,
            file_path: None,
            mime_type: None,
            size: None,
            record_id: None,
            error: Some(error.into()),
        }
    }
}

/// Validates incoming files and writes accepted ones to the blob store.
///
/// Writing tracking records is left to the caller, see [`record_uploads`].
pub struct UploadProcessor<'a> {
    blobs: &'a dyn BlobStore,
    storage: &'a StorageConfig,
}

impl<'a> UploadProcessor<'a> {
    pub fn new(blobs: &'a dyn BlobStore, storage: &'a StorageConfig) -> Self {
        Self { blobs, storage }
    }

    /// Process a batch. Every file gets its own result; one failure never aborts the others.
    pub async fn process(
        &self,
        upload_type: UploadType,
        constraints: &UploadConstraints,
        files: Vec<IncomingFile>,
    ) -> Vec<UploadResult> {
        let mut results = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            let result = if index >= constraints.max_files {
                UploadResult::failed(
                    display_name(&file),
                    format!(
                        "too many files: at most {} per upload",
                        constraints.max_files
                    ),
                )
            } else {
                self.process_one(upload_type, constraints, file).await
            };
            results.push(result);
        }
        results
    }

    async fn process_one(
        &self,
        upload_type: UploadType,
        constraints: &UploadConstraints,
        file: IncomingFile,
    ) -> UploadResult {
        let shown_name = display_name(&file);

        let Some(raw_name) = file.original_name.as_deref() else {
            return UploadResult::failed(shown_name, "missing file name");
        };
        let original_name = match validate_flat_filename(raw_name) {
            Ok(name) => name.to_string(),
            Err(e) => return UploadResult::failed(shown_name, e.message()),
        };

        let size = file.data.len() as u64;
        if size > constraints.max_file_size_bytes {
            info!(
                file = %original_name,
                size,
                max = constraints.max_file_size_bytes,
                "Rejected oversized upload"
            );
            return UploadResult::failed(original_name, "file exceeds maximum size");
        }
        if size == 0 {
            return UploadResult::failed(original_name, "file is empty");
        }

        let mime_type = resolve_mime(&original_name, file.declared_mime.as_deref());
        if !constraints.accepts(&mime_type) {
            return UploadResult::failed(
                original_name,
                format!("file type {mime_type} is not allowed for {upload_type} uploads"),
            );
        }

        match self.store(upload_type, &original_name, &file.data).await {
            Ok((key, written)) => UploadResult {
                success: true,
                url: Some(self.storage.public_url(upload_type, key.filename())),
                filename: Some(key.filename().to_string()),
                file_path: Some(key.to_string()),
                mime_type: Some(mime_type),
                size: Some(written),
                record_id: None,
                error: None,
                original_name,
            },
            Err(e) => {
                warn!(upload_type = %upload_type, file = %original_name, error = %e, "Failed to store upload");
                UploadResult::failed(original_name, format!("failed to store file: {e}"))
            }
        }
    }

    async fn store(
        &self,
        upload_type: UploadType,
        original_name: &str,
        data: &[u8],
    ) -> Result<(BlobKey, u64), StorageError> {
        let mut last_err = None;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let key = BlobKey::new(upload_type, &generate_storage_filename(original_name))?;
            match self.blobs.put_new(&key, data).await {
                Ok(written) => return Ok((key, written)),
                Err(e @ StorageError::AlreadyExists(_)) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| StorageError::AlreadyExists(upload_type.to_string())))
    }
}

/// Create tracking records for the successful results of a batch.
///
/// A blob whose record cannot be created is removed again and its result
/// turned into a failure, so no stored file is left without a record.
pub async fn record_uploads<C: ConnectionTrait>(
    conn: &C,
    blobs: &dyn BlobStore,
    upload_type: UploadType,
    uploaded_by: Option<i32>,
    results: &mut [UploadResult],
) {
    let store = FileRecordStore::new(conn);
    for result in results.iter_mut().filter(|r| r.success) {
        let (Some(filename), Some(url), Some(file_path), Some(mime_type), Some(size)) = (
            result.filename.clone(),
            result.url.clone(),
            result.file_path.clone(),
            result.mime_type.clone(),
            result.size,
        ) else {
            continue;
        };

        let new = NewFileRecord {
            original_name: result.original_name.clone(),
            filename,
            file_path: file_path.clone(),
            public_url: url,
            mime_type,
            file_size: i64::try_from(size).unwrap_or(i64::MAX),
            upload_type,
            uploaded_by,
            owner: None,
        };

        match store.create(new).await {
            Ok(record) => {
                info!(file_id = record.id, path = %record.file_path, size = record.file_size, "Stored upload");
                result.record_id = Some(record.id);
            }
            Err(e) => {
                warn!(path = %file_path, error = %e, "Failed to record upload, removing blob");
                if let Ok(key) = BlobKey::parse(&file_path)
                    && let Err(del_err) = blobs.delete(&key).await
                {
                    warn!(path = %file_path, error = %del_err, "Failed to remove unrecorded blob");
                }
                *result = UploadResult::failed(
                    result.original_name.clone(),
                    format!("failed to record file: {e}"),
                );
            }
        }
    }
}

fn display_name(file: &IncomingFile) -> String {
    file.original_name
        .clone()
        .unwrap_or_else(|| "(unnamed)".to_string())
}

/// Pick the MIME type: a meaningful declared type wins, otherwise guess from the extension.
pub fn resolve_mime(original_name: &str, declared: Option<&str>) -> String {
    let declared = declared
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared.unwrap_or_else(|| {
        mime_guess::from_path(original_name)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string())
    })
}

/// Collision-resistant storage name: `{unix_millis}-{uuid}.{ext}`.
pub fn generate_storage_filename(original_name: &str) -> String {
    let ext: String = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            e.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(10)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .unwrap_or_default();

    let stem = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    );
    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

/// Creation time encoded in a name produced by [`generate_storage_filename`].
pub fn storage_name_timestamp(filename: &str) -> Option<DateTime<Utc>> {
    let (millis, _) = filename.split_once('-')?;
    DateTime::from_timestamp_millis(millis.parse().ok()?)
}
