use chrono::{DateTime, Utc};
use common::UploadType;
use serde::{Deserialize, Serialize};

use crate::entity::file_record;
use crate::files::association::OwnerKind;
use crate::files::records::FileRecordPatch;
use crate::files::upload::UploadResult;
use crate::models::shared::double_option;

/// Tracking record of an uploaded file.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileRecordResponse {
    #[schema(example = 12)]
    pub id: i32,
    /// Name the file had on the uploader's machine.
    #[schema(example = "Dorffest 2026.jpg")]
    pub original_name: String,
    /// Generated storage name.
    #[schema(example = "1791234567890-3f2a9c0e4b1d4f7a8e6c5b4a3d2e1f00.jpg")]
    pub filename: String,
    /// Storage path relative to the uploads root.
    #[schema(example = "gallery/1791234567890-3f2a9c0e4b1d4f7a8e6c5b4a3d2e1f00.jpg")]
    pub file_path: String,
    #[schema(example = "/uploads/gallery/1791234567890-3f2a9c0e4b1d4f7a8e6c5b4a3d2e1f00.jpg")]
    pub public_url: String,
    #[schema(example = "image/jpeg")]
    pub mime_type: String,
    /// Size in bytes.
    #[schema(example = 204800)]
    pub file_size: i64,
    #[schema(example = "gallery")]
    pub upload_type: String,
    pub uploaded_by: Option<i32>,
    #[schema(example = "image")]
    pub associated_entity: Option<String>,
    pub associated_entity_id: Option<i32>,
    pub is_orphaned: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<file_record::Model> for FileRecordResponse {
    fn from(m: file_record::Model) -> Self {
        Self {
            id: m.id,
            original_name: m.original_name,
            filename: m.filename,
            file_path: m.file_path,
            public_url: m.public_url,
            mime_type: m.mime_type,
            file_size: m.file_size,
            upload_type: m.upload_type,
            uploaded_by: m.uploaded_by,
            associated_entity: m.associated_entity,
            associated_entity_id: m.associated_entity_id,
            is_orphaned: m.is_orphaned,
            last_accessed_at: m.last_accessed_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileRecordResponse>,
    #[schema(example = 3)]
    pub total: u64,
}

impl FileListResponse {
    pub fn new(records: Vec<file_record::Model>) -> Self {
        let files: Vec<FileRecordResponse> = records.into_iter().map(Into::into).collect();
        Self {
            total: files.len() as u64,
            files,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListFilesParams {
    /// Restrict to one upload type.
    #[param(example = "gallery")]
    pub upload_type: Option<UploadType>,
}

/// Partial update of a file record. Absent fields are left untouched.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateFileRequest {
    #[schema(example = "Dorffest 2026.jpg")]
    pub original_name: Option<String>,
    pub is_orphaned: Option<bool>,
    /// Owner kind, or `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<OwnerKind>)]
    pub associated_entity: Option<Option<OwnerKind>>,
    /// Owner id, or `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub associated_entity_id: Option<Option<i32>>,
}

impl From<UpdateFileRequest> for FileRecordPatch {
    fn from(req: UpdateFileRequest) -> Self {
        Self {
            original_name: req.original_name,
            is_orphaned: req.is_orphaned,
            associated_entity: req.associated_entity,
            associated_entity_id: req.associated_entity_id,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BulkDeleteRequest {
    /// Record ids to delete (1-100, no duplicates).
    #[schema(example = json!([3, 4, 9]))]
    pub file_ids: Vec<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CleanupRequest {
    /// Also remove the physical files of orphaned records.
    #[serde(default)]
    pub delete_files: bool,
    /// Only list what would be removed.
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImageCleanupRequest {
    /// Only list what would be removed.
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct OrphanListResponse {
    pub files: Vec<FileRecordResponse>,
    #[schema(example = 2)]
    pub total: u64,
    /// Grace period applied to unassociated records, in seconds.
    #[schema(example = 3600)]
    pub grace_period_secs: u64,
}

/// Orphan cleanup outcome. With `dry_run` set, `candidates` lists what a real run would remove.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CleanupResponse {
    pub dry_run: bool,
    pub delete_files: bool,
    pub candidates: Vec<FileRecordResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<crate::files::reconciler::CleanupReport>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadFailure {
    #[schema(example = "Übersichtsplan.pdf")]
    pub original_name: String,
    #[schema(example = "file type application/pdf is not allowed for gallery uploads")]
    pub error: String,
}

/// Per-file upload outcomes; `success` is true when at least one file was stored.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    #[schema(example = "gallery")]
    pub upload_type: UploadType,
    pub results: Vec<UploadResult>,
    pub errors: Vec<UploadFailure>,
}

impl UploadResponse {
    pub fn new(upload_type: UploadType, results: Vec<UploadResult>) -> Self {
        let errors = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| UploadFailure {
                original_name: r.original_name.clone(),
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();
        Self {
            success: results.iter().any(|r| r.success),
            upload_type,
            results,
            errors,
        }
    }
}
