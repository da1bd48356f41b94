use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::files::deletion::{BulkDeleteReport, DeleteOutcome, DeletionCoordinator};
use crate::files::reconciler::{FlagRefresh, OrphanReconciler};
use crate::files::records::FileRecordStore;
use crate::models::file::{
    BulkDeleteRequest, CleanupRequest, CleanupResponse, FileListResponse, FileRecordResponse,
    ListFilesParams, OrphanListResponse, UpdateFileRequest,
};
use crate::models::shared::validate_bulk_ids;
use crate::state::AppState;

/// Upper bound on ids accepted by one bulk request.
const MAX_BULK_IDS: usize = 100;

#[utoipa::path(
    get,
    path = "/",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List file records",
    params(ListFilesParams),
    responses(
        (status = 200, description = "File records", body = FileListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListFilesParams>,
) -> Result<Json<FileListResponse>, AppError> {
    auth_user.require_admin()?;

    let store = FileRecordStore::new(&state.db);
    let records = match params.upload_type {
        Some(upload_type) => store.list_by_type(upload_type).await?,
        None => store.list_all().await?,
    };
    Ok(Json(FileListResponse::new(records)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Get a file record",
    params(("id" = i32, Path, description = "File record ID")),
    responses(
        (status = 200, description = "File record", body = FileRecordResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(file_id = id))]
pub async fn get_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FileRecordResponse>, AppError> {
    auth_user.require_admin()?;

    let record = FileRecordStore::new(&state.db)
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File record {id} not found")))?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Files",
    operation_id = "updateFile",
    summary = "Update a file record",
    description = "Partial update. Absent fields are left untouched; `null` clears the association fields.",
    params(("id" = i32, Path, description = "File record ID")),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "Updated record", body = FileRecordResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(file_id = id))]
pub async fn update_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateFileRequest>,
) -> Result<Json<FileRecordResponse>, AppError> {
    auth_user.require_admin()?;

    let record = FileRecordStore::new(&state.db)
        .update(id, payload.into())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File record {id} not found")))?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Files",
    operation_id = "deleteFile",
    summary = "Delete a file completely",
    description = "Removes the physical file and the record. A missing physical file is reported \
        as a `warning` on an otherwise successful outcome. Owner columns pointing at the file's \
        URL are cleared where they are optional.",
    params(("id" = i32, Path, description = "File record ID")),
    responses(
        (status = 200, description = "File deleted", body = DeleteOutcome),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(file_id = id))]
pub async fn delete_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteOutcome>, AppError> {
    auth_user.require_admin()?;

    let outcome = DeletionCoordinator::new(&state.db, state.blob_store.as_ref())
        .delete_file_completely(id)
        .await?;
    if !outcome.success {
        return Err(AppError::NotFound(
            outcome
                .error
                .unwrap_or_else(|| format!("File record {id} not found")),
        ));
    }
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/bulk-delete",
    tag = "Files",
    operation_id = "bulkDeleteFiles",
    summary = "Delete many files",
    description = "Deletes each id in turn. Failures are reported per id and never abort the batch.",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Per-id outcomes", body = BulkDeleteReport),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(count = payload.file_ids.len()))]
pub async fn bulk_delete_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteReport>, AppError> {
    auth_user.require_admin()?;
    validate_bulk_ids(&payload.file_ids, "file_ids", MAX_BULK_IDS)?;

    let report = DeletionCoordinator::new(&state.db, state.blob_store.as_ref())
        .bulk_delete(&payload.file_ids)
        .await;
    info!(
        requested = payload.file_ids.len(),
        deleted = report.success_count,
        errors = report.errors.len(),
        "Bulk delete finished"
    );
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/orphans",
    tag = "Files",
    operation_id = "listOrphanedFiles",
    summary = "Find orphaned files",
    description = "Records whose owner no longer exists, and unassociated records older than the grace period.",
    responses(
        (status = 200, description = "Orphaned records", body = OrphanListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_orphans(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<OrphanListResponse>, AppError> {
    auth_user.require_admin()?;

    let storage = &state.config.storage;
    let orphans = OrphanReconciler::new(&state.db, storage.orphan_grace_period())
        .find_orphaned_files()
        .await?;
    let files: Vec<FileRecordResponse> = orphans.into_iter().map(Into::into).collect();
    Ok(Json(OrphanListResponse {
        total: files.len() as u64,
        files,
        grace_period_secs: storage.orphan_grace_period_secs,
    }))
}

#[utoipa::path(
    post,
    path = "/orphans/refresh",
    tag = "Files",
    operation_id = "refreshOrphanFlags",
    summary = "Recompute orphan flags",
    responses(
        (status = 200, description = "Flags changed", body = FlagRefresh),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn refresh_orphans(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FlagRefresh>, AppError> {
    auth_user.require_admin()?;

    let refresh = OrphanReconciler::new(&state.db, state.config.storage.orphan_grace_period())
        .refresh_orphan_flags()
        .await?;
    Ok(Json(refresh))
}

#[utoipa::path(
    post,
    path = "/cleanup",
    tag = "Files",
    operation_id = "cleanupOrphanedFiles",
    summary = "Clean up orphaned files",
    description = "Deletes orphaned records, and their physical files when `delete_files` is set. \
        `dry_run` defaults to true and only lists the candidates. Without `delete_files` the \
        physical files stay on disk untracked and are listed in `report.untracked_files`.",
    request_body = CleanupRequest,
    responses(
        (status = 200, description = "Cleanup outcome", body = CleanupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(dry_run = payload.dry_run, delete_files = payload.delete_files))]
pub async fn cleanup_orphans(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CleanupRequest>,
) -> Result<Json<CleanupResponse>, AppError> {
    auth_user.require_admin()?;

    let reconciler = OrphanReconciler::new(&state.db, state.config.storage.orphan_grace_period());
    let (candidates, report) = if payload.dry_run {
        let orphans = reconciler.find_orphaned_files().await?;
        (orphans.into_iter().map(Into::into).collect(), None)
    } else {
        let report = reconciler
            .cleanup_orphaned_files(state.blob_store.as_ref(), payload.delete_files)
            .await?;
        (Vec::new(), Some(report))
    };

    Ok(Json(CleanupResponse {
        dry_run: payload.dry_run,
        delete_files: payload.delete_files,
        candidates,
        report,
    }))
}
