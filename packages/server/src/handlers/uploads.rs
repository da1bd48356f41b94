use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use common::UploadType;
use tracing::{info, instrument};

use crate::config::UploadsConfig;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::files::upload::{IncomingFile, UploadProcessor, record_uploads};
use crate::models::file::UploadResponse;
use crate::state::AppState;

/// Body limit large enough for a full batch of the most permissive upload type.
pub fn upload_body_limit(uploads: &UploadsConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(uploads.max_request_bytes())
}

pub(crate) fn parse_upload_type(raw: &str) -> Result<UploadType, AppError> {
    raw.parse()
        .map_err(|e: common::upload_type::UnknownUploadType| AppError::Validation(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/{upload_type}",
    tag = "Uploads",
    operation_id = "uploadFiles",
    summary = "Upload files",
    description = "Accepts one or more `file` (or `files`) multipart fields. Each file is validated \
        against the limits of its upload type and stored under a generated name, then tracked by \
        a file record. Files fail independently: the response lists a result per file. \
        Returns 201 when at least one file was stored, 400 when none was.",
    params(("upload_type" = UploadType, Path, description = "gallery, news, documents or events")),
    request_body(content_type = "multipart/form-data", description = "One or more files"),
    responses(
        (status = 201, description = "At least one file stored", body = UploadResponse),
        (status = 400, description = "No file stored, or bad request (VALIDATION_ERROR)", body = UploadResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(upload_type = %upload_type))]
pub async fn upload_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(upload_type): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    let upload_type = parse_upload_type(&upload_type)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if !matches!(field.name(), Some("file") | Some("files")) {
            continue; // Ignore unknown fields.
        }
        let original_name = field.file_name().map(str::to_string);
        let declared_mime = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
        files.push(IncomingFile {
            original_name,
            declared_mime,
            data,
        });
    }

    if files.is_empty() {
        return Err(AppError::Validation("Missing 'file' field".into()));
    }

    let constraints = state.config.uploads.constraints_for(upload_type);
    let processor = UploadProcessor::new(state.blob_store.as_ref(), &state.config.storage);
    let mut results = processor.process(upload_type, constraints, files).await;
    record_uploads(
        &state.db,
        state.blob_store.as_ref(),
        upload_type,
        Some(auth_user.user_id),
        &mut results,
    )
    .await;

    let response = UploadResponse::new(upload_type, results);
    info!(
        stored = response.results.len() - response.errors.len(),
        failed = response.errors.len(),
        "Upload batch processed"
    );

    let status = if response.success {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(response)))
}
