use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::files::images::{ImageCleanupReport, ImageHealth, ImageService, ImageValidationReport};
use crate::models::file::ImageCleanupRequest;
use crate::state::AppState;

fn image_service(state: &AppState) -> ImageService<'_, sea_orm::DatabaseConnection> {
    ImageService::new(
        &state.db,
        state.blob_store.as_ref(),
        &state.http,
        &state.config.storage,
    )
}

#[utoipa::path(
    get,
    path = "/validate",
    tag = "Images",
    operation_id = "validateImages",
    summary = "Check every gallery image",
    description = "Local images are checked in storage; external URLs are probed over HTTP.",
    responses(
        (status = 200, description = "Per-image status", body = ImageValidationReport),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn validate_images(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ImageValidationReport>, AppError> {
    auth_user.require_admin()?;
    Ok(Json(image_service(&state).validate_all_images().await?))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Images",
    operation_id = "imageHealth",
    summary = "Gallery health summary",
    responses(
        (status = 200, description = "Counts by status", body = ImageHealth),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn image_health(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ImageHealth>, AppError> {
    auth_user.require_admin()?;
    Ok(Json(image_service(&state).get_image_health_check().await?))
}

#[utoipa::path(
    post,
    path = "/cleanup",
    tag = "Images",
    operation_id = "cleanupImages",
    summary = "Clean up the gallery",
    description = "Targets image rows whose local file is missing and gallery files nothing \
        references. `dry_run` defaults to true.",
    request_body = ImageCleanupRequest,
    responses(
        (status = 200, description = "Cleanup outcome", body = ImageCleanupReport),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(dry_run = payload.dry_run))]
pub async fn cleanup_images(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImageCleanupRequest>,
) -> Result<Json<ImageCleanupReport>, AppError> {
    auth_user.require_admin()?;
    Ok(Json(
        image_service(&state)
            .cleanup_orphaned_images(payload.dry_run)
            .await?,
    ))
}
