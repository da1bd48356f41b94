//! Content owners: the gallery, documents, events and news rows that reference uploads.
//!
//! Creating an owner links the file record tracked under its URL. Deleting one
//! leaves the record in place; the orphan reconciler picks it up.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DeleteResult, EntityTrait, Set};
use tracing::{info, instrument};

use crate::entity::{document, event, image, news};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::files::association::{OwnerKind, link_owner};
use crate::models::content::{
    CreateDocumentRequest, CreateEventRequest, CreateImageRequest, CreateNewsRequest,
    DocumentResponse, EventResponse, ImageResponse, NewsResponse,
};
use crate::state::AppState;

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn deleted_or_not_found(
    result: DeleteResult,
    kind: OwnerKind,
    id: i32,
) -> Result<StatusCode, AppError> {
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("{kind} {id} not found")));
    }
    info!(owner = %kind, owner_id = id, "Owner deleted, its files are left for orphan cleanup");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Images",
    operation_id = "createImage",
    summary = "Add a gallery image",
    request_body = CreateImageRequest,
    responses(
        (status = 201, description = "Image created", body = ImageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    payload.validate()?;

    let row = image::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        url: Set(payload.url.trim().to_string()),
        description: Set(trimmed(payload.description)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let file_id = link_owner(&state.db, Some(&row.url), OwnerKind::Image, row.id).await;
    Ok((StatusCode::CREATED, Json(ImageResponse::new(row, file_id))))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Remove a gallery image",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(image_id = id))]
pub async fn delete_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;
    let result = image::Entity::delete_by_id(id).exec(&state.db).await?;
    deleted_or_not_found(result, OwnerKind::Image, id)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Documents",
    operation_id = "createDocument",
    summary = "Publish a document",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_document(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    payload.validate()?;

    let row = document::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        file_url: Set(payload.file_url.trim().to_string()),
        category: Set(trimmed(payload.category)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let file_id = link_owner(&state.db, Some(&row.file_url), OwnerKind::Document, row.id).await;
    Ok((StatusCode::CREATED, Json(DocumentResponse::new(row, file_id))))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Documents",
    operation_id = "deleteDocument",
    summary = "Remove a document",
    params(("id" = i32, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(document_id = id))]
pub async fn delete_document(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;
    let result = document::Entity::delete_by_id(id).exec(&state.db).await?;
    deleted_or_not_found(result, OwnerKind::Document, id)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Events",
    operation_id = "createEvent",
    summary = "Announce an event",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    payload.validate()?;

    let row = event::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        starts_at: Set(payload.starts_at),
        thumbnail_url: Set(trimmed(payload.thumbnail_url)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let file_id = link_owner(
        &state.db,
        row.thumbnail_url.as_deref(),
        OwnerKind::Event,
        row.id,
    )
    .await;
    Ok((StatusCode::CREATED, Json(EventResponse::new(row, file_id))))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Events",
    operation_id = "deleteEvent",
    summary = "Remove an event",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(event_id = id))]
pub async fn delete_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;
    let result = event::Entity::delete_by_id(id).exec(&state.db).await?;
    deleted_or_not_found(result, OwnerKind::Event, id)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "News",
    operation_id = "createNews",
    summary = "Publish a news article",
    request_body = CreateNewsRequest,
    responses(
        (status = 201, description = "Article created", body = NewsResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateNewsRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    payload.validate()?;

    let row = news::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        body: Set(payload.body),
        image_url: Set(trimmed(payload.image_url)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let file_id = link_owner(&state.db, row.image_url.as_deref(), OwnerKind::News, row.id).await;
    Ok((StatusCode::CREATED, Json(NewsResponse::new(row, file_id))))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "News",
    operation_id = "deleteNews",
    summary = "Remove a news article",
    params(("id" = i32, Path, description = "News ID")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(news_id = id))]
pub async fn delete_news(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;
    let result = news::Entity::delete_by_id(id).exec(&state.db).await?;
    deleted_or_not_found(result, OwnerKind::News, id)
}
