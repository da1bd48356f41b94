use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::UploadType;
use common::storage::BlobKey;
use tokio_util::io::ReaderStream;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::files::records::FileRecordStore;
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

/// Stream an uploaded file to the public site.
///
/// Storage names are never reused, so the name itself serves as the ETag.
#[instrument(skip(state, headers))]
pub async fn serve_upload(
    State(state): State<AppState>,
    Path((upload_type, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound("File not found".into());
    let upload_type: UploadType = upload_type.parse().map_err(|_| not_found())?;
    let key = BlobKey::new(upload_type, &filename).map_err(|_| not_found())?;

    let size = state.blob_store.size(&key).await?;

    let etag_value = format!("\"{}\"", key.filename());
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = state.blob_store.get_stream(&key).await?;

    let records = FileRecordStore::new(&state.db);
    let public_url = state.config.storage.public_url(upload_type, key.filename());
    let record = records.find_by_public_url(&public_url).await?;
    if let Some(ref record) = record
        && let Err(e) = records.touch_accessed(record.id).await
    {
        warn!(file_id = record.id, error = %e, "Failed to record file access");
    }

    let content_type = record
        .as_ref()
        .map(|r| r.mime_type.clone())
        .unwrap_or_else(|| {
            mime_guess::from_path(key.filename())
                .first_or_octet_stream()
                .to_string()
        });
    let display_name = record
        .as_ref()
        .map(|r| r.original_name.as_str())
        .unwrap_or(key.filename());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(display_name),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
