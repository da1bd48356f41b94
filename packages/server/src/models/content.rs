use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{document, event, image, news};
use crate::error::AppError;
use crate::models::shared::{validate_title, validate_url};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateImageRequest {
    #[schema(example = "Maibaum 2026")]
    pub title: String,
    /// Public URL returned by the upload endpoint, or an external image URL.
    #[schema(example = "/uploads/gallery/1791234567890-3f2a9c0e4b1d4f7a8e6c5b4a3d2e1f00.jpg")]
    pub url: String,
    pub description: Option<String>,
}

impl CreateImageRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_url(&self.url, "url")
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateDocumentRequest {
    #[schema(example = "Protokoll Gemeinderat März")]
    pub title: String,
    #[schema(example = "/uploads/documents/1791234567890-aa0e4b1d4f7a8e6c5b4a3d2e1f003f2a.pdf")]
    pub file_url: String,
    #[schema(example = "Protokolle")]
    pub category: Option<String>,
}

impl CreateDocumentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_url(&self.file_url, "file_url")
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEventRequest {
    #[schema(example = "Dorffest")]
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        if let Some(ref url) = self.thumbnail_url {
            validate_url(url, "thumbnail_url")?;
        }
        Ok(())
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateNewsRequest {
    #[schema(example = "Neue Bank am Weiher")]
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
}

impl CreateNewsRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        if self.body.trim().is_empty() {
            return Err(AppError::Validation("Body must not be empty".into()));
        }
        if let Some(ref url) = self.image_url {
            validate_url(url, "image_url")?;
        }
        Ok(())
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Tracking record linked to this image, if the URL points at an upload.
    pub file_record_id: Option<i32>,
}

impl ImageResponse {
    pub fn new(m: image::Model, file_record_id: Option<i32>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            url: m.url,
            description: m.description,
            created_at: m.created_at,
            file_record_id,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentResponse {
    pub id: i32,
    pub title: String,
    pub file_url: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub file_record_id: Option<i32>,
}

impl DocumentResponse {
    pub fn new(m: document::Model, file_record_id: Option<i32>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            file_url: m.file_url,
            category: m.category,
            created_at: m.created_at,
            file_record_id,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    pub id: i32,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub file_record_id: Option<i32>,
}

impl EventResponse {
    pub fn new(m: event::Model, file_record_id: Option<i32>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            starts_at: m.starts_at,
            thumbnail_url: m.thumbnail_url,
            created_at: m.created_at,
            file_record_id,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NewsResponse {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub file_record_id: Option<i32>,
}

impl NewsResponse {
    pub fn new(m: news::Model, file_record_id: Option<i32>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            body: m.body,
            image_url: m.image_url,
            created_at: m.created_at,
            file_record_id,
        }
    }
}
