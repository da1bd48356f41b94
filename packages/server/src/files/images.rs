use std::time::Duration as StdDuration;

use chrono::Utc;
use common::UploadType;
use common::storage::{BlobKey, BlobStore};
use reqwest::StatusCode;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QueryOrder};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::association::OwnerIndex;
use super::records::FileRecordStore;
use super::upload::storage_name_timestamp;
use crate::config::StorageConfig;
use crate::entity::image;

/// Result of checking one gallery image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Ok,
    MissingLocalFile,
    Unreachable,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ImageCheck {
    pub image_id: i32,
    pub title: String,
    pub url: String,
    pub status: ImageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ImageValidationReport {
    pub total_images: usize,
    pub checks: Vec<ImageCheck>,
}

impl ImageValidationReport {
    fn count(&self, status: ImageStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ImageHealth {
    pub total_images: usize,
    pub unreachable_urls: usize,
    pub missing_local_files: usize,
    pub healthy_images: usize,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct ImageCleanupReport {
    pub dry_run: bool,
    /// Image rows whose local file is gone.
    pub broken_images: Vec<ImageCheck>,
    /// Gallery files that no record tracks and no owner references.
    pub untracked_files: Vec<String>,
    pub images_deleted: u64,
    pub records_deleted: u64,
    pub files_deleted: u64,
    pub errors: Vec<String>,
}

enum ImageLocation {
    Local(BlobKey),
    Remote,
    Invalid(String),
}

pub struct ImageService<'a, C: ConnectionTrait> {
    conn: &'a C,
    blobs: &'a dyn BlobStore,
    http: &'a reqwest::Client,
    storage: &'a StorageConfig,
}

impl<'a, C: ConnectionTrait> ImageService<'a, C> {
    pub fn new(
        conn: &'a C,
        blobs: &'a dyn BlobStore,
        http: &'a reqwest::Client,
        storage: &'a StorageConfig,
    ) -> Self {
        Self {
            conn,
            blobs,
            http,
            storage,
        }
    }

    fn locate(&self, url: &str) -> ImageLocation {
        let prefix = format!("{}/", self.storage.public_prefix.trim_end_matches('/'));
        if let Some(rest) = url.strip_prefix(&prefix) {
            return match BlobKey::parse(rest) {
                Ok(key) => ImageLocation::Local(key),
                Err(e) => ImageLocation::Invalid(e.to_string()),
            };
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            ImageLocation::Remote
        } else {
            ImageLocation::Invalid(format!("unsupported image URL '{url}'"))
        }
    }

    async fn probe(&self, url: &str) -> Result<(), String> {
        let timeout = StdDuration::from_secs(self.storage.probe_timeout_secs);
        let response = self
            .http
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        // Some hosts refuse HEAD outright.
        let status = if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            self.http
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| e.to_string())?
                .status()
        } else {
            response.status()
        };

        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {status}"))
        }
    }

    async fn check(&self, row: &image::Model) -> ImageCheck {
        let (status, detail) = match self.locate(&row.url) {
            ImageLocation::Local(key) => match self.blobs.exists(&key).await {
                Ok(true) => (ImageStatus::Ok, None),
                Ok(false) => (ImageStatus::MissingLocalFile, None),
                Err(e) => (ImageStatus::MissingLocalFile, Some(e.to_string())),
            },
            ImageLocation::Remote => match self.probe(&row.url).await {
                Ok(()) => (ImageStatus::Ok, None),
                Err(e) => (ImageStatus::Unreachable, Some(e)),
            },
            ImageLocation::Invalid(reason) => (ImageStatus::Unreachable, Some(reason)),
        };
        ImageCheck {
            image_id: row.id,
            title: row.title.clone(),
            url: row.url.clone(),
            status,
            detail,
        }
    }

    #[instrument(skip(self))]
    pub async fn validate_all_images(&self) -> Result<ImageValidationReport, DbErr> {
        let rows = image::Entity::find()
            .order_by_asc(image::Column::Id)
            .all(self.conn)
            .await?;

        let mut checks = Vec::with_capacity(rows.len());
        for row in &rows {
            let check = self.check(row).await;
            if check.status != ImageStatus::Ok {
                debug!(image_id = row.id, url = %row.url, status = ?check.status, "Image check failed");
            }
            checks.push(check);
        }

        Ok(ImageValidationReport {
            total_images: rows.len(),
            checks,
        })
    }

    pub async fn get_image_health_check(&self) -> Result<ImageHealth, DbErr> {
        let report = self.validate_all_images().await?;
        Ok(ImageHealth {
            total_images: report.total_images,
            unreachable_urls: report.count(ImageStatus::Unreachable),
            missing_local_files: report.count(ImageStatus::MissingLocalFile),
            healthy_images: report.count(ImageStatus::Ok),
        })
    }

    /// Gallery files nobody tracks or references, past the grace period.
    async fn untracked_gallery_files(&self) -> Result<Vec<String>, DbErr> {
        let names = match self.blobs.list(UploadType::Gallery).await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to list gallery files");
                return Ok(Vec::new());
            }
        };

        let owners = OwnerIndex::load(self.conn).await?;
        let records = FileRecordStore::new(self.conn);
        let cutoff = Utc::now() - self.storage.orphan_grace_period();

        let mut untracked = Vec::new();
        for name in names {
            if storage_name_timestamp(&name).is_some_and(|stored| stored > cutoff) {
                continue;
            }
            let url = self.storage.public_url(UploadType::Gallery, &name);
            if owners.references_url(&url) || records.find_by_public_url(&url).await?.is_some() {
                continue;
            }
            untracked.push(name);
        }
        Ok(untracked)
    }

    /// Remove broken image rows and untracked gallery files. Reports only when `dry_run`.
    #[instrument(skip(self))]
    pub async fn cleanup_orphaned_images(&self, dry_run: bool) -> Result<ImageCleanupReport, DbErr> {
        let validation = self.validate_all_images().await?;
        let mut report = ImageCleanupReport {
            dry_run,
            broken_images: validation
                .checks
                .into_iter()
                .filter(|c| c.status == ImageStatus::MissingLocalFile)
                .collect(),
            untracked_files: self.untracked_gallery_files().await?,
            ..Default::default()
        };

        if dry_run {
            info!(
                broken_images = report.broken_images.len(),
                untracked_files = report.untracked_files.len(),
                "Image cleanup dry run"
            );
            return Ok(report);
        }

        let records = FileRecordStore::new(self.conn);
        for check in &report.broken_images {
            let record = match records.find_by_public_url(&check.url).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(image_id = check.image_id, error = %e, "Failed to look up image record");
                    report.errors.push(format!("image {}: {e}", check.image_id));
                    continue;
                }
            };
            if let Some(record) = record {
                match records.delete(record.id).await {
                    Ok(true) => report.records_deleted += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(image_id = check.image_id, file_id = record.id, error = %e, "Failed to delete image record");
                        report.errors.push(format!("image {}: {e}", check.image_id));
                        continue;
                    }
                }
            }
            match image::Entity::delete_by_id(check.image_id)
                .exec(self.conn)
                .await
            {
                Ok(deleted) => report.images_deleted += deleted.rows_affected,
                Err(e) => {
                    warn!(image_id = check.image_id, error = %e, "Failed to delete broken image");
                    report.errors.push(format!("image {}: {e}", check.image_id));
                }
            }
        }

        for name in &report.untracked_files {
            let key = match BlobKey::new(UploadType::Gallery, name) {
                Ok(key) => key,
                Err(e) => {
                    report.errors.push(format!("{name}: {e}"));
                    continue;
                }
            };
            match self.blobs.delete(&key).await {
                Ok(true) => report.files_deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %key, error = %e, "Failed to delete untracked gallery file");
                    report.errors.push(format!("{key}: {e}"));
                }
            }
        }

        info!(
            images_deleted = report.images_deleted,
            records_deleted = report.records_deleted,
            files_deleted = report.files_deleted,
            errors = report.errors.len(),
            "Image cleanup finished"
        );
        Ok(report)
    }
}
