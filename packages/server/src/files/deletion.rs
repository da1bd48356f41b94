use common::storage::{BlobKey, BlobStore};
use sea_orm::{ConnectionTrait, DbErr, TransactionSession, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::association::detach_owner_references;
use super::records::FileRecordStore;

/// Soft-success result: the row is gone when `success` is set, even with a `warning`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DeleteOutcome {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            warning: None,
        }
    }

    fn deleted(warning: Option<String>) -> Self {
        Self {
            success: true,
            error: None,
            warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct BulkDeleteResult {
    pub id: i32,
    #[serde(flatten)]
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct BulkDeleteError {
    pub id: i32,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct BulkDeleteReport {
    pub success_count: usize,
    pub results: Vec<BulkDeleteResult>,
    pub errors: Vec<BulkDeleteError>,
}

pub struct DeletionCoordinator<'a, C: ConnectionTrait + TransactionTrait> {
    conn: &'a C,
    blobs: &'a dyn BlobStore,
}

impl<'a, C: ConnectionTrait + TransactionTrait> DeletionCoordinator<'a, C> {
    pub fn new(conn: &'a C, blobs: &'a dyn BlobStore) -> Self {
        Self { conn, blobs }
    }

    /// Remove a file's tracking row and then its blob.
    ///
    /// Owner references are detached and the row deleted in one transaction;
    /// the blob is only touched once that commits. Blob failures after the
    /// commit produce a warning, never a dangling record.
    #[instrument(skip(self))]
    pub async fn delete_file_completely(&self, id: i32) -> Result<DeleteOutcome, DbErr> {
        let Some(record) = FileRecordStore::new(self.conn).find_by_id(id).await? else {
            return Ok(DeleteOutcome::failed(format!("File record {id} not found")));
        };

        let txn = self.conn.begin().await?;
        let detached = detach_owner_references(&txn, &record.public_url).await?;
        if !FileRecordStore::new(&txn).delete(id).await? {
            txn.rollback().await?;
            return Ok(DeleteOutcome::failed(format!("File record {id} not found")));
        }
        txn.commit().await?;
        if detached > 0 {
            info!(file_id = id, owners = detached, "Detached owner references");
        }

        let warning = match BlobKey::parse(&record.file_path) {
            Ok(key) => match self.blobs.delete(&key).await {
                Ok(true) => None,
                Ok(false) => Some(format!("Physical file not found: {}", record.file_path)),
                Err(e) => Some(format!("Failed to delete physical file: {e}")),
            },
            Err(e) => Some(format!(
                "Invalid storage path '{}': {e}",
                record.file_path
            )),
        };
        if let Some(ref w) = warning {
            warn!(file_id = id, path = %record.file_path, warning = %w, "Record deleted without its file");
        }

        info!(file_id = id, path = %record.file_path, "File deleted");
        Ok(DeleteOutcome::deleted(warning))
    }

    /// Delete each id in turn. A database error is recorded for that id and the batch continues.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_delete(&self, ids: &[i32]) -> BulkDeleteReport {
        let mut report = BulkDeleteReport::default();
        for &id in ids {
            match self.delete_file_completely(id).await {
                Ok(outcome) => {
                    if outcome.success {
                        report.success_count += 1;
                    }
                    report.results.push(BulkDeleteResult { id, outcome });
                }
                Err(e) => {
                    warn!(file_id = id, error = %e, "Bulk delete failed for file");
                    report.errors.push(BulkDeleteError {
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}
