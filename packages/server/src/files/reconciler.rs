use chrono::{DateTime, Duration, Utc};
use common::storage::{BlobKey, BlobStore};
use sea_orm::{ConnectionTrait, DbErr};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::association::{OwnerIndex, OwnerKind};
use super::records::FileRecordStore;
use crate::entity::file_record;

/// Owner a record claims, when both association fields are set.
fn claimed_owner(record: &file_record::Model) -> Option<Result<(OwnerKind, i32), ()>> {
    match (&record.associated_entity, record.associated_entity_id) {
        (Some(kind), Some(id)) => Some(kind.parse::<OwnerKind>().map(|k| (k, id)).map_err(|_| ())),
        _ => None,
    }
}

/// Decide whether a record has no live owner.
///
/// A record referenced by an owner's URL column is live regardless of its
/// association fields. A stale association makes it an orphan immediately; an
/// unassociated record only after the grace period, since it may still be
/// between upload and association.
pub fn is_orphaned(
    record: &file_record::Model,
    owners: &OwnerIndex,
    now: DateTime<Utc>,
    grace_period: Duration,
) -> bool {
    if owners.references_url(&record.public_url) {
        return false;
    }
    match claimed_owner(record) {
        Some(Ok((kind, id))) => !owners.owner_exists(kind, id),
        Some(Err(())) => true,
        None => now - record.created_at >= grace_period,
    }
}

/// Change counts from recomputing the cached orphan flags.
#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct FlagRefresh {
    pub flagged: u64,
    pub cleared: u64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CleanupError {
    pub file_id: i32,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct CleanupReport {
    /// Physical files removed.
    pub files_deleted: u64,
    /// Tracking rows removed.
    pub records_deleted: u64,
    pub errors: Vec<CleanupError>,
    /// Storage paths left on disk without a tracking record.
    pub untracked_files: Vec<String>,
}

pub struct OrphanReconciler<'a, C: ConnectionTrait> {
    conn: &'a C,
    grace_period: Duration,
}

impl<'a, C: ConnectionTrait> OrphanReconciler<'a, C> {
    pub fn new(conn: &'a C, grace_period: Duration) -> Self {
        Self { conn, grace_period }
    }

    /// Every record with no live owner.
    pub async fn find_orphaned_files(&self) -> Result<Vec<file_record::Model>, DbErr> {
        let now = Utc::now();
        let owners = OwnerIndex::load(self.conn).await?;
        let records = FileRecordStore::new(self.conn).list_all().await?;

        Ok(records
            .into_iter()
            .filter(|r| is_orphaned(r, &owners, now, self.grace_period))
            .collect())
    }

    /// Recompute and persist `is_orphaned` for every record.
    #[instrument(skip(self))]
    pub async fn refresh_orphan_flags(&self) -> Result<FlagRefresh, DbErr> {
        let now = Utc::now();
        let owners = OwnerIndex::load(self.conn).await?;
        let store = FileRecordStore::new(self.conn);

        let (orphaned, live): (Vec<_>, Vec<_>) = store
            .list_all()
            .await?
            .into_iter()
            .partition(|r| is_orphaned(r, &owners, now, self.grace_period));

        let orphaned: Vec<i32> = orphaned.iter().map(|r| r.id).collect();
        let live: Vec<i32> = live.iter().map(|r| r.id).collect();

        let refresh = FlagRefresh {
            flagged: store.set_orphaned(&orphaned, true).await?,
            cleared: store.set_orphaned(&live, false).await?,
        };
        info!(
            flagged = refresh.flagged,
            cleared = refresh.cleared,
            "Refreshed orphan flags"
        );
        Ok(refresh)
    }

    /// Delete every orphaned record, and its blob when `delete_files` is set.
    ///
    /// Each record is its own unit of work; a failure is reported and the
    /// sweep moves on. With `delete_files` unset the blobs stay on disk with
    /// no tracking row; they are logged and listed for manual audit.
    #[instrument(skip(self, blobs))]
    pub async fn cleanup_orphaned_files(
        &self,
        blobs: &dyn BlobStore,
        delete_files: bool,
    ) -> Result<CleanupReport, DbErr> {
        let candidates: Vec<i32> = self
            .find_orphaned_files()
            .await?
            .iter()
            .map(|r| r.id)
            .collect();
        Ok(self.remove_orphans(blobs, &candidates, delete_files).await)
    }

    /// Reload a candidate and return it only if it is still orphaned.
    async fn recheck(&self, id: i32) -> Result<Option<file_record::Model>, DbErr> {
        let Some(record) = FileRecordStore::new(self.conn).find_by_id(id).await? else {
            return Ok(None);
        };
        let claimed = claimed_owner(&record).and_then(Result::ok);
        let owners = OwnerIndex::for_record(self.conn, &record.public_url, claimed).await?;
        if is_orphaned(&record, &owners, Utc::now(), self.grace_period) {
            Ok(Some(record))
        } else {
            debug!(file_id = id, "Record gained an owner, skipping");
            Ok(None)
        }
    }

    async fn remove_orphans(
        &self,
        blobs: &dyn BlobStore,
        candidates: &[i32],
        delete_files: bool,
    ) -> CleanupReport {
        let store = FileRecordStore::new(self.conn);
        let mut report = CleanupReport::default();

        for &id in candidates {
            let record = match self.recheck(id).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!(file_id = id, error = %e, "Failed to recheck orphaned record");
                    report.errors.push(CleanupError {
                        file_id: id,
                        error: format!("Failed to load record: {e}"),
                    });
                    continue;
                }
            };

            match store.delete(id).await {
                Ok(true) => report.records_deleted += 1,
                Ok(false) => continue,
                Err(e) => {
                    warn!(file_id = id, error = %e, "Failed to delete orphaned record");
                    report.errors.push(CleanupError {
                        file_id: id,
                        error: format!("Failed to delete record: {e}"),
                    });
                    continue;
                }
            }

            let key = match BlobKey::parse(&record.file_path) {
                Ok(key) => key,
                Err(e) => {
                    report.errors.push(CleanupError {
                        file_id: id,
                        error: format!("Invalid storage path '{}': {e}", record.file_path),
                    });
                    continue;
                }
            };

            if !delete_files {
                let on_disk = blobs.path_of(&key);
                warn!(file_id = id, path = %on_disk.display(), "Orphaned record removed, file left on disk untracked");
                report.untracked_files.push(record.file_path);
                continue;
            }

            match blobs.delete(&key).await {
                Ok(true) => report.files_deleted += 1,
                Ok(false) => {
                    info!(file_id = id, path = %record.file_path, "Orphaned record had no physical file");
                }
                Err(e) => {
                    warn!(file_id = id, path = %record.file_path, error = %e, "Failed to delete orphaned file");
                    report.errors.push(CleanupError {
                        file_id: id,
                        error: format!("Failed to delete physical file: {e}"),
                    });
                    report.untracked_files.push(record.file_path);
                }
            }
        }

        info!(
            files_deleted = report.files_deleted,
            records_deleted = report.records_deleted,
            errors = report.errors.len(),
            delete_files,
            "Orphan cleanup finished"
        );
        report
    }
}
