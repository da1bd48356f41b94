use chrono::Utc;
use common::UploadType;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use thiserror::Error;

use super::association::OwnerKind;
use crate::entity::file_record;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{0}")]
    Validation(String),
    #[error("file record for '{0}' already exists")]
    DuplicateUrl(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Fields required to track a freshly stored blob.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub original_name: String,
    pub filename: String,
    pub file_path: String,
    pub public_url: String,
    pub mime_type: String,
    pub file_size: i64,
    pub upload_type: UploadType,
    pub uploaded_by: Option<i32>,
    /// Owner known at creation time, if any.
    pub owner: Option<(OwnerKind, i32)>,
}

/// Partial update. `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct FileRecordPatch {
    pub original_name: Option<String>,
    pub is_orphaned: Option<bool>,
    pub associated_entity: Option<Option<OwnerKind>>,
    pub associated_entity_id: Option<Option<i32>>,
}

impl NewFileRecord {
    fn validate(&self) -> Result<(), RecordError> {
        let required = [
            ("filename", &self.filename),
            ("file_path", &self.file_path),
            ("public_url", &self.public_url),
            ("mime_type", &self.mime_type),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(RecordError::Validation(format!("{name} must not be empty")));
            }
        }
        if self.file_size < 0 {
            return Err(RecordError::Validation("file_size must be >= 0".into()));
        }
        Ok(())
    }
}

pub struct FileRecordStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> FileRecordStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new: NewFileRecord) -> Result<file_record::Model, RecordError> {
        new.validate()?;

        let now = Utc::now();
        let (associated_entity, associated_entity_id) = match new.owner {
            Some((kind, id)) => (Some(kind.as_str().to_string()), Some(id)),
            None => (None, None),
        };
        let original_name = if new.original_name.trim().is_empty() {
            new.filename.clone()
        } else {
            new.original_name
        };

        let model = file_record::ActiveModel {
            original_name: Set(original_name),
            filename: Set(new.filename),
            file_path: Set(new.file_path),
            public_url: Set(new.public_url.clone()),
            mime_type: Set(new.mime_type),
            file_size: Set(new.file_size),
            upload_type: Set(new.upload_type.as_str().to_string()),
            uploaded_by: Set(new.uploaded_by),
            associated_entity: Set(associated_entity),
            associated_entity_id: Set(associated_entity_id),
            is_orphaned: Set(false),
            last_accessed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model.insert(self.conn).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => RecordError::DuplicateUrl(new.public_url),
            _ => RecordError::Db(e),
        })
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<file_record::Model>, DbErr> {
        file_record::Entity::find_by_id(id).one(self.conn).await
    }

    pub async fn find_by_public_url(
        &self,
        public_url: &str,
    ) -> Result<Option<file_record::Model>, DbErr> {
        file_record::Entity::find()
            .filter(file_record::Column::PublicUrl.eq(public_url))
            .one(self.conn)
            .await
    }

    pub async fn list_all(&self) -> Result<Vec<file_record::Model>, DbErr> {
        file_record::Entity::find()
            .order_by_asc(file_record::Column::Id)
            .all(self.conn)
            .await
    }

    pub async fn list_by_type(
        &self,
        upload_type: UploadType,
    ) -> Result<Vec<file_record::Model>, DbErr> {
        file_record::Entity::find()
            .filter(file_record::Column::UploadType.eq(upload_type.as_str()))
            .order_by_asc(file_record::Column::Id)
            .all(self.conn)
            .await
    }

    /// Apply a partial update. Returns `None` when no record has this id.
    pub async fn update(
        &self,
        id: i32,
        patch: FileRecordPatch,
    ) -> Result<Option<file_record::Model>, RecordError> {
        if let Some(ref name) = patch.original_name
            && name.trim().is_empty()
        {
            return Err(RecordError::Validation(
                "original_name must not be empty".into(),
            ));
        }

        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut active: file_record::ActiveModel = existing.into();
        if let Some(name) = patch.original_name {
            active.original_name = Set(name.trim().to_string());
        }
        if let Some(flag) = patch.is_orphaned {
            active.is_orphaned = Set(flag);
        }
        if let Some(kind) = patch.associated_entity {
            active.associated_entity = Set(kind.map(|k| k.as_str().to_string()));
        }
        if let Some(owner_id) = patch.associated_entity_id {
            active.associated_entity_id = Set(owner_id);
        }
        active.updated_at = Set(Utc::now());

        Ok(Some(active.update(self.conn).await?))
    }

    /// Delete a record. Returns `false` when no record had this id.
    pub async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let result = file_record::Entity::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn touch_accessed(&self, id: i32) -> Result<(), DbErr> {
        file_record::Entity::update_many()
            .col_expr(file_record::Column::LastAccessedAt, Expr::value(Utc::now()))
            .filter(file_record::Column::Id.eq(id))
            .exec(self.conn)
            .await?;
        Ok(())
    }

    /// Set the cached orphan flag on many records. Returns the number of rows changed.
    pub async fn set_orphaned(&self, ids: &[i32], orphaned: bool) -> Result<u64, DbErr> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = file_record::Entity::update_many()
            .col_expr(file_record::Column::IsOrphaned, Expr::value(orphaned))
            .col_expr(file_record::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(file_record::Column::Id.is_in(ids.to_vec()))
            .filter(file_record::Column::IsOrphaned.ne(orphaned))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
