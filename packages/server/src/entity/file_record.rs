use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Client-supplied name at upload time.
    pub original_name: String,

    /// Server-assigned storage name, unique within its upload directory.
    pub filename: String,

    /// Storage key relative to the uploads root (`{upload_type}/{filename}`).
    pub file_path: String,

    #[sea_orm(unique)]
    pub public_url: String,

    pub mime_type: String,

    pub file_size: i64,

    /// One of `gallery`, `news`, `documents`, `events`.
    pub upload_type: String,

    pub uploaded_by: Option<i32>,

    /// Owner kind (`image`, `document`, `event`, `news`).
    pub associated_entity: Option<String>,

    pub associated_entity_id: Option<i32>,

    /// Cached result of the last reconciliation, not a source of truth.
    pub is_orphaned: bool,

    pub last_accessed_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
