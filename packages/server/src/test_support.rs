//! Fixtures shared by the unit tests.

use chrono::{Duration, Utc};
use common::UploadType;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::{BlobKey, BlobStore};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tempfile::TempDir;

use crate::config::DatabaseConfig;
use crate::database::init_db;
use crate::entity::{document, event, file_record, image, news};
use crate::files::records::{FileRecordStore, NewFileRecord};

/// Fresh SQLite database with the full schema, living as long as the returned directory.
pub async fn test_db() -> (DatabaseConnection, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display()),
        max_connections: 4,
        min_connections: 1,
    };
    let db = init_db(&config).await.unwrap();
    (db, dir)
}

pub async fn test_blob_store() -> (FilesystemBlobStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = FilesystemBlobStore::new(dir.path().to_path_buf())
        .await
        .unwrap();
    (store, dir)
}

pub fn new_record(upload_type: UploadType, filename: &str) -> NewFileRecord {
    NewFileRecord {
        original_name: filename.to_string(),
        filename: filename.to_string(),
        file_path: format!("{upload_type}/{filename}"),
        public_url: format!("/uploads/{upload_type}/{filename}"),
        mime_type: "image/jpeg".to_string(),
        file_size: 10,
        upload_type,
        uploaded_by: None,
        owner: None,
    }
}

/// Write a blob under `filename` and track it.
pub async fn store_record(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
    upload_type: UploadType,
    filename: &str,
) -> file_record::Model {
    let key = BlobKey::new(upload_type, filename).unwrap();
    blobs.put_new(&key, b"0123456789").await.unwrap();
    FileRecordStore::new(db)
        .create(new_record(upload_type, filename))
        .await
        .unwrap()
}

/// Move a record's creation time into the past.
pub async fn backdate(db: &DatabaseConnection, id: i32, age: Duration) {
    let record = file_record::Entity::find_by_id(id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    let mut active: file_record::ActiveModel = record.into();
    active.created_at = Set(Utc::now() - age);
    active.update(db).await.unwrap();
}

pub async fn insert_image(db: &DatabaseConnection, url: &str) -> image::Model {
    image::ActiveModel {
        title: Set("Dorfplatz".into()),
        url: Set(url.to_string()),
        description: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_document(db: &DatabaseConnection, url: &str) -> document::Model {
    document::ActiveModel {
        title: Set("Protokoll".into()),
        file_url: Set(url.to_string()),
        category: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_event(db: &DatabaseConnection, thumbnail_url: Option<&str>) -> event::Model {
    event::ActiveModel {
        title: Set("Dorffest".into()),
        starts_at: Set(Utc::now() + Duration::days(7)),
        thumbnail_url: Set(thumbnail_url.map(String::from)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn insert_news(db: &DatabaseConnection, image_url: Option<&str>) -> news::Model {
    news::ActiveModel {
        title: Set("Neue Bank am Weiher".into()),
        body: Set("Der Heimatverein hat eine Bank aufgestellt.".into()),
        image_url: Set(image_url.map(String::from)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
