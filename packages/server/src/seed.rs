use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::BootstrapAdmin;
use crate::entity::{file_record, user};
use crate::utils::hash;

/// Create the configured administrator account unless the username already exists.
///
/// An existing account is left untouched, including its password and role.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    admin: &BootstrapAdmin,
) -> anyhow::Result<()> {
    let username = admin.username.trim();
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    if existing.is_some() {
        info!(username, "Bootstrap admin already exists");
        return Ok(());
    }

    let password = hash::hash_password(&admin.password)
        .map_err(|e| anyhow::anyhow!("Password hash error: {e}"))?;
    user::ActiveModel {
        username: Set(username.to_string()),
        password: Set(password),
        role: Set(user::ADMIN_ROLE.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(username, "Seeded bootstrap admin");
    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Listing by type and reconciling both scan on these columns.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_file_record_type_created")
        .table(file_record::Entity)
        .col(file_record::Column::UploadType)
        .col(file_record::Column::CreatedAt)
        .to_owned();
    create_index(db, "idx_file_record_type_created", &stmt).await;

    let stmt = Index::create()
        .if_not_exists()
        .name("idx_file_record_association")
        .table(file_record::Entity)
        .col(file_record::Column::AssociatedEntity)
        .col(file_record::Column::AssociatedEntityId)
        .to_owned();
    create_index(db, "idx_file_record_association", &stmt).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}
