use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role with access to the admin CMS.
pub const ADMIN_ROLE: &str = "admin";

/// The role assigned to newly registered users.
pub const DEFAULT_ROLE: &str = "user";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    pub password: String,

    /// `admin` or `user`.
    pub role: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
