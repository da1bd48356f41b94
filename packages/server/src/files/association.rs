use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::records::FileRecordStore;
use crate::entity::{document, event, file_record, image, news};

/// Kind of content entity that can own an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Image,
    Document,
    Event,
    News,
}

impl OwnerKind {
    pub const ALL: [OwnerKind; 4] = [
        OwnerKind::Image,
        OwnerKind::Document,
        OwnerKind::Event,
        OwnerKind::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Event => "event",
            Self::News => "news",
        }
    }

    /// Whether an owner row with this id currently exists.
    pub async fn exists<C: ConnectionTrait>(&self, conn: &C, id: i32) -> Result<bool, DbErr> {
        let count = match self {
            Self::Image => image::Entity::find_by_id(id).count(conn).await?,
            Self::Document => document::Entity::find_by_id(id).count(conn).await?,
            Self::Event => event::Entity::find_by_id(id).count(conn).await?,
            Self::News => news::Entity::find_by_id(id).count(conn).await?,
        };
        Ok(count > 0)
    }

    async fn ids<C: ConnectionTrait>(&self, conn: &C) -> Result<Vec<i32>, DbErr> {
        match self {
            Self::Image => {
                image::Entity::find()
                    .select_only()
                    .column(image::Column::Id)
                    .into_tuple()
                    .all(conn)
                    .await
            }
            Self::Document => {
                document::Entity::find()
                    .select_only()
                    .column(document::Column::Id)
                    .into_tuple()
                    .all(conn)
                    .await
            }
            Self::Event => {
                event::Entity::find()
                    .select_only()
                    .column(event::Column::Id)
                    .into_tuple()
                    .all(conn)
                    .await
            }
            Self::News => {
                news::Entity::find()
                    .select_only()
                    .column(news::Column::Id)
                    .into_tuple()
                    .all(conn)
                    .await
            }
        }
    }

    /// Whether an owner of this kind holds `url` in its blob column.
    pub async fn references<C: ConnectionTrait>(&self, conn: &C, url: &str) -> Result<bool, DbErr> {
        let count = match self {
            Self::Image => {
                image::Entity::find()
                    .filter(image::Column::Url.eq(url))
                    .count(conn)
                    .await?
            }
            Self::Document => {
                document::Entity::find()
                    .filter(document::Column::FileUrl.eq(url))
                    .count(conn)
                    .await?
            }
            Self::Event => {
                event::Entity::find()
                    .filter(event::Column::ThumbnailUrl.eq(url))
                    .count(conn)
                    .await?
            }
            Self::News => {
                news::Entity::find()
                    .filter(news::Column::ImageUrl.eq(url))
                    .count(conn)
                    .await?
            }
        };
        Ok(count > 0)
    }

    /// Every non-null blob URL held by owners of this kind.
    pub async fn referenced_urls<C: ConnectionTrait>(&self, conn: &C) -> Result<Vec<String>, DbErr> {
        match self {
            Self::Image => {
                image::Entity::find()
                    .select_only()
                    .column(image::Column::Url)
                    .into_tuple()
                    .all(conn)
                    .await
            }
            Self::Document => {
                document::Entity::find()
                    .select_only()
                    .column(document::Column::FileUrl)
                    .into_tuple()
                    .all(conn)
                    .await
            }
            Self::Event => {
                let urls: Vec<Option<String>> = event::Entity::find()
                    .select_only()
                    .column(event::Column::ThumbnailUrl)
                    .filter(event::Column::ThumbnailUrl.is_not_null())
                    .into_tuple()
                    .all(conn)
                    .await?;
                Ok(urls.into_iter().flatten().collect())
            }
            Self::News => {
                let urls: Vec<Option<String>> = news::Entity::find()
                    .select_only()
                    .column(news::Column::ImageUrl)
                    .filter(news::Column::ImageUrl.is_not_null())
                    .into_tuple()
                    .all(conn)
                    .await?;
                Ok(urls.into_iter().flatten().collect())
            }
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            "event" => Ok(Self::Event),
            "news" => Ok(Self::News),
            other => Err(format!("unknown owner kind: {other}")),
        }
    }
}

/// Snapshot of which owners exist and which blob URLs they reference.
#[derive(Debug, Default)]
pub struct OwnerIndex {
    ids: HashMap<OwnerKind, HashSet<i32>>,
    urls: HashSet<String>,
}

impl OwnerIndex {
    pub async fn load<C: ConnectionTrait>(conn: &C) -> Result<Self, DbErr> {
        let mut index = Self::default();
        for kind in OwnerKind::ALL {
            index
                .ids
                .insert(kind, kind.ids(conn).await?.into_iter().collect());
            index.urls.extend(kind.referenced_urls(conn).await?);
        }
        Ok(index)
    }

    /// Index narrowed to one record: its claimed owner and its public URL.
    pub async fn for_record<C: ConnectionTrait>(
        conn: &C,
        public_url: &str,
        claimed: Option<(OwnerKind, i32)>,
    ) -> Result<Self, DbErr> {
        let mut index = Self::default();
        if let Some((kind, id)) = claimed
            && kind.exists(conn, id).await?
        {
            index.ids.entry(kind).or_default().insert(id);
        }
        for kind in OwnerKind::ALL {
            if kind.references(conn, public_url).await? {
                index.urls.insert(public_url.to_string());
                break;
            }
        }
        Ok(index)
    }

    pub fn owner_exists(&self, kind: OwnerKind, id: i32) -> bool {
        self.ids.get(&kind).is_some_and(|ids| ids.contains(&id))
    }

    pub fn references_url(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, kind: OwnerKind, id: i32, url: Option<&str>) {
        self.ids.entry(kind).or_default().insert(id);
        if let Some(url) = url {
            self.urls.insert(url.to_string());
        }
    }
}

/// Outcome of linking a record to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationOutcome {
    /// The record with this id now points at the owner.
    Linked(i32),
    /// No record is tracked under the URL; nothing was changed.
    NoRecord,
}

/// Point the record tracked under `public_url` at its owner and clear its orphan flag.
pub async fn associate_by_url<C: ConnectionTrait>(
    conn: &C,
    public_url: &str,
    kind: OwnerKind,
    owner_id: i32,
) -> Result<AssociationOutcome, DbErr> {
    let Some(record) = FileRecordStore::new(conn)
        .find_by_public_url(public_url)
        .await?
    else {
        return Ok(AssociationOutcome::NoRecord);
    };

    let mut active: file_record::ActiveModel = record.into();
    active.associated_entity = Set(Some(kind.as_str().to_string()));
    active.associated_entity_id = Set(Some(owner_id));
    active.is_orphaned = Set(false);
    active.updated_at = Set(Utc::now());
    let updated = active.update(conn).await?;

    Ok(AssociationOutcome::Linked(updated.id))
}

/// Best-effort association used after an owner row has been created.
///
/// Never fails the caller: a missing record or a database error is logged and
/// left for the orphan reconciler.
pub async fn link_owner<C: ConnectionTrait>(
    conn: &C,
    public_url: Option<&str>,
    kind: OwnerKind,
    owner_id: i32,
) -> Option<i32> {
    let public_url = public_url?;
    match associate_by_url(conn, public_url, kind, owner_id).await {
        Ok(AssociationOutcome::Linked(file_id)) => {
            info!(file_id, owner = %kind, owner_id, "Linked file record to owner");
            Some(file_id)
        }
        Ok(AssociationOutcome::NoRecord) => {
            debug!(url = public_url, owner = %kind, owner_id, "No file record to associate");
            None
        }
        Err(e) => {
            warn!(url = public_url, owner = %kind, owner_id, error = %e, "File association failed");
            None
        }
    }
}

/// Clear nullable owner columns that point at `public_url`. Returns the number of owners touched.
pub async fn detach_owner_references<C: ConnectionTrait>(
    conn: &C,
    public_url: &str,
) -> Result<u64, DbErr> {
    let events = event::Entity::update_many()
        .col_expr(event::Column::ThumbnailUrl, Expr::value(Option::<String>::None))
        .filter(event::Column::ThumbnailUrl.eq(public_url))
        .exec(conn)
        .await?;
    let news = news::Entity::update_many()
        .col_expr(news::Column::ImageUrl, Expr::value(Option::<String>::None))
        .filter(news::Column::ImageUrl.eq(public_url))
        .exec(conn)
        .await?;
    Ok(events.rows_affected + news.rows_affected)
}
