use std::path::PathBuf;

use common::UploadType;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::files::upload::UploadConstraints;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    1
}

/// Account created at start-up when no user with that name exists.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn default_token_ttl_hours() -> i64 {
    24 * 7
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per upload type.
    #[serde(default = "default_uploads_root")]
    pub uploads_root: PathBuf,
    /// URL prefix under which blobs are served, without a trailing slash.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Unassociated records younger than this are never reported as orphans.
    #[serde(default = "default_orphan_grace_period_secs")]
    pub orphan_grace_period_secs: u64,
    /// Timeout for probing external image URLs.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_uploads_root() -> PathBuf {
    PathBuf::from("./public/uploads")
}
fn default_public_prefix() -> String {
    "/uploads".into()
}
fn default_orphan_grace_period_secs() -> u64 {
    3600
}
fn default_probe_timeout_secs() -> u64 {
    5
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_root: default_uploads_root(),
            public_prefix: default_public_prefix(),
            orphan_grace_period_secs: default_orphan_grace_period_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Public URL for a blob stored under `{upload_type}/{filename}`.
    pub fn public_url(&self, upload_type: UploadType, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_prefix.trim_end_matches('/'),
            upload_type,
            filename
        )
    }

    pub fn orphan_grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.orphan_grace_period_secs).unwrap_or(i64::MAX))
    }
}

/// Per-type upload limits.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadsConfig {
    #[serde(default = "UploadConstraints::gallery")]
    pub gallery: UploadConstraints,
    #[serde(default = "UploadConstraints::news")]
    pub news: UploadConstraints,
    #[serde(default = "UploadConstraints::documents")]
    pub documents: UploadConstraints,
    #[serde(default = "UploadConstraints::events")]
    pub events: UploadConstraints,
}

impl UploadsConfig {
    pub fn constraints_for(&self, upload_type: UploadType) -> &UploadConstraints {
        match upload_type {
            UploadType::Gallery => &self.gallery,
            UploadType::News => &self.news,
            UploadType::Documents => &self.documents,
            UploadType::Events => &self.events,
        }
    }

    /// Largest request body any upload route may need.
    pub fn max_request_bytes(&self) -> usize {
        UploadType::ALL
            .iter()
            .map(|ty| {
                let c = self.constraints_for(*ty);
                c.max_file_size_bytes.saturating_mul(c.max_files as u64)
            })
            .max()
            .map(|bytes| usize::try_from(bytes).unwrap_or(usize::MAX))
            .unwrap_or(0)
            .saturating_add(1024 * 1024)
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            gallery: UploadConstraints::gallery(),
            news: UploadConstraints::news(),
            documents: UploadConstraints::documents(),
            events: UploadConstraints::events(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., VILLAGE__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("VILLAGE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
