use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use tempfile::TempDir;

use common::storage::filesystem::FilesystemBlobStore;
use village_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig, StorageConfig, UploadsConfig,
};
use village_server::entity::user;
use village_server::state::AppState;

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const FILES: &str = "/api/v1/files";
    pub const BULK_DELETE: &str = "/api/v1/files/bulk-delete";
    pub const ORPHANS: &str = "/api/v1/files/orphans";
    pub const ORPHANS_REFRESH: &str = "/api/v1/files/orphans/refresh";
    pub const CLEANUP: &str = "/api/v1/files/cleanup";
    pub const IMAGES: &str = "/api/v1/images";
    pub const IMAGES_VALIDATE: &str = "/api/v1/images/validate";
    pub const IMAGES_HEALTH: &str = "/api/v1/images/health";
    pub const IMAGES_CLEANUP: &str = "/api/v1/images/cleanup";
    pub const DOCUMENTS: &str = "/api/v1/documents";
    pub const EVENTS: &str = "/api/v1/events";
    pub const NEWS: &str = "/api/v1/news";

    pub fn upload(upload_type: &str) -> String {
        format!("/api/v1/uploads/{upload_type}")
    }

    pub fn file(id: i32) -> String {
        format!("/api/v1/files/{id}")
    }

    pub fn image(id: i32) -> String {
        format!("/api/v1/images/{id}")
    }

    pub fn document(id: i32) -> String {
        format!("/api/v1/documents/{id}")
    }

    pub fn event(id: i32) -> String {
        format!("/api/v1/events/{id}")
    }

    pub fn news(id: i32) -> String {
        format!("/api/v1/news/{id}")
    }
}

/// A running test server backed by a throwaway SQLite database and uploads directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub uploads_root: PathBuf,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// A file part for multipart uploads.
pub struct UploadFile {
    pub name: &'static str,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: &'static str, mime: &'static str, len: usize) -> Self {
        Self {
            name,
            mime,
            bytes: vec![0x5A; len],
        }
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_grace(3600).await
    }

    /// Spawn with a custom orphan grace period; `0` makes every unassociated record an orphan.
    pub async fn spawn_with_grace(orphan_grace_period_secs: u64) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let uploads_root = dir.path().join("uploads");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display()),
                max_connections: 5,
                min_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_hours: 1,
                bootstrap_admin: None,
            },
            storage: StorageConfig {
                uploads_root: uploads_root.clone(),
                orphan_grace_period_secs,
                probe_timeout_secs: 2,
                ..StorageConfig::default()
            },
            uploads: UploadsConfig::default(),
        };

        let db = village_server::database::init_db(&app_config.database)
            .await
            .expect("Failed to initialize test database");
        let blob_store = FilesystemBlobStore::new(uploads_root.clone())
            .await
            .expect("Failed to open blob store");

        let state = AppState {
            db: db.clone(),
            blob_store: Arc::new(blob_store),
            http: Client::new(),
            config: app_config,
        };

        let app = village_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            uploads_root,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Path of a stored blob on disk.
    pub fn blob_path(&self, file_path: &str) -> PathBuf {
        self.uploads_root.join(file_path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_with_token(
        &self,
        upload_type: &str,
        files: Vec<UploadFile>,
        token: &str,
    ) -> TestResponse {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str(file.mime)
                .expect("Failed to set MIME type");
            form = form.part("file", part);
        }

        let res = self
            .client
            .post(self.url(&routes::upload(upload_type)))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Upload one file and return the URL it is served under.
    pub async fn upload_one(&self, upload_type: &str, file: UploadFile, token: &str) -> String {
        let res = self.upload_with_token(upload_type, vec![file], token).await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        res.body["results"][0]["url"]
            .as_str()
            .expect("upload result should contain a url")
            .to_string()
    }

    /// Register a user and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, username: &str, password: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Register a user, promote it to admin, then log in and return the auth token.
    pub async fn create_admin(&self, username: &str) -> String {
        let password = "pass1234";
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let db_user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");

        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(user::ADMIN_ROLE.to_string());
        active.update(&self.db).await.expect("Failed to update user role");

        let res = self.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Create a gallery image via the API and return its `id`.
    pub async fn create_image(&self, token: &str, url: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::IMAGES,
                &serde_json::json!({"title": "Kirchturm", "url": url}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_image failed: {}", res.text);
        res.id()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
