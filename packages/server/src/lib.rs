pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod files;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_support;

use axum::routing::get;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Village CMS File API",
        version = "1.0.0",
        description = "Uploads, file tracking and orphan cleanup for the village website"
    ),
    tags(
        (name = "Auth", description = "Authentication and sessions"),
        (name = "Uploads", description = "Multipart file uploads per upload type"),
        (name = "Files", description = "File records, deletion and orphan reconciliation"),
        (name = "Images", description = "Gallery images and gallery maintenance"),
        (name = "Documents", description = "Published documents"),
        (name = "Events", description = "Event announcements"),
        (name = "News", description = "News articles"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    let public_uploads = format!(
        "{}/{{upload_type}}/{{filename}}",
        state.config.storage.public_prefix.trim_end_matches('/')
    );

    router
        .route(&public_uploads, get(handlers::assets::serve_upload))
        .with_state(state)
        .merge(Scalar::with_url("/scalar", api))
}
