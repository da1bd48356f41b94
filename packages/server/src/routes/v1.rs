use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/uploads", upload_routes(config))
        .nest("/files", file_routes())
        .nest("/images", image_routes())
        .nest("/documents", document_routes())
        .nest("/events", event_routes())
        .nest("/news", news_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn upload_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::uploads::upload_files))
        .layer(handlers::uploads::upload_body_limit(&config.uploads))
}

fn file_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::files::list_files))
        .routes(routes!(
            handlers::files::get_file,
            handlers::files::update_file,
            handlers::files::delete_file
        ))
        .routes(routes!(handlers::files::bulk_delete_files))
        .routes(routes!(handlers::files::list_orphans))
        .routes(routes!(handlers::files::refresh_orphans))
        .routes(routes!(handlers::files::cleanup_orphans))
}

fn image_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::content::create_image))
        .routes(routes!(handlers::content::delete_image))
        .routes(routes!(handlers::images::validate_images))
        .routes(routes!(handlers::images::image_health))
        .routes(routes!(handlers::images::cleanup_images))
}

fn document_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::content::create_document))
        .routes(routes!(handlers::content::delete_document))
}

fn event_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::content::create_event))
        .routes(routes!(handlers::content::delete_event))
}

fn news_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::content::create_news))
        .routes(routes!(handlers::content::delete_news))
}
