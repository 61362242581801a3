//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::handlers::{
    health_check, list_files, login, me, register, root, search_files, share_file, upload_file,
    AppState,
};
use super::middleware::{create_cors_layer, jwt_auth};
use super::openapi::create_openapi_router;

/// Headroom for multipart framing on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main router.
///
/// Files in the storage directory are served verbatim under `public_prefix`.
pub fn create_router(
    app_state: Arc<AppState>,
    public_prefix: &str,
    cors_origins: &[String],
) -> Router {
    let upload_dir = app_state.files.storage().base_path().to_path_buf();
    let body_limit = app_state.files.max_file_size() + MULTIPART_OVERHEAD;
    let tokens = app_state.tokens.clone();

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me));

    let file_routes = Router::new()
        .route("/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/search", get(search_files))
        .route("/share/:file_id", get(share_file))
        .layer(DefaultBodyLimit::max(body_limit));

    let prefix = format!("/{}", public_prefix.trim_matches('/'));

    Router::new()
        .merge(auth_routes)
        .merge(file_routes)
        .with_state(app_state)
        .merge(create_health_router())
        .merge(create_openapi_router())
        .nest_service(&prefix, ServeDir::new(upload_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let tokens = tokens.clone();
                    jwt_auth(tokens, req, next)
                })),
        )
}

/// Create the liveness router.
pub fn create_health_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
