//! OpenAPI document.

use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{
    LoginRequest, LoginResponse, MeResponse, MessageResponse, RegisterRequest, UploadForm,
    UploadResponse,
};
use super::handlers;
use crate::file::FileRecord;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::file::upload_file,
        handlers::file::list_files,
        handlers::file::search_files,
        handlers::file::share_file,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        MeResponse,
        MessageResponse,
        UploadForm,
        UploadResponse,
        FileRecord,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Registration and login"),
        (name = "files", description = "Upload, listing, search and sharing"),
    ),
    info(title = "filevault API")
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Router serving the document at `/api-docs/openapi.json`.
pub fn create_openapi_router() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in ["/upload", "/files", "/search", "/share/{file_id}", "/login"] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
