//! Liveness endpoints.

/// GET / - Service banner.
pub async fn root() -> &'static str {
    "filevault is running"
}

/// GET /health - Health check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health_check() -> &'static str {
    "OK"
}
