//! File handlers.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;

use crate::file::{FileRecord, UploadRequest};
use crate::web::dto::validation::sanitize_string;
use crate::web::dto::{SearchQuery, UploadForm, UploadResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// POST /upload - Store a file for the authenticated user.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "No file part, bad field, or file too large"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Owner not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut filename: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;
    let mut description: Option<String> = None;
    let mut expires_in: Option<Duration> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e, "Invalid multipart data"))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                filename = Some(field.file_name().unwrap_or("").to_string());
                content = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error(&state, e, "Failed to read file"))?
                        .to_vec(),
                );
            }
            "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid description"))?;
                description = Some(sanitize_string(text.trim()));
            }
            "expires_in" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid expires_in"))?;
                let secs = text
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| {
                        ApiError::bad_request("expires_in must be a positive number of seconds")
                    })?;
                expires_in = Some(Duration::from_secs(secs));
            }
            _ => {}
        }
    }

    let (filename, content) = filename
        .zip(content)
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let mut request = UploadRequest::new(filename, content);
    if let Some(desc) = description.filter(|d| !d.is_empty()) {
        request = request.with_description(desc);
    }
    if let Some(ttl) = expires_in {
        request = request.with_expires_in(ttl);
    }

    let result = state.files.upload(user.user_id(), &request).await?;

    Ok(Json(UploadResponse {
        file_url: result.file_url,
    }))
}

/// Map a multipart read failure, reporting an exceeded body limit as the
/// upload size error.
fn multipart_error(state: &AppState, err: MultipartError, message: &str) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return state.files.size_limit_error().into();
    }
    tracing::warn!(error = %err, "{}", message);
    ApiError::bad_request(message)
}

/// GET /files - List the authenticated user's files.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "All files owned by the caller", body = Vec<FileRecord>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    // Cached listings are already JSON and go out verbatim.
    let json = state.files.list(user.user_id()).await?.into_json()?;

    Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

/// GET /search - Filter the authenticated user's files.
#[utoipa::path(
    get,
    path = "/search",
    tag = "files",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching files, possibly empty", body = Vec<FileRecord>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let files = state
        .files
        .search(user.user_id(), &query.to_filter())
        .await?;

    Ok(Json(files))
}

/// GET /share/:file_id - Public URL for a file, as plain text.
#[utoipa::path(
    get,
    path = "/share/{file_id}",
    tag = "files",
    params(("file_id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "Public URL", body = String, content_type = "text/plain"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn share_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<String, ApiError> {
    Ok(state.files.share(user.user_id(), file_id).await?)
}
