//! Request DTOs.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::file::SearchFilter;

/// Account registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query parameters for `GET /search`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the stored file name.
    pub name: Option<String>,
    /// Upload date, `YYYY-MM-DD`.
    pub upload_date: Option<String>,
    /// Extension suffix, e.g. `pdf`.
    pub file_type: Option<String>,
}

impl SearchQuery {
    pub fn to_filter(&self) -> SearchFilter {
        SearchFilter::from_query(
            self.name.as_deref(),
            self.upload_date.as_deref(),
            self.file_type.as_deref(),
        )
    }
}

/// Multipart form accepted by `POST /upload`. Documentation only.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// File content.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Optional description (max 500 characters).
    pub description: Option<String>,
    /// Optional lifetime in seconds; the file is reclaimed after it elapses.
    pub expires_in: Option<u64>,
}
