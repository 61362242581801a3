//! Response DTOs.

use serde::Serialize;
use utoipa::ToSchema;

/// Plain acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Login response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Access token (JWT).
    pub token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Authenticated account.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
}

/// Upload response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the stored file.
    pub file_url: String,
}
