//! Account handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{self, RegistrationRequest};
use crate::db::UserRepository;
use crate::web::dto::{
    LoginRequest, LoginResponse, MeResponse, MessageResponse, RegisterRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;
use crate::VaultError;

/// POST /register - Create an account.
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid email or password")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let repo = UserRepository::new(state.pool());
    auth::register(&repo, RegistrationRequest::new(req.email, req.password))
        .await
        .map_err(VaultError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

/// POST /login - Exchange credentials for an access token.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let repo = UserRepository::new(state.pool());
    let user = auth::authenticate(&repo, &req.email, &req.password).await?;
    let token = state.tokens.issue(&user)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        expires_in: state.tokens.expiry_secs(),
    }))
}

/// GET /me - The authenticated account.
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current account", body = MeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let account = UserRepository::new(state.pool())
        .get_by_id(user.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(MeResponse {
        id: account.id,
        email: account.email,
    }))
}
