//! Bearer token authentication.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{Claims, TokenIssuer};
use crate::web::error::ApiError;

/// Extractor for authenticated users.
///
/// Requires an `Authorization: Bearer <jwt>` header; the handler receives
/// the verified claims. `claims.sub` is the user ID.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.0.sub
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authorization must be a Bearer token"))?;

        let issuer = parts
            .extensions
            .get::<Arc<TokenIssuer>>()
            .ok_or_else(|| ApiError::internal("JWT state not configured"))?;

        let claims = issuer
            .verify(token)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser(claims))
    }
}

/// Middleware function to inject the token issuer into request extensions.
pub async fn jwt_auth(issuer: Arc<TokenIssuer>, mut request: Request<Body>, next: Next) -> Response {
    request.extensions_mut().insert(issuer);
    next.run(request).await
}
