//! Bearer token authentication.
//!
//! The development server trusts any token: the token is the user id.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};

use crate::domain::UserId;

/// User resolved from the `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        UserId::new(token.trim()).map(AuthenticatedUser).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            StatusCode::UNAUTHORIZED
        })
    }
}
