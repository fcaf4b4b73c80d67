use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys, repo_types::Role};
use crate::error::AppError;

/// Pulls the bearer credential out of the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers.get(AUTHORIZATION).ok_or(AppError::MissingToken)?;
    let value = value.to_str().map_err(|_| AppError::InvalidToken)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(AppError::InvalidToken)?
        .trim();
    if token.is_empty() {
        return Err(AppError::MissingToken);
    }
    Ok(token)
}

/// Header → verified identity.
pub fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<Identity, AppError> {
    let token = bearer_token(headers)?;
    keys.verify(token).map_err(|e| {
        warn!("invalid or expired token");
        e
    })
}

/// Role check applied after `authenticate`.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        warn!(user_id = %identity.user_id, role = %identity.role, "role not permitted");
        Err(AppError::Forbidden)
    }
}

/// Any authenticated user.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        authenticate(&parts.headers, &keys).map(AuthUser)
    }
}

/// Authenticated user whose role is `manager`.
pub struct ManagerUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for ManagerUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        authorize(&identity, &[Role::Manager])?;
        Ok(ManagerUser(identity))
    }
}
