use crate::{
    config::jwt::JwtConfig,
    error::AppError,
    utils::{
        cookie::{extract_cookie, SESSION_TOKEN_COOKIE},
        jwt::decode_jwt,
    },
};
use axum::{
    extract::{FromRequestParts, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

/// The resolved caller. Every notification operation is scoped by `user_id`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Resolves the caller from `Authorization: Bearer` or the session cookie and
/// stores it in the request extensions.
pub async fn auth_middleware(
    Extension(jwt): Extension<JwtConfig>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers)
        .or_else(|| extract_cookie(&headers, SESSION_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let claims = decode_jwt(&jwt, &token).map_err(|e| {
        tracing::debug!("rejected token: {}", e);
        AppError::Unauthorized
    })?;

    if !claims.is_access_token() {
        return Err(AppError::Unauthorized);
    }

    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;
    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}
