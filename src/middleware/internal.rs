use crate::{config::internal::InternalApiConfig, error::AppError};
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response, Extension};

pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

/// Guards collaborator-only routes with a shared secret.
pub async fn internal_token_middleware(
    Extension(config): Extension<InternalApiConfig>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = config.token.as_deref().ok_or(AppError::Unauthorized)?;
    let provided = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        tracing::warn!("internal route called with a wrong token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
