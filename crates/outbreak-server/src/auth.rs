use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

/// Authentication configuration shared with the admin middleware.
#[derive(Clone)]
pub struct AuthConfig {
    /// Bearer token for administrator endpoints. None = auth disabled.
    pub admin_token: Option<String>,
}

/// The bearer token presented with a request, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// The bearer token parsed as a player token.
pub fn player_token(headers: &HeaderMap) -> Option<Uuid> {
    bearer_token(headers).and_then(|t| Uuid::parse_str(t).ok())
}

/// Whether the request carries the configured admin token. With no token
/// configured nobody counts as an administrator here; the middleware is
/// what opens the admin routes up in that case.
pub fn is_admin(headers: &HeaderMap, auth: &AuthConfig) -> bool {
    match (&auth.admin_token, bearer_token(headers)) {
        (Some(expected), Some(provided)) => provided == expected,
        _ => false,
    }
}

/// Axum middleware that validates the admin bearer token. If no token is
/// configured (`AuthConfig::admin_token` is None), all requests are allowed
/// through (auth disabled).
pub async fn admin_auth_middleware(
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or(AuthConfig { admin_token: None });

    if let Some(ref expected) = auth_config.admin_token {
        match bearer_token(&headers) {
            Some(token) if token == expected => {},
            _ => return Err(StatusCode::UNAUTHORIZED),
        }
    }

    Ok(next.run(request).await)
}
