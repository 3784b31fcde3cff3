/// Bearer authentication middleware
///
/// Two guards, both reading `Authorization: Bearer <token>`:
///
/// - [`session_auth_layer`] only checks that a token is present and puts it in
///   the request extensions as [`SessionToken`]; the service call resolves it
///   to a user, so an unknown session fails with the service's own error.
/// - [`admin_auth_layer`] compares the token against `ADMIN_TOKEN`.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Session token taken from the bearer header
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Extracts the token from an `Authorization: Bearer` header
fn bearer_token(req: &Request) -> Result<&str, ApiError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))
}

/// Requires a bearer session token and injects it as [`SessionToken`]
pub async fn session_auth_layer(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = bearer_token(&req)?.to_string();
    req.extensions_mut().insert(SessionToken(token));
    Ok(next.run(req).await)
}

/// Requires the admin token
pub async fn admin_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)?;
    if !constant_time_compare(token, &state.config.admin.token) {
        warn!(path = %req.uri().path(), "Rejected admin request: wrong token");
        return Err(ApiError::Unauthorized("Invalid admin token".to_string()));
    }
    Ok(next.run(req).await)
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret-token", "secret-token"));
        assert!(!constant_time_compare("secret-token", "secret-tokem"));
        assert!(!constant_time_compare("secret", "secret-token"));
    }

    #[test]
    fn test_bearer_token() {
        let req = Request::builder()
            .header("authorization", "Bearer abc-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).unwrap(), "abc-123");

        let req = Request::builder()
            .header("authorization", "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert!(bearer_token(&req).is_err());

        let req = Request::builder()
            .header("authorization", "Bearer ")
            .body(Body::empty())
            .unwrap();
        assert!(bearer_token(&req).is_err());

        let req = Request::builder().body(Body::empty()).unwrap();
        assert!(bearer_token(&req).is_err());
    }
}
