/// Authentication endpoints
///
/// - `POST /v1/auth/login` - access ID + password, returns a new session ID
/// - `POST /v1/auth/session` - resume a session
/// - `POST /v1/auth/remember` - log in with a remember token, returns a new session ID
/// - `POST /v1/auth/remember/issue` - (Bearer session) issue a remember token
/// - `POST /v1/auth/remember/invalidate` - (Bearer session) clear the remember token
///
/// Failures use the service codes: `no_users`, `invalid_credentials`,
/// `invalid_session` and `invalid_token`, all `401`.

use crate::{
    app::AppState,
    error::ApiResult,
    extract::ValidatedJson,
    middleware::auth::SessionToken,
};
use axum::{extract::State, Extension, Json};
use formdesk_core::services::{IssuedToken, PasswordLogin, RememberLogin, SessionLogin};
use formdesk_core::Outcome;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Access ID is required"))]
    pub access_id: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Session login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[validate(length(min = 1, message = "Session ID is required"))]
    pub session_id: String,
}

/// Remember-token login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RememberRequest {
    #[validate(length(min = 1, message = "Remember token is required"))]
    pub remember_token: String,
}

/// Response of remember-token invalidation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidatedToken {
    pub user_id: String,
}

/// Password login
///
/// ```text
/// POST /v1/auth/login
/// { "accessId": "AB12C", "password": "x9k2m" }
/// ```
///
/// ```json
/// { "success": true, "sessionId": "…", "email": "a@example.com", "lastLogin": "…" }
/// ```
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<Outcome<PasswordLogin>>> {
    let login = state
        .services
        .auth
        .authenticate_by_password(&req.access_id, &req.password)
        .await?;
    Ok(Json(Outcome::ok(login)))
}

/// Session login; the session ID is unchanged
pub async fn session_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SessionRequest>,
) -> ApiResult<Json<Outcome<SessionLogin>>> {
    let login = state
        .services
        .auth
        .authenticate_by_session(&req.session_id)
        .await?;
    Ok(Json(Outcome::ok(login)))
}

/// Remember-token login
pub async fn remember_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RememberRequest>,
) -> ApiResult<Json<Outcome<RememberLogin>>> {
    let login = state
        .services
        .auth
        .authenticate_by_remember_token(&req.remember_token)
        .await?;
    Ok(Json(Outcome::ok(login)))
}

/// Issues a remember token for the session's user
///
/// The plaintext token is returned once; only its digest is stored.
pub async fn issue_remember_token(
    State(state): State<AppState>,
    Extension(SessionToken(session_id)): Extension<SessionToken>,
) -> ApiResult<Json<Outcome<IssuedToken>>> {
    let session = state.services.auth.authenticate_by_session(&session_id).await?;
    let issued = state
        .services
        .auth
        .issue_remember_token(&session.user_id)
        .await?;
    Ok(Json(Outcome::ok(issued)))
}

/// Clears the remember token of the session's user
pub async fn invalidate_remember_token(
    State(state): State<AppState>,
    Extension(SessionToken(session_id)): Extension<SessionToken>,
) -> ApiResult<Json<Outcome<InvalidatedToken>>> {
    let session = state.services.auth.authenticate_by_session(&session_id).await?;
    state
        .services
        .auth
        .invalidate_remember_token(&session.user_id)
        .await?;
    Ok(Json(Outcome::ok(InvalidatedToken {
        user_id: session.user_id,
    })))
}
