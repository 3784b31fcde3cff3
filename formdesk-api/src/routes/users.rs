/// Registration endpoint
///
/// ```text
/// POST /v1/users
/// { "email": "a@example.com" }
/// ```
///
/// `201 Created` with `{ "success": true, "accessId": "AB12C", "password": "x9k2m" }`.
/// The password is only ever shown in this response.
///
/// # Errors
///
/// - `422 validation_error`: missing or malformed email
/// - `409 duplicate`: email already registered
/// - `503 not_initialized`: setup has not run

use crate::{app::AppState, error::ApiResult, extract::ValidatedJson};
use axum::{extract::State, http::StatusCode, Json};
use formdesk_core::services::Registration;
use formdesk_core::Outcome;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 254, message = "Email must be 1 to 254 characters"))]
    pub email: String,
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Outcome<Registration>>)> {
    let registration = state.services.directory.register(&req.email).await?;
    Ok((StatusCode::CREATED, Json(Outcome::ok(registration))))
}
