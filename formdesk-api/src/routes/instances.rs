/// Instance endpoints (Bearer session)
///
/// ```text
/// GET  /v1/instances
/// POST /v1/instances   { "templateType": "survey" }
/// ```
///
/// Provisioning clones the registered template for the session's user and
/// returns `{ "success": true, "instanceId", "instanceUrl", "title", "templateType" }`.
/// Provisioning the same type again replaces the user's previous copy.
///
/// # Errors
///
/// - `401 auth_error`: the session does not resolve to a user
/// - `404 template_not_found`: no template registered under the type
/// - `502 provider_error`: the provider could not open or clone the template

use crate::{
    app::AppState,
    error::ApiResult,
    extract::ValidatedJson,
    middleware::auth::SessionToken,
};
use axum::{extract::State, Extension, Json};
use formdesk_core::services::{InstanceList, ProvisionedInstance};
use formdesk_core::Outcome;
use serde::Deserialize;
use validator::Validate;

/// Provisioning request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    #[validate(length(min = 1, message = "Template type is required"))]
    pub template_type: String,
}

pub async fn list_instances(
    State(state): State<AppState>,
    Extension(SessionToken(session_id)): Extension<SessionToken>,
) -> ApiResult<Json<Outcome<InstanceList>>> {
    let instances = state.services.provisioning.list_instances(&session_id).await?;
    Ok(Json(Outcome::ok(instances)))
}

pub async fn provision_instance(
    State(state): State<AppState>,
    Extension(SessionToken(session_id)): Extension<SessionToken>,
    ValidatedJson(req): ValidatedJson<ProvisionRequest>,
) -> ApiResult<Json<Outcome<ProvisionedInstance>>> {
    let instance = state
        .services
        .provisioning
        .provision_instance(&req.template_type, &session_id)
        .await?;
    Ok(Json(Outcome::ok(instance)))
}
