/// Template endpoints
///
/// - `GET /v1/templates` - registered template types
/// - `POST /v1/templates` - (admin token) register or re-point a template type

use crate::{app::AppState, error::ApiResult, extract::ValidatedJson};
use axum::{extract::State, Json};
use formdesk_core::services::{RegisteredTemplate, TemplateList};
use formdesk_core::Outcome;
use serde::Deserialize;
use validator::Validate;

/// Template registration request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTemplateRequest {
    /// Template type, e.g. "survey"
    #[validate(length(min = 1, max = 100, message = "Template type must be 1 to 100 characters"))]
    pub template_type: String,

    /// Provider id of the source resource
    #[validate(length(min = 1, message = "Template ID is required"))]
    pub template_id: String,
}

pub async fn list_templates(State(state): State<AppState>) -> ApiResult<Json<Outcome<TemplateList>>> {
    let templates = state.services.provisioning.list_template_types().await?;
    Ok(Json(Outcome::ok(templates)))
}

pub async fn register_template(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterTemplateRequest>,
) -> ApiResult<Json<Outcome<RegisteredTemplate>>> {
    let registered = state
        .services
        .provisioning
        .register_template(&req.template_type, &req.template_id)
        .await?;
    Ok(Json(Outcome::ok(registered)))
}
