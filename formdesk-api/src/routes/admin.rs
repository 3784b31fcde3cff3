/// Admin endpoints (admin token)
///
/// ```text
/// POST /v1/admin/setup
/// ```
///
/// Runs store setup against the configured store and switches the running
/// services to the resulting store id. Safe to call repeatedly.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use formdesk_core::schema::SetupReport;
use formdesk_core::Outcome;
use tracing::info;

pub async fn setup(State(state): State<AppState>) -> ApiResult<Json<Outcome<SetupReport>>> {
    let report = state.services.setup().await?;
    info!(store_id = %report.store_id, created = report.created, "Store setup requested by admin");
    Ok(Json(Outcome::ok(report)))
}
