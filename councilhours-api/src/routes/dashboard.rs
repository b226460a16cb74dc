use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use councilhours_shared::{
    auth::{authorization, middleware::AuthContext},
    models::activity::Activity,
    report::Dashboard,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub council_title: String,

    #[serde(flatten)]
    pub dashboard: Dashboard,
}

/// `GET /v1/dashboard`: the member's totals per section and label
///
/// Quantity-only labels are listed with their counts but left out of
/// `total_hours`.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardResponse>> {
    let member = authorization::require_member(&state.db, &auth).await?;
    let activities = Activity::list_by_member(&state.db, member.id).await?;

    Ok(Json(DashboardResponse {
        council_title: state.config.council.title.clone(),
        dashboard: Dashboard::build(member, &activities),
    }))
}
