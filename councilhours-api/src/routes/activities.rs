/// Activity endpoints
///
/// - `GET /v1/activities`: the member's stored rows keyed by label
/// - `PUT /v1/activities`: saves the whole form in one transaction
/// - `POST /v1/activities/autosave`: saves a single label as the member types

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    middleware::request_context::RequestContext,
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use councilhours_shared::{
    auth::{authorization, middleware::AuthContext},
    catalog,
    models::activity::{Activity, ActivityEntry, EntryError},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct SaveActivitiesRequest {
    pub entries: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize)]
pub struct SaveActivitiesResponse {
    pub status: &'static str,

    /// Rows created or updated
    pub saved: usize,
}

#[derive(Debug, Deserialize)]
pub struct AutosaveRequest {
    #[serde(default)]
    pub category: Option<String>,

    /// Number, numeric string, empty string or null
    #[serde(default)]
    pub hours: Option<Value>,

    #[serde(default)]
    pub amount: Option<Value>,

    #[serde(default)]
    pub quantity_only: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutosaveResponse {
    pub status: String,

    pub saved_at: DateTime<Utc>,
}

/// Reads a form value the way browsers send them
fn lenient_number(value: Option<&Value>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => Some(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    }
}

fn today() -> chrono::NaiveDate {
    Utc::now().date_naive()
}

pub async fn list_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<BTreeMap<String, Activity>>> {
    let member = authorization::require_member(&state.db, &auth).await?;
    let activities = Activity::list_by_member(&state.db, member.id).await?;

    Ok(Json(
        activities
            .into_iter()
            .map(|activity| (activity.category.clone(), activity))
            .collect(),
    ))
}

/// Validates every entry, then writes them all or none
///
/// Existing rows are overwritten (zero included) and re-dated; new rows are
/// only created for entries with a positive value.
pub async fn save_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SaveActivitiesRequest>,
) -> ApiResult<Json<SaveActivitiesResponse>> {
    let member = authorization::require_member(&state.db, &auth).await?;

    let mut entries = Vec::with_capacity(req.entries.len());
    let mut errors = Vec::new();
    for (index, entry) in req.entries.into_iter().enumerate() {
        match entry.normalized(true) {
            Ok(entry) => entries.push(entry),
            Err(err) => errors.push(ValidationErrorDetail {
                field: format!("entries[{}]", index),
                message: err.to_string(),
            }),
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    let saved = Activity::save_form(&state.db, member.id, &entries, today()).await?;
    tracing::info!(member_id = member.id, saved, "Activity form saved");

    Ok(Json(SaveActivitiesResponse {
        status: "ok",
        saved,
    }))
}

pub async fn autosave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    context: Option<Extension<RequestContext>>,
    Json(req): Json<AutosaveRequest>,
) -> ApiResult<Json<AutosaveResponse>> {
    let category = req
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing_category".to_string()))?
        .to_string();

    let quantity_only = req.quantity_only || catalog::is_quantity_only(&category);
    let hours = lenient_number(req.hours.as_ref());
    let amount = if quantity_only {
        Some(0.0)
    } else {
        lenient_number(req.amount.as_ref())
    };
    let (hours, amount) = match (hours, amount) {
        (Some(hours), Some(amount)) => (hours, amount),
        _ => return Err(ApiError::BadRequest("invalid_number".to_string())),
    };

    let entry = ActivityEntry::new(category, hours, amount)
        .normalized(false)
        .map_err(|err| match err {
            EntryError::Negative => ApiError::BadRequest("negative_value".to_string()),
            _ => ApiError::BadRequest("invalid_number".to_string()),
        })?;

    let member = authorization::require_member(&state.db, &auth).await?;

    let mut conn = state.db.acquire().await?;
    Activity::upsert(&mut conn, member.id, &entry, today(), quantity_only).await?;

    let client_ip = context
        .as_ref()
        .map(|Extension(ctx)| ctx.client_ip.as_str())
        .unwrap_or("-");
    tracing::info!(
        member_id = member.id,
        category = %entry.category,
        hours = entry.hours,
        amount = entry.amount,
        quantity_only,
        client_ip,
        "Activity autosaved"
    );

    Ok(Json(AutosaveResponse {
        status: "ok".to_string(),
        saved_at: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_number() {
        assert_eq!(lenient_number(None), Some(0.0));
        assert_eq!(lenient_number(Some(&Value::Null)), Some(0.0));
        assert_eq!(lenient_number(Some(&json!(2.5))), Some(2.5));
        assert_eq!(lenient_number(Some(&json!(3))), Some(3.0));
        assert_eq!(lenient_number(Some(&json!(""))), Some(0.0));
        assert_eq!(lenient_number(Some(&json!(" 4.25 "))), Some(4.25));
        assert_eq!(lenient_number(Some(&json!("four"))), None);
        assert_eq!(lenient_number(Some(&json!([1]))), None);
    }

    #[test]
    fn test_autosave_request_defaults() {
        let req: AutosaveRequest =
            serde_json::from_value(json!({"category": "Family Week"})).unwrap();
        assert_eq!(req.category.as_deref(), Some("Family Week"));
        assert!(req.hours.is_none());
        assert!(!req.quantity_only);
    }
}
