/// Admin endpoints
///
/// Every handler re-reads the caller from the database; a token minted
/// before a demotion does not keep admin rights.
///
/// - `GET /v1/admin/report`: council-wide totals
/// - `POST /v1/admin/roster`: replaces the roster from a CSV upload
/// - `POST /v1/admin/members/:member_number/notify`: emails a member their code
/// - `POST /v1/admin/members/:member_number/access-code`: issues a new code
/// - `POST /v1/admin/members/:member_number/promote`: grants admin
/// - `DELETE /v1/admin/members/:member_number`: removes a member and their activities

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Extension, Json,
};
use councilhours_shared::{
    auth::{authorization, middleware::AuthContext},
    models::{
        activity::Activity,
        member::Member,
        notification::{NewNotification, Notification},
    },
    notify::{EmailTemplate, TemplateContext},
    report::CouncilReport,
    roster,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct NotifyQuery {
    /// Replace an existing code instead of reusing it
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub status: &'static str,

    pub notification_id: i64,

    pub access_code: String,
}

#[derive(Debug, Serialize)]
pub struct AccessCodeResponse {
    pub member_number: String,

    pub access_code: String,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub status: &'static str,

    pub member: Member,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub status: &'static str,

    pub member_number: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,

    pub skipped: usize,

    pub errors: Vec<String>,

    pub codes_assigned: usize,
}

async fn member_by_number(state: &AppState, member_number: &str) -> ApiResult<Member> {
    Member::find_by_member_number(&state.db, member_number.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Member {} not found", member_number.trim())))
}

pub async fn report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CouncilReport>> {
    authorization::require_admin(&state.db, &auth).await?;

    let members = Member::list_ordered(&state.db).await?;
    let activities = Activity::list_all(&state.db).await?;

    Ok(Json(CouncilReport::build(&members, &activities)))
}

/// Queues the notification email for one member
///
/// A member without a code gets one first. The template is read on every
/// call so edits take effect without a restart.
pub async fn notify_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(member_number): Path<String>,
    Query(query): Query<NotifyQuery>,
) -> ApiResult<Json<NotifyResponse>> {
    authorization::require_admin(&state.db, &auth).await?;

    let mut member = member_by_number(&state, &member_number).await?;
    let to_address = member
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Member {} has no email address", member.member_number))
        })?;

    if query.regenerate || !member.has_access_code() {
        state.allocator().assign_code(member.id).await?;
        member = member_by_number(&state, &member.member_number).await?;
    }
    let access_code = member
        .access_code
        .clone()
        .ok_or_else(|| ApiError::InternalError("Access code missing after assignment".to_string()))?;

    let council = &state.config.council;
    let template = EmailTemplate::load(&council.email_template).await?;
    let body = template.render(&TemplateContext::for_member(&member, &council.url, &access_code));

    let notification = Notification::enqueue(
        &state.db,
        NewNotification {
            member_number: member.member_number.clone(),
            to_address,
            subject: council.email_subject.clone(),
            body,
        },
    )
    .await?;

    tracing::info!(
        admin_id = auth.member_id,
        member_id = member.id,
        notification_id = notification.id,
        "Member notification queued"
    );

    Ok(Json(NotifyResponse {
        status: "queued",
        notification_id: notification.id,
        access_code,
    }))
}

pub async fn reset_access_code(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(member_number): Path<String>,
) -> ApiResult<Json<AccessCodeResponse>> {
    authorization::require_admin(&state.db, &auth).await?;

    let member = member_by_number(&state, &member_number).await?;
    let access_code = state.allocator().assign_code(member.id).await?;

    tracing::info!(admin_id = auth.member_id, member_id = member.id, "Access code reset");

    Ok(Json(AccessCodeResponse {
        member_number: member.member_number,
        access_code,
    }))
}

pub async fn promote_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(member_number): Path<String>,
) -> ApiResult<Json<MemberResponse>> {
    authorization::require_admin(&state.db, &auth).await?;

    let member = member_by_number(&state, &member_number).await?;
    if !Member::set_admin(&state.db, member.id, true).await? {
        return Err(ApiError::NotFound(format!("Member {} not found", member_number)));
    }

    tracing::info!(admin_id = auth.member_id, member_id = member.id, "Member promoted to admin");

    Ok(Json(MemberResponse {
        status: "ok",
        member: Member {
            is_admin: true,
            ..member
        },
    }))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(member_number): Path<String>,
) -> ApiResult<Json<RemoveResponse>> {
    authorization::require_admin(&state.db, &auth).await?;

    let member = member_by_number(&state, &member_number).await?;
    if member.id == auth.member_id {
        return Err(ApiError::BadRequest("Admins cannot remove themselves".to_string()));
    }
    if !Member::delete_with_activities(&state.db, member.id).await? {
        return Err(ApiError::NotFound(format!("Member {} not found", member_number)));
    }

    tracing::info!(admin_id = auth.member_id, member_id = member.id, "Member removed");

    Ok(Json(RemoveResponse {
        status: "ok",
        member_number: member.member_number,
    }))
}

/// Replaces the roster with the uploaded CSV, then fills in missing codes
///
/// Open to anyone while the council has no admin, so the first roster can
/// be loaded.
pub async fn import_roster(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    body: Bytes,
) -> ApiResult<Json<ImportResponse>> {
    match auth {
        Some(Extension(auth)) => {
            authorization::require_admin(&state.db, &auth).await?;
        }
        None => {
            if Member::count_admins(&state.db).await? > 0 {
                return Err(ApiError::Unauthorized(
                    "Missing authentication credentials".to_string(),
                ));
            }
            tracing::info!("No admin on record, accepting bootstrap roster import");
        }
    }

    let parsed = roster::parse_roster(&body)?;
    if parsed.members.is_empty() {
        return Err(ApiError::BadRequest(
            "No valid members found in CSV".to_string(),
        ));
    }

    let imported = Member::replace_roster(&state.db, &parsed.members).await?;
    let codes_assigned = state.allocator().fill_missing_codes().await?;

    tracing::info!(
        imported,
        skipped = parsed.skipped,
        errors = parsed.errors.len(),
        codes_assigned,
        "Roster imported"
    );

    Ok(Json(ImportResponse {
        imported,
        skipped: parsed.skipped,
        errors: parsed.errors,
        codes_assigned,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_query_defaults_to_reuse() {
        let query: NotifyQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.regenerate);
    }

    #[test]
    fn test_import_response_shape() {
        let response = ImportResponse {
            imported: 2,
            skipped: 1,
            errors: vec!["Row 4: missing Membership Number".to_string()],
            codes_assigned: 2,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["imported"], 2);
        assert_eq!(json["errors"][0], "Row 4: missing Membership Number");
    }
}
