/// Authentication endpoints
///
/// - `POST /v1/auth/login`: last name plus access code, returns a session token
/// - `POST /v1/auth/logout`: acknowledges; the client discards its token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::request_context::RequestContext,
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Duration, TimeZone, Utc};
use councilhours_shared::{auth::jwt, models::member::Member};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255, message = "Last name is required"))]
    pub last_name: String,

    #[validate(length(min = 1, max = 32, message = "Access code is required"))]
    pub access_code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,

    pub token_type: &'static str,

    pub expires_at: DateTime<Utc>,

    pub member: Member,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub status: &'static str,
}

pub async fn login(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let req = LoginRequest {
        last_name: req.last_name.trim().to_string(),
        access_code: req.access_code.trim().to_string(),
    };
    req.validate()?;

    let client_ip = context
        .as_ref()
        .map(|Extension(ctx)| ctx.client_ip.as_str())
        .unwrap_or("-");

    let member = match Member::find_by_login(&state.db, &req.last_name, &req.access_code).await? {
        Some(member) => member,
        None => {
            tracing::warn!(client_ip, "Login failed");
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let claims = jwt::Claims::new(
        member.id,
        member.is_admin,
        Duration::hours(state.config.session.hours),
    );
    let token = jwt::create_token(&claims, state.jwt_secret())?;
    let expires_at = Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .ok_or_else(|| ApiError::InternalError("Invalid token expiry".to_string()))?;

    tracing::info!(member_id = member.id, client_ip, "Member logged in");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_at,
        member,
    }))
}

pub async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let ok = LoginRequest {
            last_name: "Smith".to_string(),
            access_code: "ABC234".to_string(),
        };
        assert!(ok.validate().is_ok());

        let blank = LoginRequest {
            last_name: String::new(),
            access_code: "ABC234".to_string(),
        };
        assert!(blank.validate().is_err());

        let long_code = LoginRequest {
            last_name: "Smith".to_string(),
            access_code: "A".repeat(33),
        };
        assert!(long_code.validate().is_err());
    }
}
