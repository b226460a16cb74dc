/// Authorization checks
///
/// Session tokens are trusted for identity only. Each check re-reads the
/// member so deleted members lose access immediately and admin rights
/// follow the current roster.

use sqlx::PgPool;

use super::middleware::AuthContext;
use crate::models::member::Member;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The session refers to a member that no longer exists
    #[error("Session is no longer valid")]
    UnknownMember,

    #[error("Administrator access required")]
    NotAdmin,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Loads the signed-in member
pub async fn require_member(pool: &PgPool, auth: &AuthContext) -> Result<Member, AuthzError> {
    Member::find_by_id(pool, auth.member_id)
        .await?
        .ok_or(AuthzError::UnknownMember)
}

/// Loads the signed-in member and checks they are an administrator
///
/// Tokens issued without the admin flag are rejected without a query.
pub async fn require_admin(pool: &PgPool, auth: &AuthContext) -> Result<Member, AuthzError> {
    if !auth.is_admin {
        return Err(AuthzError::NotAdmin);
    }

    let member = require_member(pool, auth).await?;
    ensure_admin(&member)?;
    Ok(member)
}

pub fn ensure_admin(member: &Member) -> Result<(), AuthzError> {
    if member.is_admin {
        Ok(())
    } else {
        Err(AuthzError::NotAdmin)
    }
}
