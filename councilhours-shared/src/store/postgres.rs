use async_trait::async_trait;
use sqlx::PgPool;

use super::{MemberStore, StoreError};
use crate::models::member::Member;

/// [`MemberStore`] backed by the `members` table
#[derive(Debug, Clone)]
pub struct PgMemberStore {
    pool: PgPool,
}

impl PgMemberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MemberStore for PgMemberStore {
    async fn find_member_by_access_code(&self, code: &str) -> Result<Option<Member>, StoreError> {
        Ok(Member::find_by_access_code(&self.pool, code).await?)
    }

    async fn find_member_by_id(&self, id: i64) -> Result<Option<Member>, StoreError> {
        Ok(Member::find_by_id(&self.pool, id).await?)
    }

    async fn persist(&self, member: &Member) -> Result<(), StoreError> {
        if Member::set_access_code(&self.pool, member.id, member.access_code.as_deref()).await? {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "member {} no longer exists",
                member.id
            )))
        }
    }

    async fn list_members_without_code(&self) -> Result<Vec<Member>, StoreError> {
        Ok(Member::list_without_access_code(&self.pool).await?)
    }
}
