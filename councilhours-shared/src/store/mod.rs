//! Member store
//!
//! The allocator reads and writes members through [`MemberStore`] so it can
//! run against Postgres in production and an in-memory map in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::member::Member;

pub use memory::InMemoryMemberStore;
pub use postgres::PgMemberStore;

/// Failure while writing a member
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Uniqueness constraint violated")]
    Conflict,

    #[error("Member store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Durable collection of members
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Member whose access code equals `code`, trimmed and ignoring case
    async fn find_member_by_access_code(&self, code: &str) -> Result<Option<Member>, StoreError>;

    async fn find_member_by_id(&self, id: i64) -> Result<Option<Member>, StoreError>;

    /// Writes the member's access code back to the store
    ///
    /// Only the code is written; other fields of `member` may be stale and
    /// are ignored.
    async fn persist(&self, member: &Member) -> Result<(), StoreError>;

    /// Members whose access code is null or blank
    async fn list_members_without_code(&self) -> Result<Vec<Member>, StoreError>;
}

/// Canonical form used for access-code comparison
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
