/// Member model and database operations
///
/// Members come from the council roster import. A member signs in with their
/// last name plus an access code; both are compared trimmed and
/// case-insensitively.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE members (
///     id BIGSERIAL PRIMARY KEY,
///     member_number VARCHAR(64) NOT NULL,
///     first_name VARCHAR(255),
///     last_name VARCHAR(255),
///     mobile_phone VARCHAR(64),
///     email VARCHAR(320),
///     is_admin BOOLEAN NOT NULL DEFAULT FALSE,
///     access_code VARCHAR(32),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX members_access_code_key
///     ON members (UPPER(TRIM(access_code)))
///     WHERE access_code IS NOT NULL AND TRIM(access_code) <> '';
/// ```
///
/// # Example
///
/// ```no_run
/// use councilhours_shared::models::member::Member;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(member) = Member::find_by_login(&pool, "smith", "abc234").await? {
///     println!("Welcome back, {}", member.display_name());
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A council member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    /// Database identity
    pub id: i64,

    /// Membership number from the roster
    pub member_number: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub mobile_phone: Option<String>,

    pub email: Option<String>,

    /// Grants access to the admin endpoints
    pub is_admin: bool,

    /// Login secret; None until the allocator assigns one
    #[serde(skip_serializing)]
    pub access_code: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a member during roster import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateMember {
    pub member_number: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub mobile_phone: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub access_code: Option<String>,
}

impl Member {
    /// "First Last", skipping missing parts
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True when a non-blank access code is set
    pub fn has_access_code(&self) -> bool {
        self.access_code
            .as_deref()
            .map(|code| !code.trim().is_empty())
            .unwrap_or(false)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, member_number, first_name, last_name, mobile_phone, email,
                   is_admin, access_code, created_at, updated_at
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a member by roster number
    ///
    /// Membership numbers are not constrained unique; the oldest row wins.
    pub async fn find_by_member_number(
        pool: &PgPool,
        member_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, member_number, first_name, last_name, mobile_phone, email,
                   is_admin, access_code, created_at, updated_at
            FROM members
            WHERE member_number = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(member_number.trim())
        .fetch_optional(pool)
        .await
    }

    /// Finds the holder of an access code (trimmed, case-insensitive)
    pub async fn find_by_access_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, member_number, first_name, last_name, mobile_phone, email,
                   is_admin, access_code, created_at, updated_at
            FROM members
            WHERE UPPER(TRIM(access_code)) = UPPER(TRIM($1))
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(pool)
        .await
    }

    /// Resolves login credentials
    ///
    /// Blank inputs never match, so members without a code cannot sign in.
    pub async fn find_by_login(
        pool: &PgPool,
        last_name: &str,
        access_code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let last_name = last_name.trim();
        let access_code = access_code.trim();
        if last_name.is_empty() || access_code.is_empty() {
            return Ok(None);
        }

        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, member_number, first_name, last_name, mobile_phone, email,
                   is_admin, access_code, created_at, updated_at
            FROM members
            WHERE LOWER(TRIM(last_name)) = LOWER($1)
              AND UPPER(TRIM(access_code)) = UPPER($2)
            LIMIT 1
            "#,
        )
        .bind(last_name)
        .bind(access_code)
        .fetch_optional(pool)
        .await
    }

    /// All members ordered by last name, then first name
    pub async fn list_ordered(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, member_number, first_name, last_name, mobile_phone, email,
                   is_admin, access_code, created_at, updated_at
            FROM members
            ORDER BY last_name, first_name, id
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Members whose access code is null or blank
    pub async fn list_without_access_code(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, member_number, first_name, last_name, mobile_phone, email,
                   is_admin, access_code, created_at, updated_at
            FROM members
            WHERE access_code IS NULL OR TRIM(access_code) = ''
            ORDER BY id
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Sets the access code, leaving every other column as it is
    ///
    /// Returns false when the row no longer exists. A duplicate access code
    /// surfaces as a unique-violation database error.
    pub async fn set_access_code(
        pool: &PgPool,
        id: i64,
        access_code: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE members SET access_code = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(access_code)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_admin(pool: &PgPool, id: i64, is_admin: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE members SET is_admin = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_admin)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a member together with their activities
    pub async fn delete_with_activities(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM activities WHERE member_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_admins(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members WHERE is_admin")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Replaces the whole roster in one transaction
    ///
    /// Existing members (and through the cascade, their activities) are
    /// removed before the new rows are inserted. Returns the number inserted.
    pub async fn replace_roster(
        pool: &PgPool,
        members: &[CreateMember],
    ) -> Result<usize, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM members").execute(&mut *tx).await?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO members
                    (member_number, first_name, last_name, mobile_phone, email, is_admin, access_code)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&member.member_number)
            .bind(&member.first_name)
            .bind(&member.last_name)
            .bind(&member.mobile_phone)
            .bind(&member.email)
            .bind(member.is_admin)
            .bind(&member.access_code)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(count = members.len(), "Roster replaced");
        Ok(members.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(first: Option<&str>, last: Option<&str>, code: Option<&str>) -> Member {
        Member {
            id: 1,
            member_number: "1001".to_string(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            mobile_phone: None,
            email: None,
            is_admin: false,
            access_code: code.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(member(Some("John"), Some("Smith"), None).display_name(), "John Smith");
        assert_eq!(member(None, Some("Smith"), None).display_name(), "Smith");
        assert_eq!(member(Some("  "), Some("Smith "), None).display_name(), "Smith");
        assert_eq!(member(None, None, None).display_name(), "");
    }

    #[test]
    fn test_has_access_code() {
        assert!(member(None, None, Some("ABC234")).has_access_code());
        assert!(!member(None, None, Some("   ")).has_access_code());
        assert!(!member(None, None, None).has_access_code());
    }

    #[test]
    fn test_access_code_not_serialized() {
        let json = serde_json::to_value(member(Some("A"), Some("B"), Some("SECRET"))).unwrap();
        assert!(json.get("access_code").is_none());
        assert_eq!(json["member_number"], "1001");
    }
}
