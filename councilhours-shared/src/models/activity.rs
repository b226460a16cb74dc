/// Activity model and database operations
///
/// One row per (member, catalog label). Saving a label again overwrites the
/// previous totals and moves the row's date to today.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activities (
///     id BIGSERIAL PRIMARY KEY,
///     member_id BIGINT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
///     date DATE NOT NULL,
///     category VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     hours DOUBLE PRECISION NOT NULL DEFAULT 0,
///     amount DOUBLE PRECISION NOT NULL DEFAULT 0,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX activities_member_category_key ON activities (member_id, category);
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::catalog;

/// Stored activity totals for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: i64,
    pub member_id: i64,
    pub date: NaiveDate,
    /// Exact catalog label
    pub category: String,
    pub description: String,
    /// Volunteer hours, or the count for quantity-only labels
    pub hours: f64,
    /// Money donated
    pub amount: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Why an entry was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryError {
    #[error("Unknown activity category: {0}")]
    UnknownCategory(String),

    #[error("Please enter valid numbers for all fields.")]
    InvalidNumber,

    #[error("Values must be non-negative.")]
    Negative,
}

/// Totals submitted for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub category: String,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub amount: f64,
}

impl ActivityEntry {
    pub fn new(category: impl Into<String>, hours: f64, amount: f64) -> Self {
        Self {
            category: category.into(),
            hours,
            amount,
        }
    }

    /// Checks the entry and zeroes the amount of quantity-only labels
    ///
    /// Unknown labels are only rejected when `require_known` is set; the
    /// autosave endpoint accepts free-form categories.
    pub fn normalized(mut self, require_known: bool) -> Result<Self, EntryError> {
        if require_known && !catalog::is_known(&self.category) {
            return Err(EntryError::UnknownCategory(self.category));
        }
        if catalog::is_quantity_only(&self.category) {
            self.amount = 0.0;
        }
        if !self.hours.is_finite() || !self.amount.is_finite() {
            return Err(EntryError::InvalidNumber);
        }
        if self.hours < 0.0 || self.amount < 0.0 {
            return Err(EntryError::Negative);
        }
        Ok(self)
    }

    fn is_empty(&self) -> bool {
        self.hours <= 0.0 && self.amount <= 0.0
    }
}

pub fn description_for(category: &str) -> String {
    format!("Form 1728 Section 1 - {}", category)
}

impl Activity {
    pub async fn list_by_member(pool: &PgPool, member_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, member_id, date, category, description, hours, amount, notes, created_at
            FROM activities
            WHERE member_id = $1
            ORDER BY id
            "#,
        )
        .bind(member_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, member_id, date, category, description, hours, amount, notes, created_at
            FROM activities
            ORDER BY member_id, id
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Writes one entry for a member
    ///
    /// An existing row is always updated. A new row is only created when the
    /// entry carries a non-zero value or `create_when_empty` is set. Returns
    /// the stored row, or None when nothing was written.
    pub async fn upsert(
        conn: &mut PgConnection,
        member_id: i64,
        entry: &ActivityEntry,
        today: NaiveDate,
        create_when_empty: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        if create_when_empty || !entry.is_empty() {
            let activity = sqlx::query_as::<_, Activity>(
                r#"
                INSERT INTO activities (member_id, date, category, description, hours, amount)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (member_id, category)
                DO UPDATE SET hours = EXCLUDED.hours,
                              amount = EXCLUDED.amount,
                              date = EXCLUDED.date
                RETURNING id, member_id, date, category, description, hours, amount, notes, created_at
                "#,
            )
            .bind(member_id)
            .bind(today)
            .bind(&entry.category)
            .bind(description_for(&entry.category))
            .bind(entry.hours)
            .bind(entry.amount)
            .fetch_one(conn)
            .await?;

            return Ok(Some(activity));
        }

        sqlx::query_as::<_, Activity>(
            r#"
            UPDATE activities
            SET hours = $3, amount = $4, date = $5
            WHERE member_id = $1 AND category = $2
            RETURNING id, member_id, date, category, description, hours, amount, notes, created_at
            "#,
        )
        .bind(member_id)
        .bind(&entry.category)
        .bind(entry.hours)
        .bind(entry.amount)
        .bind(today)
        .fetch_optional(conn)
        .await
    }

    /// Saves a full activity form in one transaction
    ///
    /// Entries must already be normalized. Returns the number of rows written.
    pub async fn save_form(
        pool: &PgPool,
        member_id: i64,
        entries: &[ActivityEntry],
        today: NaiveDate,
    ) -> Result<usize, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut written = 0;

        for entry in entries {
            if Self::upsert(&mut tx, member_id, entry, today, false)
                .await?
                .is_some()
            {
                written += 1;
            }
        }

        tx.commit().await?;
        Ok(written)
    }
}
