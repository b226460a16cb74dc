/// Notification outbox
///
/// The API enqueues rendered emails here; the worker claims and delivers them.
///
/// # State Machine
///
/// ```text
/// pending → sending → sent
///                   → failed → sending (retry while attempts remain)
/// ```
///
/// A claim stamps `claimed_at`. A row left in `sending` past the lease (the
/// worker died or could not record the outcome) is claimable again, or is
/// failed outright once it has no attempts left.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Duration;

/// Delivery status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sending => "sending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(NotificationStatus::Pending),
            "sending" => Some(NotificationStatus::Sending),
            "sent" => Some(NotificationStatus::Sent),
            "failed" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }
}

/// One queued email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub member_number: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    /// Raw status column, see [`Notification::status`]
    #[serde(rename = "status")]
    pub status_raw: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When the current or last claim was taken
    pub claimed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Recorded on rows failed by [`Notification::fail_expired_leases`]
pub const LEASE_EXPIRED_ERROR: &str = "delivery lease expired";

/// Input for [`Notification::enqueue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub member_number: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
}

pub(crate) const NOTIFICATION_COLUMNS: &str =
    "id, member_number, to_address, subject, body, status AS status_raw, attempts, last_error, created_at, claimed_at, sent_at";

impl Notification {
    pub fn status(&self) -> Option<NotificationStatus> {
        NotificationStatus::parse(&self.status_raw)
    }

    /// Queues an email for the worker
    pub async fn enqueue(pool: &PgPool, new: NewNotification) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO notifications (member_number, to_address, subject, body, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let notification = sqlx::query_as::<_, Notification>(&sql)
            .bind(&new.member_number)
            .bind(&new.to_address)
            .bind(&new.subject)
            .bind(&new.body)
            .bind(NotificationStatus::Pending.as_str())
            .fetch_one(pool)
            .await?;

        tracing::info!(
            notification_id = notification.id,
            member_number = %notification.member_number,
            "Notification queued"
        );

        Ok(notification)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM notifications WHERE id = $1", NOTIFICATION_COLUMNS);

        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Claims up to `limit` deliverable rows, oldest first
    ///
    /// Deliverable means pending, failed with attempts below `max_attempts`,
    /// or stuck in `sending` with a claim older than `lease` and attempts
    /// below `max_attempts`. Claimed rows move to `sending` with a fresh
    /// `claimed_at` and their attempt counter incremented. Rows locked by
    /// another claimer are skipped.
    pub async fn claim_batch(
        pool: &PgPool,
        limit: i64,
        max_attempts: i32,
        lease: Duration,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            WITH claimable AS (
                SELECT id
                FROM notifications
                WHERE status = $1
                   OR (status = $2 AND attempts < $3)
                   OR (status = $5
                       AND attempts < $3
                       AND claimed_at < NOW() - make_interval(secs => $6))
                ORDER BY created_at ASC, id ASC
                LIMIT $4
                FOR UPDATE SKIP LOCKED
            )
            UPDATE notifications
            SET status = $5,
                attempts = notifications.attempts + 1,
                claimed_at = NOW()
            FROM claimable
            WHERE notifications.id = claimable.id
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
                .split(", ")
                .map(|column| format!("notifications.{}", column))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut claimed = sqlx::query_as::<_, Notification>(&sql)
            .bind(NotificationStatus::Pending.as_str())
            .bind(NotificationStatus::Failed.as_str())
            .bind(max_attempts)
            .bind(limit)
            .bind(NotificationStatus::Sending.as_str())
            .bind(lease.as_secs_f64())
            .fetch_all(pool)
            .await?;

        // UPDATE ... RETURNING does not preserve the CTE order
        claimed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(claimed)
    }

    /// Fails `sending` rows whose lease ran out with no attempts left
    ///
    /// Returns the number of rows failed.
    pub async fn fail_expired_leases(
        pool: &PgPool,
        max_attempts: i32,
        lease: Duration,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $2, last_error = $3
            WHERE status = $1
              AND attempts >= $4
              AND claimed_at < NOW() - make_interval(secs => $5)
            "#,
        )
        .bind(NotificationStatus::Sending.as_str())
        .bind(NotificationStatus::Failed.as_str())
        .bind(LEASE_EXPIRED_ERROR)
        .bind(max_attempts)
        .bind(lease.as_secs_f64())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn mark_sent(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET status = $2, sent_at = NOW(), last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(NotificationStatus::Sent.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_failed(pool: &PgPool, id: i64, error: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE notifications SET status = $2, last_error = $3 WHERE id = $1")
                .bind(id)
                .bind(NotificationStatus::Failed.as_str())
                .bind(error)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_status(
        pool: &PgPool,
        status: NotificationStatus,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
