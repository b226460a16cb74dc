/// Notification outbox reader
///
/// Claims queued emails for delivery and records the outcome.
///
/// # Polling Strategy
///
/// - Batch size: 10 notifications (configurable)
/// - Ordering: FIFO (`created_at`, then `id`)
/// - Claimed rows move to `sending`; rows locked by another worker are skipped
/// - Failed rows are claimed again until they reach the attempt limit
/// - Rows stuck in `sending` longer than the lease (default 5 minutes) are
///   claimed again, or failed once out of attempts
///
/// # Example
///
/// ```no_run
/// use councilhours_worker::queue::{NotificationQueue, Outbox};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let queue = NotificationQueue::new(pool);
/// for notification in queue.claim().await? {
///     println!("Claimed notification {}", notification.id);
/// }
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use councilhours_shared::models::notification::{Notification, NotificationStatus};
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;

use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_LEASE_SECS, DEFAULT_MAX_ATTEMPTS};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification not found: {0}")]
    NotFound(i64),
}

/// Where the dispatcher takes work from and reports back to
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Claims the next batch, oldest first
    async fn claim(&self) -> Result<Vec<Notification>, QueueError>;

    async fn mark_sent(&self, id: i64) -> Result<(), QueueError>;

    async fn mark_failed(&self, id: i64, error: &str) -> Result<(), QueueError>;
}

/// Postgres-backed outbox
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    db: PgPool,

    batch_size: i64,

    max_attempts: i32,

    /// How long a claim may stay in `sending` before it is taken back
    lease: Duration,
}

impl NotificationQueue {
    pub fn new(db: PgPool) -> Self {
        Self::with_limits(db, DEFAULT_BATCH_SIZE, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_limits(db: PgPool, batch_size: i64, max_attempts: i32) -> Self {
        Self {
            db,
            batch_size,
            max_attempts,
            lease: Duration::from_secs(DEFAULT_LEASE_SECS),
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }

    pub async fn pending_count(&self) -> Result<i64, QueueError> {
        Ok(Notification::count_by_status(&self.db, NotificationStatus::Pending).await?)
    }
}

#[async_trait]
impl Outbox for NotificationQueue {
    async fn claim(&self) -> Result<Vec<Notification>, QueueError> {
        let expired =
            Notification::fail_expired_leases(&self.db, self.max_attempts, self.lease).await?;
        if expired > 0 {
            tracing::warn!(count = expired, "Failed notifications whose lease expired");
        }

        let claimed =
            Notification::claim_batch(&self.db, self.batch_size, self.max_attempts, self.lease)
                .await?;

        if !claimed.is_empty() {
            tracing::info!(count = claimed.len(), "Claimed notifications");
        }

        Ok(claimed)
    }

    async fn mark_sent(&self, id: i64) -> Result<(), QueueError> {
        if !Notification::mark_sent(&self.db, id).await? {
            return Err(QueueError::NotFound(id));
        }

        tracing::info!(notification_id = id, "Notification marked as sent");
        Ok(())
    }

    async fn mark_failed(&self, id: i64, error: &str) -> Result<(), QueueError> {
        if !Notification::mark_failed(&self.db, id, error).await? {
            return Err(QueueError::NotFound(id));
        }

        tracing::warn!(notification_id = id, error, "Notification marked as failed");
        Ok(())
    }
}
