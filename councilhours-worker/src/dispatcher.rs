/// Notification dispatcher
///
/// The worker's main loop: claim a batch from the outbox, send every email in
/// it concurrently, record each outcome, repeat.
///
/// ```text
/// Dispatcher
///   ├─> Outbox: claim batch (pending → sending)
///   ├─> Mailer: send each email concurrently
///   └─> Outbox: mark sent / failed
/// ```
///
/// When a batch went through cleanly the next one is claimed right away;
/// otherwise (empty queue or any failure) the loop waits one poll interval.
/// Cancelling the shutdown token stops the loop after the batch in flight.

use crate::mailer::{Mailer, OutgoingEmail};
use crate::queue::{Outbox, QueueError};
use councilhours_shared::models::notification::Notification;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Wait after an empty or partly failed batch
    pub poll_interval: Duration,

    /// Sender address on every email
    pub from_address: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(crate::config::DEFAULT_POLL_INTERVAL_SECS),
            from_address: "noreply@localhost".to_string(),
        }
    }
}

/// Outcome counts for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct Dispatcher<O> {
    outbox: O,

    mailer: Arc<dyn Mailer>,

    config: DispatcherConfig,

    shutdown_token: CancellationToken,
}

impl<O: Outbox> Dispatcher<O> {
    pub fn new(outbox: O, mailer: Arc<dyn Mailer>, config: DispatcherConfig) -> Self {
        Self {
            outbox,
            mailer,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancel to stop [`Dispatcher::run`]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    /// Claims one batch and delivers it
    pub async fn dispatch_batch(&self) -> Result<DispatchSummary, QueueError> {
        let claimed = self.outbox.claim().await?;
        if claimed.is_empty() {
            return Ok(DispatchSummary::default());
        }

        let outcomes = join_all(claimed.iter().map(|n| self.deliver(n))).await;
        let sent = outcomes.iter().filter(|&&delivered| delivered).count();

        let summary = DispatchSummary {
            claimed: claimed.len(),
            sent,
            failed: claimed.len() - sent,
        };
        tracing::info!(
            claimed = summary.claimed,
            sent = summary.sent,
            failed = summary.failed,
            "Batch dispatched"
        );
        Ok(summary)
    }

    /// Sends one notification and records the outcome; true when sent
    async fn deliver(&self, notification: &Notification) -> bool {
        let email = OutgoingEmail::from_notification(notification, &self.config.from_address);

        let (delivered, recorded) = match self.mailer.send(&email).await {
            Ok(()) => (true, self.outbox.mark_sent(notification.id).await),
            Err(e) => {
                tracing::warn!(
                    notification_id = notification.id,
                    attempt = notification.attempts,
                    mailer = self.mailer.name(),
                    error = %e,
                    "Email delivery failed"
                );
                (false, self.outbox.mark_failed(notification.id, &e.to_string()).await)
            }
        };

        if let Err(e) = recorded {
            // Left in `sending` until the claim lease runs out
            tracing::error!(
                notification_id = notification.id,
                error = %e,
                "Failed to record delivery outcome"
            );
        }

        delivered
    }

    /// Runs until the shutdown token is cancelled
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            mailer = self.mailer.name(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Dispatcher starting"
        );

        loop {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            match self.dispatch_batch().await {
                Ok(summary) if summary.claimed > 0 && summary.failed == 0 => continue,
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Failed to claim notifications"),
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!("Dispatcher shut down");
        Ok(())
    }
}
