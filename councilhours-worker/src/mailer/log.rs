use async_trait::async_trait;

use super::{Mailer, MailerError, OutgoingEmail};

/// Logs emails instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        email.validate()?;

        tracing::info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            "Email (log transport)"
        );
        tracing::debug!(body = %email.text, "Email body");
        Ok(())
    }
}
