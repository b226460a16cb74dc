/// Outgoing mail transports
///
/// The dispatcher hands every claimed notification to a [`Mailer`]:
///
/// - [`LogMailer`]: writes the email to the log, for development
/// - [`HttpMailer`]: posts it to a transactional mail API

pub mod http;
pub mod log;

pub use http::HttpMailer;
pub use log::LogMailer;

use async_trait::async_trait;
use councilhours_shared::models::notification::Notification;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::MailTransport;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid email: {0}")]
    InvalidMessage(String),
}

/// A rendered email ready to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl OutgoingEmail {
    pub fn from_notification(notification: &Notification, from: &str) -> Self {
        Self {
            from: from.to_string(),
            to: notification.to_address.trim().to_string(),
            subject: notification.subject.clone(),
            text: notification.body.clone(),
        }
    }

    /// Rejects messages no transport could deliver
    pub fn validate(&self) -> Result<(), MailerError> {
        if self.to.is_empty() || !self.to.contains('@') {
            return Err(MailerError::InvalidMessage(format!(
                "bad recipient address '{}'",
                self.to
            )));
        }
        if self.subject.contains(|c: char| c == '\r' || c == '\n') {
            return Err(MailerError::InvalidMessage(
                "subject contains a line break".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError>;
}

/// Builds the mailer selected by the configuration
pub fn from_transport(transport: &MailTransport) -> Arc<dyn Mailer> {
    match transport {
        MailTransport::Log => Arc::new(LogMailer::new()),
        MailTransport::Http { url, api_key } => Arc::new(HttpMailer::new(url, api_key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str, subject: &str) -> OutgoingEmail {
        OutgoingEmail {
            from: "council@example.org".to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            text: "Hello".to_string(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(email("a@example.org", "Your code").validate().is_ok());
        assert!(email("", "Your code").validate().is_err());
        assert!(email("nobody", "Your code").validate().is_err());
        assert!(email("a@example.org", "Your code\r\nBcc: x@y.z")
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_transport() {
        assert_eq!(from_transport(&MailTransport::Log).name(), "log");
        let http = from_transport(&MailTransport::Http {
            url: "https://mail.example.org/send".to_string(),
            api_key: "key".to_string(),
        });
        assert_eq!(http.name(), "http");
    }
}
