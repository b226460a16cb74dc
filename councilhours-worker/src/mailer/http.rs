/// Transactional mail API client
///
/// Each email is one JSON `POST`:
///
/// ```json
/// {"from": "...", "to": "...", "subject": "...", "text": "..."}
/// ```
///
/// authenticated with `Authorization: Bearer <MAIL_API_KEY>`. Any 2xx answer
/// counts as accepted.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Mailer, MailerError, OutgoingEmail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept in `last_error`
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
        email.validate()?;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), to = %email.to, "Mail API rejected message");
            return Err(MailerError::Rejected {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        tracing::info!(to = %email.to, status = status.as_u16(), "Email handed to mail API");
        Ok(())
    }
}
