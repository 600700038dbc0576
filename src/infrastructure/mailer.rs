//! Outbound mail adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{EmailMessage, Notifier, NotifyError, Receipt};
use crate::infrastructure::config::MailConfig;

/// Posts messages as JSON to an HTTP mail provider.
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

#[derive(Deserialize)]
struct ProviderResponse {
    #[serde(alias = "id")]
    message_id: Option<String>,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<Receipt, NotifyError> {
        let body = json!({
            "from": self.config.from,
            "to": [{ "email": message.to.email, "name": message.to.name }],
            "subject": message.subject,
            "text": message.text_body,
            "html": message.html_body,
        });

        let mut request = self.client.post(&self.config.api_url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{}: {}", status, detail)));
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .unwrap_or(ProviderResponse { message_id: None });

        Ok(Receipt {
            message_id: parsed
                .message_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        })
    }
}

/// Logs messages instead of sending them; used when no provider is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: EmailMessage) -> Result<Receipt, NotifyError> {
        tracing::info!(
            to = %message.to.email,
            subject = %message.subject,
            "Mail provider not configured, notice logged only"
        );
        Ok(Receipt {
            message_id: format!("log-{}", uuid::Uuid::new_v4()),
        })
    }
}

pub fn notifier_from_config(mail: Option<&MailConfig>) -> Arc<dyn Notifier> {
    match mail {
        Some(config) => Arc::new(HttpMailer::new(config.clone())),
        None => Arc::new(LogNotifier),
    }
}
