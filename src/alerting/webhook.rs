//! Chat webhook channel (Slack-compatible `{"text": ...}` payload)

use super::channel::{AlertMessage, ChannelError, NotificationChannel};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

/// Subject in bold on the first line, body below
pub fn webhook_payload(message: &AlertMessage) -> serde_json::Value {
    json!({ "text": format!("*{}*\n{}", message.subject, message.body) })
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn timeout(&self) -> Duration {
        WEBHOOK_TIMEOUT
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.url)
            .json(&webhook_payload(message))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChannelError::Rejected(response.status().to_string()));
        }

        Ok(())
    }
}
