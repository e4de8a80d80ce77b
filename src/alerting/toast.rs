//! Local desktop notification

use super::channel::{AlertMessage, ChannelError, NotificationChannel};
use async_trait::async_trait;
use notify_rust::{Notification, Timeout};
use std::time::Duration;

pub const TOAST_TIMEOUT: Duration = Duration::from_secs(8);

pub struct ToastChannel;

impl ToastChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ToastChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationChannel for ToastChannel {
    fn name(&self) -> &'static str {
        "toast"
    }

    fn timeout(&self) -> Duration {
        TOAST_TIMEOUT
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), ChannelError> {
        let subject = message.subject.clone();
        let body = message.body.clone();

        // Platform notification APIs block
        tokio::task::spawn_blocking(move || {
            Notification::new()
                .summary(&subject)
                .body(&body)
                .timeout(Timeout::Milliseconds(TOAST_TIMEOUT.as_millis() as u32))
                .show()
                .map(|_| ())
                .map_err(|e| ChannelError::Desktop(e.to_string()))
        })
        .await
        .map_err(|e| ChannelError::Desktop(e.to_string()))?
    }
}
