use async_trait::async_trait;
use std::time::Duration;

/// What every channel delivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Debug)]
pub enum ChannelError {
    Http(String),
    Rejected(String),
    Smtp(String),
    Desktop(String),
    Timeout(Duration),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::Http(e) => write!(f, "HTTP error: {}", e),
            ChannelError::Rejected(status) => write!(f, "Rejected by endpoint: {}", status),
            ChannelError::Smtp(e) => write!(f, "SMTP error: {}", e),
            ChannelError::Desktop(e) => write!(f, "Desktop notification error: {}", e),
            ChannelError::Timeout(d) => write!(f, "Timed out after {:?}", d),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<reqwest::Error> for ChannelError {
    fn from(err: reqwest::Error) -> Self {
        ChannelError::Http(err.to_string())
    }
}

/// A best-effort alert sink
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upper bound the dispatcher allows for one `send`
    fn timeout(&self) -> Duration;

    async fn send(&self, message: &AlertMessage) -> Result<(), ChannelError>;
}
