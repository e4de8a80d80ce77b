pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod email;
pub mod toast;
pub mod webhook;

pub use channel::{AlertMessage, ChannelError, NotificationChannel};
pub use config::AlertConfig;
pub use dispatcher::{AlertDispatcher, AlertState};

use email::EmailChannel;
use toast::ToastChannel;
use webhook::WebhookChannel;

/// Instantiate every channel the configuration enables
///
/// A channel that fails to build is logged and left out.
pub fn build_channels(config: &AlertConfig) -> Vec<Box<dyn NotificationChannel>> {
    let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

    if let Some(url) = &config.webhook_url {
        match WebhookChannel::new(url.clone()) {
            Ok(channel) => channels.push(Box::new(channel)),
            Err(e) => log::warn!("⚠️  Webhook channel disabled: {}", e),
        }
    }

    if let Some(smtp) = &config.smtp {
        match EmailChannel::new(smtp.clone()) {
            Ok(channel) => channels.push(Box::new(channel)),
            Err(e) => log::warn!("⚠️  Email channel disabled: {}", e),
        }
    }

    if config.desktop_toast {
        channels.push(Box::new(ToastChannel::new()));
    }

    channels
}
