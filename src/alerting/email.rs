//! SMTP channel (STARTTLS relay, plain-text body)

use super::channel::{AlertMessage, ChannelError, NotificationChannel};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

pub const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

impl EmailChannel {
    pub fn new(settings: SmtpSettings) -> Result<Self, ChannelError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
            .map_err(|e| ChannelError::Smtp(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(settings.username, settings.password))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from: settings.from,
            to: settings.to,
        })
    }

    fn build_message(&self, message: &AlertMessage) -> Result<Message, ChannelError> {
        let from = self
            .from
            .parse::<Mailbox>()
            .map_err(|e| ChannelError::Smtp(format!("invalid from address: {}", e)))?;
        let to = self
            .to
            .parse::<Mailbox>()
            .map_err(|e| ChannelError::Smtp(format!("invalid to address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| ChannelError::Smtp(e.to_string()))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn timeout(&self) -> Duration {
        SMTP_TIMEOUT
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), ChannelError> {
        let email = self.build_message(message)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ChannelError::Smtp(e.to_string()))?;

        Ok(())
    }
}
