use super::email::SmtpSettings;
use crate::capture_core::config::{optional_var, parse_flag, parse_var};
use crate::capture_core::{ConfigError, ExternalPolicy};
use chrono::Duration;

/// Alerting configuration
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub enabled: bool,
    pub cooldown_minutes: i64,
    pub external_policy: ExternalPolicy,
    pub webhook_url: Option<String>,
    /// Present only when every SMTP credential is set
    pub smtp: Option<SmtpSettings>,
    pub desktop_toast: bool,
}

impl AlertConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ALERTS_ENABLED` (default: true)
    /// - `ALERT_COOLDOWN_MINUTES` (default: 10, minimum 1)
    /// - `ALERT_REQUIRE_BOTH_ENDPOINTS` (default: false)
    /// - `SLACK_WEBHOOK_URL` (optional)
    /// - `SMTP_SERVER` (default: smtp.gmail.com), `SMTP_PORT` (default: 587)
    /// - `SMTP_USERNAME`, `SMTP_PASSWORD`, `ALERT_EMAIL_FROM`, `ALERT_EMAIL_TO` (all or none)
    /// - `ALERT_DESKTOP_TOAST` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let require_both = parse_flag("ALERT_REQUIRE_BOTH_ENDPOINTS", false)?;

        let smtp = match (
            optional_var("SMTP_USERNAME"),
            optional_var("SMTP_PASSWORD"),
            optional_var("ALERT_EMAIL_FROM"),
            optional_var("ALERT_EMAIL_TO"),
        ) {
            (Some(username), Some(password), Some(from), Some(to)) => Some(SmtpSettings {
                server: optional_var("SMTP_SERVER").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port: parse_var("SMTP_PORT", 587u16)?,
                username,
                password,
                from,
                to,
            }),
            _ => None,
        };

        let config = Self {
            enabled: parse_flag("ALERTS_ENABLED", true)?,
            cooldown_minutes: parse_var("ALERT_COOLDOWN_MINUTES", 10i64)?,
            external_policy: if require_both {
                ExternalPolicy::BothEndpoints
            } else {
                ExternalPolicy::AnyEndpoint
            },
            webhook_url: optional_var("SLACK_WEBHOOK_URL"),
            smtp,
            desktop_toast: parse_flag("ALERT_DESKTOP_TOAST", true)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cooldown_minutes < 1 {
            return Err(ConfigError::InvalidValue(format!(
                "ALERT_COOLDOWN_MINUTES must be at least 1 (got {})",
                self.cooldown_minutes
            )));
        }

        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AlertConfig {
        AlertConfig {
            enabled: true,
            cooldown_minutes: 10,
            external_policy: ExternalPolicy::AnyEndpoint,
            webhook_url: None,
            smtp: None,
            desktop_toast: false,
        }
    }

    #[test]
    fn test_cooldown_lower_bound() {
        let mut cfg = config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cooldown(), Duration::minutes(10));

        cfg.cooldown_minutes = 0;
        assert!(cfg.validate().is_err());
    }
}
