//! Cooldown-gated fan-out to notification channels

use super::channel::{AlertMessage, ChannelError, NotificationChannel};
use crate::capture_core::observation::format_time;
use crate::capture_core::EnrichedRecord;
use crate::detection_core::TrafficBucket;
use chrono::{Duration, NaiveDateTime};
use tokio::sync::Mutex;

/// Authoritative cooldown clock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    pub last_alert_at: Option<NaiveDateTime>,
}

impl AlertState {
    /// Strictly more than `cooldown` since the last alert, or never alerted
    pub fn cooled_down(&self, now: NaiveDateTime, cooldown: Duration) -> bool {
        match self.last_alert_at {
            Some(last) => now - last > cooldown,
            None => true,
        }
    }
}

pub struct AlertDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
    cooldown: Duration,
    enabled: bool,
    state: Mutex<AlertState>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>, cooldown: Duration, enabled: bool) -> Self {
        Self {
            channels,
            cooldown,
            enabled,
            state: Mutex::new(AlertState::default()),
        }
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn last_alert_at(&self) -> Option<NaiveDateTime> {
        self.state.lock().await.last_alert_at
    }

    /// Raise one alert if outliers coincide with external traffic and the
    /// cooldown has elapsed
    ///
    /// Returns true when at least one channel delivered. The state lock is
    /// held from the cooldown check through the state update.
    pub async fn maybe_alert(
        &self,
        outliers: &[TrafficBucket],
        recent_external: Option<&EnrichedRecord>,
        now: NaiveDateTime,
    ) -> bool {
        if !self.enabled || outliers.is_empty() {
            return false;
        }
        let Some(record) = recent_external else {
            log::debug!("Outliers present but no external traffic; no alert");
            return false;
        };

        let mut state = self.state.lock().await;
        if !state.cooled_down(now, self.cooldown) {
            log::debug!(
                "⏳ Alert suppressed by cooldown (last at {:?})",
                state.last_alert_at
            );
            return false;
        }

        let message = compose_message(outliers, record);
        let delivered = self.dispatch(&message).await;

        // Only a delivered alert starts the cooldown
        if delivered {
            state.last_alert_at = Some(now);
            log::info!("🚨 Alert raised for {}", record.flow_label());
        } else {
            log::warn!("⚠️  Alert for {} reached no channel; will retry next cycle", record.flow_label());
        }

        delivered
    }

    /// Try every channel; true if any succeeded
    async fn dispatch(&self, message: &AlertMessage) -> bool {
        let mut any = false;

        for channel in &self.channels {
            let result = match tokio::time::timeout(channel.timeout(), channel.send(message)).await {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Timeout(channel.timeout())),
            };

            match result {
                Ok(()) => {
                    log::info!("📣 Alert delivered via {}", channel.name());
                    any = true;
                }
                Err(e) => log::warn!("⚠️  {} channel failed: {}", channel.name(), e),
            }
        }

        any
    }
}

pub fn compose_message(outliers: &[TrafficBucket], record: &EnrichedRecord) -> AlertMessage {
    let mut body = format!(
        "Anomaly detected in external traffic! Src={} Dst={}\nFlow: {} ({})",
        record.src.as_deref().unwrap_or("?"),
        record.dst.as_deref().unwrap_or("?"),
        record.flow_label(),
        record.proto,
    );

    if let Some(peak) = outliers.iter().max_by_key(|b| b.bytes) {
        body.push_str(&format!(
            "\nOutlier buckets: {} (peak {} bytes at {})",
            outliers.len(),
            peak.bytes,
            format_time(&peak.key)
        ));
    }

    AlertMessage {
        subject: "🚨 Network anomaly detected".to_string(),
        body,
    }
}
