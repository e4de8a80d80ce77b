//! Periodic detection cycle
//!
//! Each tick reads the newest committed records, re-buckets them, retrains
//! the scorer on that window and hands any outliers to the dispatcher. A
//! cycle keeps no state of its own, so re-running it over the same store
//! contents gives the same buckets and scores.

use crate::alerting::AlertDispatcher;
use crate::capture_core::{EnrichedRecord, ExternalPolicy};
use crate::detection_core::window::tail;
use crate::detection_core::{aggregate, AnomalyDetector, AnomalyEvent, BucketUnit, TrafficBucket};
use crate::store::SqliteRecordReader;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub unit: BucketUnit,
    pub max_buckets: usize,
    pub external_policy: ExternalPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub buckets: usize,
    pub outliers: Vec<TrafficBucket>,
    pub events: Vec<AnomalyEvent>,
    pub alerted: bool,
}

/// Most recent record that counts as external under `policy`
pub fn most_recent_external(records: &[EnrichedRecord], policy: ExternalPolicy) -> Option<&EnrichedRecord> {
    records.iter().rev().find(|r| r.is_external(policy))
}

/// One evaluation over `records` (oldest first)
pub async fn run_detection_cycle(
    records: &[EnrichedRecord],
    settings: &DetectionSettings,
    detector: &AnomalyDetector,
    dispatcher: &AlertDispatcher,
    now: NaiveDateTime,
) -> CycleReport {
    let buckets = tail(aggregate(records, settings.unit), settings.max_buckets);
    let scored = detector.score(&buckets);

    let recent = most_recent_external(records, settings.external_policy);
    let recent_pair = recent.map(|r| {
        (
            r.src.clone().unwrap_or_default(),
            r.dst.clone().unwrap_or_default(),
        )
    });

    let events: Vec<AnomalyEvent> = scored
        .iter()
        .map(|s| AnomalyEvent {
            bucket: s.bucket.clone(),
            is_outlier: s.is_outlier,
            recent_external: recent_pair.clone(),
        })
        .collect();

    let outliers: Vec<TrafficBucket> = scored
        .into_iter()
        .filter(|s| s.is_outlier)
        .map(|s| s.bucket)
        .collect();

    if !outliers.is_empty() {
        log::info!(
            "🔍 {} outlier bucket(s) out of {} ({})",
            outliers.len(),
            buckets.len(),
            settings.unit.as_str()
        );
    }

    let alerted = dispatcher.maybe_alert(&outliers, recent, now).await;

    CycleReport {
        buckets: buckets.len(),
        outliers,
        events,
        alerted,
    }
}

/// Detection scheduler task - runs a cycle every `interval_ms` until shutdown
pub async fn detection_scheduler_task(
    reader: SqliteRecordReader,
    record_limit: usize,
    settings: DetectionSettings,
    detector: AnomalyDetector,
    dispatcher: Arc<AlertDispatcher>,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    log::info!("⏰ Starting detection scheduler (interval: {}ms)", interval_ms);
    log::info!("   ├─ Window: newest {} records", record_limit);
    log::info!(
        "   ├─ Buckets: {} (max {})",
        settings.unit.as_str(),
        settings.max_buckets
    );
    log::info!("   └─ Contamination: {:.2}", detector.contamination());

    let mut timer = interval(Duration::from_millis(interval_ms));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    log::info!("🛑 Detection scheduler stopping");
                    break;
                }
            }

            _ = timer.tick() => {
                let records = match reader.read_window(record_limit) {
                    Ok(records) => records,
                    Err(e) => {
                        log::error!("❌ Failed to read detection window: {}", e);
                        continue;
                    }
                };

                let now = chrono::Local::now().naive_local();
                let report = run_detection_cycle(&records, &settings, &detector, &dispatcher, now).await;

                log::debug!(
                    "Detection cycle: {} records, {} buckets, {} outliers, alerted={}",
                    records.len(),
                    report.buckets,
                    report.outliers.len(),
                    report.alerted
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::{AlertMessage, ChannelError, NotificationChannel};
    use crate::capture_core::observation::parse_time;
    use crate::capture_core::EnrichmentInfo;
    use crate::store::{RecordWriter, SqliteRecordWriter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChannel(Arc<AtomicUsize>);

    #[async_trait]
    impl NotificationChannel for CountingChannel {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn timeout(&self) -> std::time::Duration {
            std::time::Duration::from_secs(1)
        }

        async fn send(&self, _message: &AlertMessage) -> Result<(), ChannelError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn located() -> EnrichmentInfo {
        EnrichmentInfo {
            country: "United States".to_string(),
            city: "Mountain View".to_string(),
            lat: 37.386,
            lon: -122.0838,
            asn: Some("AS15169".to_string()),
            org: Some("GOOGLE".to_string()),
        }
    }

    fn record(time: &str, src: &str, length: u64, src_info: EnrichmentInfo) -> EnrichedRecord {
        EnrichedRecord {
            time: parse_time(time).unwrap(),
            src: Some(src.to_string()),
            dst: Some("192.168.1.5".to_string()),
            proto: "TCP".to_string(),
            length,
            flags: None,
            dns_query: None,
            src_info: Some(src_info),
            dst_info: Some(EnrichmentInfo::private()),
            threat: None,
        }
    }

    fn settings(policy: ExternalPolicy) -> DetectionSettings {
        DetectionSettings {
            unit: BucketUnit::Second,
            max_buckets: 200,
            external_policy: policy,
        }
    }

    #[test]
    fn test_most_recent_external_picks_latest() {
        let records = vec![
            record("2025-06-01 14:00:01", "8.8.8.8", 1, located()),
            record("2025-06-01 14:00:02", "1.1.1.1", 1, located()),
            record("2025-06-01 14:00:03", "10.0.0.7", 1, EnrichmentInfo::private()),
        ];

        let recent = most_recent_external(&records, ExternalPolicy::AnyEndpoint).unwrap();
        assert_eq!(recent.src.as_deref(), Some("1.1.1.1"));

        // Destination is private in every record
        assert!(most_recent_external(&records, ExternalPolicy::BothEndpoints).is_none());
    }

    #[tokio::test]
    async fn test_cycle_alerts_on_surge() {
        let sent = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(
            vec![Box::new(CountingChannel(sent.clone()))],
            chrono::Duration::minutes(10),
            true,
        );
        let records = vec![
            record("2025-06-01 14:00:01", "8.8.8.8", 200, located()),
            record("2025-06-01 14:00:02", "8.8.8.8", 50_000, located()),
        ];
        let now = parse_time("2025-06-01 14:00:03").unwrap();

        let report = run_detection_cycle(
            &records,
            &settings(ExternalPolicy::AnyEndpoint),
            &AnomalyDetector::with_defaults(),
            &dispatcher,
            now,
        )
        .await;

        assert_eq!(report.buckets, 2);
        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].bytes, 50_000);
        assert!(report.alerted);
        assert_eq!(
            report.events[1].recent_external,
            Some(("8.8.8.8".to_string(), "192.168.1.5".to_string()))
        );
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cycle_without_external_traffic_is_silent() {
        let sent = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(
            vec![Box::new(CountingChannel(sent.clone()))],
            chrono::Duration::minutes(10),
            true,
        );
        let records = vec![
            record("2025-06-01 14:00:01", "10.0.0.7", 200, EnrichmentInfo::private()),
            record("2025-06-01 14:00:02", "10.0.0.7", 50_000, EnrichmentInfo::private()),
        ];
        let now = parse_time("2025-06-01 14:00:03").unwrap();

        let report = run_detection_cycle(
            &records,
            &settings(ExternalPolicy::AnyEndpoint),
            &AnomalyDetector::with_defaults(),
            &dispatcher,
            now,
        )
        .await;

        assert_eq!(report.outliers.len(), 1);
        assert!(!report.alerted);
        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_bucket_window_is_empty() {
        let dispatcher = AlertDispatcher::new(Vec::new(), chrono::Duration::minutes(10), true);
        let records = vec![record("2025-06-01 14:00:01", "8.8.8.8", 200, located())];

        let report = run_detection_cycle(
            &records,
            &settings(ExternalPolicy::AnyEndpoint),
            &AnomalyDetector::with_defaults(),
            &dispatcher,
            parse_time("2025-06-01 14:00:02").unwrap(),
        )
        .await;

        assert_eq!(report.buckets, 1);
        assert!(report.events.is_empty());
        assert!(!report.alerted);
    }

    #[tokio::test]
    async fn test_scheduler_alerts_then_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("packets.db");

        let writer = SqliteRecordWriter::new(&db_path).unwrap();
        writer.append(&record("2025-06-01 14:00:01", "8.8.8.8", 200, located())).await.unwrap();
        writer.append(&record("2025-06-01 14:00:02", "8.8.8.8", 50_000, located())).await.unwrap();

        let sent = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(AlertDispatcher::new(
            vec![Box::new(CountingChannel(sent.clone()))],
            chrono::Duration::minutes(10),
            true,
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(detection_scheduler_task(
            SqliteRecordReader::new(&db_path).unwrap(),
            5_000,
            settings(ExternalPolicy::AnyEndpoint),
            AnomalyDetector::with_defaults(),
            dispatcher.clone(),
            10,
            shutdown_rx,
        ));

        // Later ticks stay inside the cooldown
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(sent.load(Ordering::SeqCst), 1);
        assert!(dispatcher.last_alert_at().await.is_some());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
