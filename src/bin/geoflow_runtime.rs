//! GeoFlow Runtime - live ingestion plus detection/alert cycle
//!
//! Reads packet observations as JSONL from `--input <file>` or stdin,
//! enriches and persists them, and periodically scores traffic volume for
//! anomalies.
//!
//! Usage:
//!   sniffer | geoflow_runtime
//!   geoflow_runtime --input capture.jsonl
//!
//! Configuration is read from the environment (and `.env`); see
//! `CaptureConfig`, `PipelineConfig` and `AlertConfig`.

use geoflow::alerting::{build_channels, AlertConfig, AlertDispatcher};
use geoflow::capture_core::source::stream_observations;
use geoflow::capture_core::{CaptureConfig, GeoEnricher, MaxMindLookup, PacketObservation};
use geoflow::detection_core::AnomalyDetector;
use geoflow::pipeline::{
    detection_scheduler_task, start_ingestion, DetectionSettings, PipelineConfig,
};
use geoflow::store::{RecordWriter, SqliteRecordReader, SqliteRecordWriter};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::{mpsc, watch};

fn parse_input_from_args() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|w| w[0] == "--input")
        .map(|w| w[1].clone())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let capture_config = CaptureConfig::from_env()?;
    let pipeline_config = PipelineConfig::from_env()?;
    let alert_config = AlertConfig::from_env()?;
    let input = parse_input_from_args();

    info!("🚀 Starting GeoFlow runtime");
    info!("   ├─ Database: {}", capture_config.db_path);
    info!("   ├─ GeoIP: {} / {}", capture_config.city_db_path, capture_config.asn_db_path);
    info!("   ├─ Input: {}", input.as_deref().unwrap_or("stdin"));
    info!("   ├─ Detection: every {}ms, {} records, {} buckets",
        pipeline_config.detection_interval_ms,
        pipeline_config.record_limit,
        pipeline_config.bucket_unit.as_str());
    info!("   └─ Alerts: {} (cooldown {} min, {:?})",
        if alert_config.enabled { "enabled" } else { "disabled" },
        alert_config.cooldown_minutes,
        alert_config.external_policy);

    // Missing datasets or an unopenable store are fatal
    let lookup = MaxMindLookup::open(&capture_config.city_db_path, &capture_config.asn_db_path)?;
    let enricher = Arc::new(GeoEnricher::new(Box::new(lookup)));

    let writer: Arc<dyn RecordWriter> = Arc::new(SqliteRecordWriter::new(&capture_config.db_path)?);
    let reader = SqliteRecordReader::new(&capture_config.db_path)?;

    let channels = build_channels(&alert_config);
    if channels.is_empty() && alert_config.enabled {
        warn!("⚠️  Alerts enabled but no notification channel is configured");
    }
    let dispatcher = Arc::new(AlertDispatcher::new(
        channels,
        alert_config.cooldown(),
        alert_config.enabled,
    ));
    info!("✅ Alert channels: {:?}", dispatcher.channel_names());

    let (tx, rx) = mpsc::channel::<PacketObservation>(capture_config.channel_buffer);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Task 1: observation source
    let source: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let source_handle = tokio::spawn(async move {
        if let Err(e) = stream_observations(source, tx).await {
            error!("❌ Observation source failed: {}", e);
        }
    });

    // Task 2: ingestion
    let mut ingestion_handle = tokio::spawn(start_ingestion(
        rx,
        enricher,
        writer,
        capture_config.max_consecutive_failures,
        shutdown_rx.clone(),
    ));

    // Task 3: detection scheduler
    let detection_handle = tokio::spawn(detection_scheduler_task(
        reader,
        pipeline_config.record_limit,
        DetectionSettings {
            unit: pipeline_config.bucket_unit,
            max_buckets: pipeline_config.max_buckets,
            external_policy: alert_config.external_policy,
        },
        AnomalyDetector::new(pipeline_config.contamination),
        dispatcher,
        pipeline_config.detection_interval_ms,
        shutdown_rx,
    ));

    info!("🔄 Press CTRL+C to shutdown gracefully");

    let mut fatal: Option<Box<dyn std::error::Error>> = None;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
                Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
            }
        }
        joined = &mut ingestion_handle => {
            match joined {
                Ok(Ok(stats)) => {
                    info!("📭 Ingestion finished ({} stored); detection keeps running until CTRL+C", stats.stored);
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        error!("❌ Failed to listen for CTRL+C: {}", err);
                    }
                }
                Ok(Err(e)) => {
                    error!("❌ Ingestion halted: {}", e);
                    fatal = Some(e.into());
                }
                Err(e) => {
                    error!("❌ Ingestion task panicked: {}", e);
                    fatal = Some(e.into());
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    source_handle.abort();

    if !ingestion_handle.is_finished() {
        match ingestion_handle.await {
            Ok(Ok(stats)) => info!("✅ Ingestion drained: {} stored, {} dropped", stats.stored, stats.dropped),
            Ok(Err(e)) => error!("❌ Ingestion halted: {}", e),
            Err(e) => error!("❌ Ingestion task failed: {}", e),
        }
    }
    if let Err(e) = detection_handle.await {
        error!("❌ Detection task failed: {}", e);
    }

    info!("✅ GeoFlow runtime stopped");

    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
