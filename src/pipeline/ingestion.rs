//! Ingestion loop: enrich, assemble and persist each observation in order

use crate::capture_core::{
    assemble, AssembleError, EnrichedRecord, EnrichmentInfo, GeoEnricher, PacketObservation,
};
use crate::store::{RecordWriter, StoreError};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestionStats {
    pub received: u64,
    pub stored: u64,
    pub dropped: u64,
    /// Endpoints that fell back to the unknown sentinel
    pub degraded: u64,
}

#[derive(Debug)]
pub enum IngestionError {
    /// Too many back-to-back store failures
    StoreUnavailable {
        consecutive_failures: u32,
        last_error: StoreError,
    },
}

impl std::fmt::Display for IngestionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestionError::StoreUnavailable {
                consecutive_failures,
                last_error,
            } => write!(
                f,
                "Store unavailable after {} consecutive failures: {}",
                consecutive_failures, last_error
            ),
        }
    }
}

impl std::error::Error for IngestionError {}

/// Record built from one observation, plus how many endpoint lookups degraded
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedObservation {
    pub record: EnrichedRecord,
    pub degraded_endpoints: u8,
}

/// Enrich both endpoints and build the record
///
/// A missing or blank endpoint gets no enrichment.
pub fn process_observation(
    enricher: &GeoEnricher,
    observation: &PacketObservation,
) -> Result<ProcessedObservation, AssembleError> {
    let mut degraded_endpoints = 0u8;
    let mut enrich_endpoint = |addr: Option<&str>| -> Option<EnrichmentInfo> {
        let addr = addr.map(str::trim).filter(|a| !a.is_empty())?;
        let enrichment = enricher.enrich(addr);
        if enrichment.is_degraded() {
            degraded_endpoints += 1;
        }
        Some(enrichment.into_info())
    };

    let src_info = enrich_endpoint(observation.src.as_deref());
    let dst_info = enrich_endpoint(observation.dst.as_deref());
    let record = assemble(observation, src_info, dst_info)?;

    Ok(ProcessedObservation {
        record,
        degraded_endpoints,
    })
}

fn log_record(record: &EnrichedRecord) {
    let country = |info: &Option<EnrichmentInfo>| {
        info.as_ref()
            .map(|i| i.country.clone())
            .unwrap_or_else(|| "-".to_string())
    };

    log::debug!(
        "[+] {} | {} | {} → {}",
        record.flow_label(),
        record.proto,
        country(&record.src_info),
        country(&record.dst_info)
    );
}

/// Run until the channel closes or `shutdown` flips to true
///
/// A failed store write drops that record and the loop moves on. After
/// `max_consecutive_failures` failures in a row the store is treated as
/// unavailable and the loop returns an error.
pub async fn start_ingestion(
    mut rx: mpsc::Receiver<PacketObservation>,
    enricher: Arc<GeoEnricher>,
    writer: Arc<dyn RecordWriter>,
    max_consecutive_failures: u32,
    mut shutdown: watch::Receiver<bool>,
) -> Result<IngestionStats, IngestionError> {
    log::info!("🚀 Starting ingestion ({} backend)", writer.backend_type());
    log::info!("   └─ Halting after {} consecutive store failures", max_consecutive_failures);

    let mut stats = IngestionStats::default();
    let mut consecutive_failures = 0u32;
    let mut window_count = 0u64;
    let mut last_log_time = std::time::Instant::now();

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    log::info!("🛑 Ingestion received shutdown signal");
                    break;
                }
            }

            maybe_observation = rx.recv() => {
                let Some(observation) = maybe_observation else {
                    log::info!("📭 Observation source closed");
                    break;
                };
                stats.received += 1;

                let record = match process_observation(&enricher, &observation) {
                    Ok(processed) => {
                        stats.degraded += u64::from(processed.degraded_endpoints);
                        processed.record
                    }
                    Err(e) => {
                        log::warn!("⚠️  Observation skipped: {}", e);
                        stats.dropped += 1;
                        continue;
                    }
                };

                match writer.append(&record).await {
                    Ok(()) => {
                        consecutive_failures = 0;
                        stats.stored += 1;
                        window_count += 1;
                        log_record(&record);
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        stats.dropped += 1;
                        log::error!("❌ Failed to store {}: {}", record.flow_label(), e);

                        if consecutive_failures >= max_consecutive_failures {
                            return Err(IngestionError::StoreUnavailable {
                                consecutive_failures,
                                last_error: e,
                            });
                        }
                    }
                }

                // Log throughput every 10 seconds
                if last_log_time.elapsed().as_secs() >= 10 {
                    let per_sec = window_count as f64 / last_log_time.elapsed().as_secs_f64();
                    log::info!(
                        "📊 Ingestion rate: {:.1} records/sec (total stored: {}, dropped: {}, degraded lookups: {})",
                        per_sec,
                        stats.stored,
                        stats.dropped,
                        stats.degraded
                    );
                    last_log_time = std::time::Instant::now();
                    window_count = 0;
                }
            }
        }
    }

    log::info!(
        "✅ Ingestion stopped: {} received, {} stored, {} dropped, {} degraded lookups",
        stats.received,
        stats.stored,
        stats.dropped,
        stats.degraded
    );
    Ok(stats)
}
