//! Combine an observation with both endpoints' enrichment into one record

use super::enrichment::EnrichmentInfo;
use super::observation::PacketObservation;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The persisted unit: one packet plus context for both endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub time: NaiveDateTime,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub proto: String,
    pub length: u64,
    pub flags: Option<String>,
    pub dns_query: Option<String>,
    pub src_info: Option<EnrichmentInfo>,
    pub dst_info: Option<EnrichmentInfo>,
    pub threat: Option<String>,
}

/// Which records count as externally routed traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalPolicy {
    /// At least one endpoint routable and geolocated
    AnyEndpoint,
    /// Both endpoints routable and geolocated
    BothEndpoints,
}

impl EnrichedRecord {
    pub fn is_external(&self, policy: ExternalPolicy) -> bool {
        let located = |info: &Option<EnrichmentInfo>| {
            info.as_ref().map(EnrichmentInfo::is_geolocated).unwrap_or(false)
        };

        match policy {
            ExternalPolicy::AnyEndpoint => located(&self.src_info) || located(&self.dst_info),
            ExternalPolicy::BothEndpoints => located(&self.src_info) && located(&self.dst_info),
        }
    }

    /// `src → dst` with `?` for absent endpoints
    pub fn flow_label(&self) -> String {
        format!(
            "{} → {}",
            self.src.as_deref().unwrap_or("?"),
            self.dst.as_deref().unwrap_or("?")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssembleError {
    MissingTimestamp,
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssembleError::MissingTimestamp => write!(f, "observation has no timestamp"),
        }
    }
}

impl std::error::Error for AssembleError {}

/// Pure combination, no I/O
pub fn assemble(
    observation: &PacketObservation,
    src_info: Option<EnrichmentInfo>,
    dst_info: Option<EnrichmentInfo>,
) -> Result<EnrichedRecord, AssembleError> {
    let time = observation.timestamp.ok_or(AssembleError::MissingTimestamp)?;

    Ok(EnrichedRecord {
        time,
        src: observation.src.clone(),
        dst: observation.dst.clone(),
        proto: observation.proto.clone(),
        length: observation.length,
        flags: observation.flags.clone(),
        dns_query: observation.dns_query.clone(),
        src_info,
        dst_info,
        threat: None,
    })
}
