pub mod assembler;
pub mod classifier;
pub mod config;
pub mod enrichment;
pub mod geoip;
pub mod observation;
pub mod source;

pub use assembler::{assemble, AssembleError, EnrichedRecord, ExternalPolicy};
pub use classifier::{classify, AddressClass};
pub use config::{CaptureConfig, ConfigError};
pub use enrichment::{Enrichment, EnrichmentInfo, GeoEnricher, GeoLookup, LookupError};
pub use geoip::MaxMindLookup;
pub use observation::PacketObservation;
