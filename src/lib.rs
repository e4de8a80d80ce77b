//! GeoFlow - live traffic enrichment and volume anomaly alerting
//!
//! # Architecture
//!
//! ```text
//! Capture Source (JSONL) → ObservationSource → mpsc channel
//!     ↓
//! Ingestion loop: AddressClassifier → GeoEnricher → assemble → SqliteRecordWriter
//!     ↓                                                              (packets table)
//! Detection cycle (interval): SqliteRecordReader → aggregate → AnomalyDetector
//!     ↓
//! AlertDispatcher (cooldown) → webhook / email / desktop toast
//! ```

pub mod alerting;
pub mod capture_core;
pub mod detection_core;
pub mod pipeline;
pub mod sqlite_pragma;
pub mod store;
