//! Runtime wiring: ingestion loop and detection scheduler
//!
//! ```text
//! mpsc<PacketObservation> → start_ingestion → RecordWriter
//!                                                 ↓ (packets table)
//! interval → detection_scheduler_task → SqliteRecordReader → run_detection_cycle → AlertDispatcher
//! ```

pub mod config;
pub mod ingestion;
pub mod scheduler;

pub use config::PipelineConfig;
pub use ingestion::{
    process_observation, start_ingestion, IngestionError, IngestionStats, ProcessedObservation,
};
pub use scheduler::{
    detection_scheduler_task, most_recent_external, run_detection_cycle, CycleReport,
    DetectionSettings,
};
