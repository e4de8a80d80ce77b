pub mod detector;
pub mod scorer;
pub mod window;

pub use detector::{AnomalyDetector, AnomalyEvent, ScoredBucket};
pub use scorer::IsolationForest;
pub use window::{aggregate, BucketUnit, TrafficBucket};
