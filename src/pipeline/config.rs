use crate::capture_core::config::parse_var;
use crate::capture_core::ConfigError;
use crate::detection_core::BucketUnit;

/// Detection cycle configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub detection_interval_ms: u64,
    pub record_limit: usize,
    pub max_buckets: usize,
    pub bucket_unit: BucketUnit,
    pub contamination: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 3_000,
            record_limit: 5_000,
            max_buckets: 200,
            bucket_unit: BucketUnit::Second,
            contamination: 0.10,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DETECTION_INTERVAL_MS` (default: 3000)
    /// - `DETECTION_RECORD_LIMIT` (default: 5000)
    /// - `DETECTION_MAX_BUCKETS` (default: 200)
    /// - `BUCKET_UNIT` (default: 1s; one of 1s, 1m, 5m, 1h)
    /// - `ANOMALY_CONTAMINATION` (default: 0.10, exclusive range 0..1)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let unit_raw: String = parse_var("BUCKET_UNIT", defaults.bucket_unit.as_str().to_string())?;
        let bucket_unit = BucketUnit::from_str(unit_raw.trim()).ok_or_else(|| {
            ConfigError::InvalidValue(format!("BUCKET_UNIT='{}' (expected 1s, 1m, 5m or 1h)", unit_raw))
        })?;

        let config = Self {
            detection_interval_ms: parse_var("DETECTION_INTERVAL_MS", defaults.detection_interval_ms)?,
            record_limit: parse_var("DETECTION_RECORD_LIMIT", defaults.record_limit)?,
            max_buckets: parse_var("DETECTION_MAX_BUCKETS", defaults.max_buckets)?,
            bucket_unit,
            contamination: parse_var("ANOMALY_CONTAMINATION", defaults.contamination)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.contamination > 0.0 && self.contamination < 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "ANOMALY_CONTAMINATION must be in (0, 1) (got {})",
                self.contamination
            )));
        }

        if self.detection_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "DETECTION_INTERVAL_MS must be at least 1".to_string(),
            ));
        }

        if self.record_limit == 0 || self.max_buckets < 2 {
            return Err(ConfigError::InvalidValue(
                "DETECTION_RECORD_LIMIT must be >= 1 and DETECTION_MAX_BUCKETS >= 2".to_string(),
            ));
        }

        Ok(())
    }
}
