use std::env;

/// Ingestion-side runtime configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub db_path: String,
    pub city_db_path: String,
    pub asn_db_path: String,
    pub channel_buffer: usize,
    /// Back-to-back store failures tolerated before ingestion halts
    pub max_consecutive_failures: u32,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Read a variable that must parse when present
pub(crate) fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{}='{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

/// Read a boolean, accepting true/false/1/0/yes/no/on/off
pub(crate) fn parse_flag(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(format!("{}='{}'", key, raw))),
        },
        Err(_) => Ok(default),
    }
}

/// Non-empty variable, or None
pub(crate) fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CaptureConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `GEOFLOW_DB_PATH` (default: packets.db)
    /// - `GEOIP_CITY_DB` (default: GeoLite2-City.mmdb)
    /// - `GEOIP_ASN_DB` (default: GeoLite2-ASN.mmdb)
    /// - `CAPTURE_CHANNEL_BUFFER` (default: 1000)
    /// - `INGEST_MAX_CONSECUTIVE_FAILURES` (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            db_path: optional_var("GEOFLOW_DB_PATH").unwrap_or_else(|| "packets.db".to_string()),
            city_db_path: optional_var("GEOIP_CITY_DB")
                .unwrap_or_else(|| "GeoLite2-City.mmdb".to_string()),
            asn_db_path: optional_var("GEOIP_ASN_DB")
                .unwrap_or_else(|| "GeoLite2-ASN.mmdb".to_string()),
            channel_buffer: parse_var("CAPTURE_CHANNEL_BUFFER", 1_000)?,
            max_consecutive_failures: parse_var("INGEST_MAX_CONSECUTIVE_FAILURES", 100)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "CAPTURE_CHANNEL_BUFFER must be at least 1".to_string(),
            ));
        }

        if self.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidValue(
                "INGEST_MAX_CONSECUTIVE_FAILURES must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
