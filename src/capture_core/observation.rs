//! Raw packet observations as handed over by the capture source

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire and store time format (`2025-06-01 14:03:22`)
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_TIME_FORMATS: [&str; 4] = [
    TIME_FORMAT,
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a full date-time in any accepted layout
///
/// Legacy time-only values (`14:03:22`) are rejected here; see
/// `store::maintenance::upgrade_legacy_timestamps` for rewriting them.
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ACCEPTED_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn format_time(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// One packet seen on the wire
///
/// Endpoints are optional because non-IP frames carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketObservation {
    #[serde(default, with = "optional_time")]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub dst: Option<String>,
    #[serde(default = "default_proto")]
    pub proto: String,
    pub length: u64,
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default)]
    pub dns_query: Option<String>,
}

fn default_proto() -> String {
    "?".to_string()
}

impl PacketObservation {
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

mod optional_time {
    use super::{format_time, parse_time};
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&format_time(time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_time(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw))),
            None => Ok(None),
        }
    }
}
