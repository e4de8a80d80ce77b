//! Time-bucketed traffic volume

use crate::capture_core::EnrichedRecord;
use chrono::{DateTime, NaiveDateTime};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketUnit {
    /// One capture tick
    Second,
    Minute,
    FiveMinutes,
    Hour,
}

impl BucketUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketUnit::Second => "1s",
            BucketUnit::Minute => "1m",
            BucketUnit::FiveMinutes => "5m",
            BucketUnit::Hour => "1h",
        }
    }

    pub fn duration_secs(&self) -> i64 {
        match self {
            BucketUnit::Second => 1,
            BucketUnit::Minute => 60,
            BucketUnit::FiveMinutes => 5 * 60,
            BucketUnit::Hour => 60 * 60,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1s" => Some(BucketUnit::Second),
            "1m" => Some(BucketUnit::Minute),
            "5m" => Some(BucketUnit::FiveMinutes),
            "1h" => Some(BucketUnit::Hour),
            _ => None,
        }
    }

    /// Floor `time` to the start of its bucket
    pub fn truncate(&self, time: NaiveDateTime) -> NaiveDateTime {
        let secs = time.and_utc().timestamp();
        let start = secs - secs.rem_euclid(self.duration_secs());
        DateTime::from_timestamp(start, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficBucket {
    pub key: NaiveDateTime,
    pub bytes: u64,
    pub records: usize,
}

/// Sum record lengths per bucket
///
/// Output is sorted ascending by key and sparse: empty buckets are not emitted.
pub fn aggregate(records: &[EnrichedRecord], unit: BucketUnit) -> Vec<TrafficBucket> {
    let mut sums: BTreeMap<NaiveDateTime, (u64, usize)> = BTreeMap::new();

    for record in records {
        let entry = sums.entry(unit.truncate(record.time)).or_insert((0, 0));
        entry.0 += record.length;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(key, (bytes, records))| TrafficBucket { key, bytes, records })
        .collect()
}

/// Keep only the newest `max` buckets
pub fn tail(mut buckets: Vec<TrafficBucket>, max: usize) -> Vec<TrafficBucket> {
    if buckets.len() > max {
        buckets.drain(..buckets.len() - max);
    }
    buckets
}
