//! `packets` table layout shared by writer, reader and maintenance

use crate::capture_core::observation::{format_time, parse_time};
use crate::capture_core::{EnrichedRecord, EnrichmentInfo};
use rusqlite::{params, Connection, Row};

pub const CREATE_PACKETS_TABLE: &str = "CREATE TABLE IF NOT EXISTS packets (
    time TEXT,
    src TEXT,
    dst TEXT,
    proto TEXT,
    length INTEGER,
    flags TEXT,
    dns_query TEXT,
    src_country TEXT,
    src_city TEXT,
    src_lat REAL,
    src_lon REAL,
    src_asn TEXT,
    src_org TEXT,
    dst_country TEXT,
    dst_city TEXT,
    dst_lat REAL,
    dst_lon REAL,
    dst_asn TEXT,
    dst_org TEXT,
    threat TEXT
)";

pub const CREATE_TIME_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_time ON packets(time)";

pub const INSERT_PACKET: &str = "INSERT INTO packets VALUES
    (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)";

/// Column list in table order, for SELECTs
pub const PACKET_COLUMNS: &str = "time, src, dst, proto, length, flags, dns_query,
    src_country, src_city, src_lat, src_lon, src_asn, src_org,
    dst_country, dst_city, dst_lat, dst_lon, dst_asn, dst_org, threat";

pub fn ensure_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(CREATE_PACKETS_TABLE, [])?;
    conn.execute(CREATE_TIME_INDEX, [])?;
    Ok(())
}

pub fn insert_record(conn: &Connection, record: &EnrichedRecord) -> Result<(), rusqlite::Error> {
    let src = EnrichmentColumns::from(record.src_info.as_ref());
    let dst = EnrichmentColumns::from(record.dst_info.as_ref());

    conn.execute(
        INSERT_PACKET,
        params![
            format_time(&record.time),
            record.src,
            record.dst,
            record.proto,
            record.length as i64,
            record.flags,
            record.dns_query,
            src.country,
            src.city,
            src.lat,
            src.lon,
            src.asn,
            src.org,
            dst.country,
            dst.city,
            dst.lat,
            dst.lon,
            dst.asn,
            dst.org,
            record.threat,
        ],
    )?;

    Ok(())
}

/// Flattened, nullable view of an endpoint's enrichment
struct EnrichmentColumns<'a> {
    country: Option<&'a str>,
    city: Option<&'a str>,
    lat: Option<f64>,
    lon: Option<f64>,
    asn: Option<&'a str>,
    org: Option<&'a str>,
}

impl<'a> From<Option<&'a EnrichmentInfo>> for EnrichmentColumns<'a> {
    fn from(info: Option<&'a EnrichmentInfo>) -> Self {
        Self {
            country: info.map(|i| i.country.as_str()),
            city: info.map(|i| i.city.as_str()),
            lat: info.map(|i| i.lat),
            lon: info.map(|i| i.lon),
            asn: info.and_then(|i| i.asn.as_deref()),
            org: info.and_then(|i| i.org.as_deref()),
        }
    }
}

/// Rebuild endpoint enrichment from columns starting at `offset`
///
/// An endpoint stored without enrichment (all NULL) comes back as `None`.
fn enrichment_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<EnrichmentInfo>> {
    let country: Option<String> = row.get(offset)?;
    let city: Option<String> = row.get(offset + 1)?;

    if country.is_none() && city.is_none() {
        return Ok(None);
    }

    Ok(Some(EnrichmentInfo {
        country: country.unwrap_or_default(),
        city: city.unwrap_or_default(),
        lat: row.get::<_, Option<f64>>(offset + 2)?.unwrap_or(0.0),
        lon: row.get::<_, Option<f64>>(offset + 3)?.unwrap_or(0.0),
        asn: row.get(offset + 4)?,
        org: row.get(offset + 5)?,
    }))
}

/// Map a `SELECT PACKET_COLUMNS` row; `Ok(None)` when `time` is not a full date-time
pub fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Option<EnrichedRecord>> {
    let raw_time: Option<String> = row.get(0)?;
    let time = match raw_time.as_deref().and_then(parse_time) {
        Some(time) => time,
        None => return Ok(None),
    };

    Ok(Some(EnrichedRecord {
        time,
        src: row.get(1)?,
        dst: row.get(2)?,
        proto: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| "?".to_string()),
        length: row.get::<_, Option<i64>>(4)?.unwrap_or(0).max(0) as u64,
        flags: row.get(5)?,
        dns_query: row.get(6)?,
        src_info: enrichment_at(row, 7)?,
        dst_info: enrichment_at(row, 13)?,
        threat: row.get(19)?,
    }))
}
