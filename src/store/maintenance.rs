//! Offline store maintenance
//!
//! Not part of the live pipeline; run via the `geoflow_db` binary while
//! ingestion is stopped.

use super::schema::{CREATE_PACKETS_TABLE, CREATE_TIME_INDEX};
use super::writer_backend::StoreError;
use chrono::NaiveDate;
use rusqlite::{params, Connection};

/// Drop `packets` and recreate it with the current schema (destroys data)
pub fn reset_schema(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute("DROP TABLE IF EXISTS packets", [])?;
    tx.execute(CREATE_PACKETS_TABLE, [])?;
    tx.execute(CREATE_TIME_INDEX, [])?;
    tx.commit()?;

    log::info!("✅ packets schema migrated (old data removed)");
    Ok(())
}

/// Rewrite time-only values (`HH:MM:SS`) to `<day> HH:MM:SS`
///
/// Returns the number of rows rewritten. Also ensures the `time` index.
pub fn upgrade_legacy_timestamps(conn: &mut Connection, day: NaiveDate) -> Result<usize, StoreError> {
    let tx = conn.transaction()?;

    let legacy: Vec<(i64, String)> = {
        let mut stmt = tx.prepare(
            "SELECT rowid, time FROM packets WHERE length(time) = 8 AND instr(time, ':') > 0",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<_, _>>()?
    };

    let prefix = day.format("%Y-%m-%d").to_string();
    for (rowid, time) in &legacy {
        tx.execute(
            "UPDATE packets SET time = ?1 WHERE rowid = ?2",
            params![format!("{} {}", prefix, time), rowid],
        )?;
    }

    tx.execute(CREATE_TIME_INDEX, [])?;
    tx.commit()?;

    log::info!("✅ Upgraded {} rows to full datetime format", legacy.len());
    Ok(legacy.len())
}

/// One row of the `check` report
#[derive(Debug, Clone, PartialEq)]
pub struct RecentRow {
    pub time: Option<String>,
    pub src: Option<String>,
    pub dst: Option<String>,
    pub src_country: Option<String>,
    pub src_city: Option<String>,
    pub src_lat: Option<f64>,
    pub src_lon: Option<f64>,
    pub dst_country: Option<String>,
    pub dst_city: Option<String>,
    pub dst_lat: Option<f64>,
    pub dst_lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSummary {
    pub total_rows: i64,
    pub rows_with_coordinates: i64,
    pub recent: Vec<RecentRow>,
}

/// Health summary: coordinate coverage plus the newest `recent_limit` rows
pub fn summarize(conn: &Connection, recent_limit: usize) -> Result<StoreSummary, StoreError> {
    let total_rows: i64 = conn.query_row("SELECT COUNT(*) FROM packets", [], |row| row.get(0))?;
    let rows_with_coordinates: i64 = conn.query_row(
        "SELECT COUNT(*) FROM packets WHERE src_lat IS NOT NULL AND dst_lat IS NOT NULL",
        [],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT time, src, dst, src_country, src_city, src_lat, src_lon,
                dst_country, dst_city, dst_lat, dst_lon
         FROM packets
         ORDER BY rowid DESC
         LIMIT ?1",
    )?;
    let recent = stmt
        .query_map(params![recent_limit as i64], |row| {
            Ok(RecentRow {
                time: row.get(0)?,
                src: row.get(1)?,
                dst: row.get(2)?,
                src_country: row.get(3)?,
                src_city: row.get(4)?,
                src_lat: row.get(5)?,
                src_lon: row.get(6)?,
                dst_country: row.get(7)?,
                dst_city: row.get(8)?,
                dst_lat: row.get(9)?,
                dst_lon: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StoreSummary {
        total_rows,
        rows_with_coordinates,
        recent,
    })
}
