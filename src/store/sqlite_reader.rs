//! Read-only access to committed `packets` rows for the detection cycle

use super::schema::{record_from_row, PACKET_COLUMNS};
use super::writer_backend::StoreError;
use crate::capture_core::observation::format_time;
use crate::capture_core::EnrichedRecord;
use crate::sqlite_pragma::apply_optimized_pragmas;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Statement};
use std::path::Path;

pub struct SqliteRecordReader {
    conn: Connection,
}

impl SqliteRecordReader {
    /// Open an existing store; the writer owns schema creation
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;

        apply_optimized_pragmas(&conn)?;

        // Enable read-only mode to prevent write locks (must be after PRAGMAs)
        conn.execute("PRAGMA query_only = ON", [])?;

        log::info!("📥 SQLite reader initialized (query_only)");

        Ok(Self { conn })
    }

    /// Most recent `limit` records, returned oldest first
    ///
    /// Rows whose `time` is not a full date-time are skipped.
    pub fn read_window(&self, limit: usize) -> Result<Vec<EnrichedRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM packets ORDER BY rowid DESC LIMIT ?1",
            PACKET_COLUMNS
        ))?;

        let mut records = collect_records(&mut stmt, params![limit as i64])?;
        records.reverse();
        Ok(records)
    }

    /// Records with `from <= time < to`, in insertion order
    pub fn read_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<EnrichedRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM packets WHERE time >= ?1 AND time < ?2 ORDER BY rowid ASC",
            PACKET_COLUMNS
        ))?;

        collect_records(&mut stmt, params![format_time(&from), format_time(&to)])
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM packets", [], |row| row.get(0))?)
    }
}

fn collect_records(
    stmt: &mut Statement<'_>,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<EnrichedRecord>, StoreError> {
    let rows = stmt.query_map(params, record_from_row)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        match row? {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("Skipped {} rows with legacy or unparseable time", skipped);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture_core::observation::parse_time;
    use crate::capture_core::EnrichmentInfo;
    use crate::store::sqlite_writer::SqliteRecordWriter;
    use crate::store::writer_backend::RecordWriter;
    use tempfile::tempdir;

    fn record_at(time: &str, length: u64) -> EnrichedRecord {
        EnrichedRecord {
            time: parse_time(time).unwrap(),
            src: Some("8.8.8.8".to_string()),
            dst: Some("192.168.1.5".to_string()),
            proto: "UDP".to_string(),
            length,
            flags: None,
            dns_query: Some("example.com".to_string()),
            src_info: Some(EnrichmentInfo::unknown()),
            dst_info: Some(EnrichmentInfo::private()),
            threat: None,
        }
    }

    async fn seeded_store(records: &[EnrichedRecord]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("packets.db");
        let writer = SqliteRecordWriter::new(&db_path).unwrap();
        for record in records {
            writer.append(record).await.unwrap();
        }
        (dir, db_path)
    }

    #[tokio::test]
    async fn test_read_window_returns_newest_oldest_first() {
        let records: Vec<_> = (0..5)
            .map(|i| record_at(&format!("2025-06-01 14:00:0{}", i), 100 + i))
            .collect();
        let (_dir, db_path) = seeded_store(&records).await;

        let reader = SqliteRecordReader::new(&db_path).unwrap();
        let window = reader.read_window(3).unwrap();

        assert_eq!(window.len(), 3);
        assert_eq!(window[0].length, 102);
        assert_eq!(window[2].length, 104);
        assert_eq!(reader.count().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_record() {
        let original = record_at("2025-06-01 14:03:22", 512);
        let (_dir, db_path) = seeded_store(std::slice::from_ref(&original)).await;

        let reader = SqliteRecordReader::new(&db_path).unwrap();
        assert_eq!(reader.read_window(10).unwrap(), vec![original]);
    }

    #[tokio::test]
    async fn test_read_range_is_half_open() {
        let records = vec![
            record_at("2025-06-01 13:59:59", 1),
            record_at("2025-06-01 14:00:00", 2),
            record_at("2025-06-01 14:00:30", 3),
            record_at("2025-06-01 14:01:00", 4),
        ];
        let (_dir, db_path) = seeded_store(&records).await;

        let reader = SqliteRecordReader::new(&db_path).unwrap();
        let range = reader
            .read_range(
                parse_time("2025-06-01 14:00:00").unwrap(),
                parse_time("2025-06-01 14:01:00").unwrap(),
            )
            .unwrap();

        let lengths: Vec<u64> = range.iter().map(|r| r.length).collect();
        assert_eq!(lengths, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_legacy_time_rows_skipped() {
        let (_dir, db_path) = seeded_store(&[record_at("2025-06-01 14:00:00", 10)]).await;

        let conn = Connection::open(&db_path).unwrap();
        conn.execute("INSERT INTO packets (time, length) VALUES ('14:00:01', 99)", [])
            .unwrap();
        drop(conn);

        let reader = SqliteRecordReader::new(&db_path).unwrap();
        let window = reader.read_window(10).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].length, 10);
    }

    #[tokio::test]
    async fn test_read_only_mode() {
        let (_dir, db_path) = seeded_store(&[record_at("2025-06-01 14:00:00", 10)]).await;
        let reader = SqliteRecordReader::new(&db_path).unwrap();

        let result = reader
            .conn
            .execute("INSERT INTO packets (time, length) VALUES ('2025-06-01 14:00:00', 1)", []);
        assert!(result.is_err());
    }
}
