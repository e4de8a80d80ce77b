use super::schema::{ensure_schema, insert_record};
use super::writer_backend::{RecordWriter, StoreError};
use crate::capture_core::EnrichedRecord;
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite `packets` writer
///
/// Records are committed one at a time; ingestion only moves to the next
/// observation after the previous one is durable.
pub struct SqliteRecordWriter {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create database directory {}: {}", parent.display(), e),
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_optimized_pragmas(&conn)?;
        ensure_schema(&conn)?;

        log::info!("✅ SQLite packet store initialized with WAL mode");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl RecordWriter for SqliteRecordWriter {
    async fn append(&self, record: &EnrichedRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        insert_record(&conn, record)?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture_core::observation::parse_time;
    use crate::capture_core::EnrichmentInfo;
    use rusqlite::params;
    use tempfile::tempdir;

    fn create_test_record(src: &str, length: u64) -> EnrichedRecord {
        EnrichedRecord {
            time: parse_time("2025-06-01 14:03:22").unwrap(),
            src: Some(src.to_string()),
            dst: Some("192.168.1.5".to_string()),
            proto: "TCP".to_string(),
            length,
            flags: Some("0x0018".to_string()),
            dns_query: None,
            src_info: Some(EnrichmentInfo {
                country: "United States".to_string(),
                city: "Mountain View".to_string(),
                lat: 37.386,
                lon: -122.0838,
                asn: Some("AS15169".to_string()),
                org: Some("GOOGLE".to_string()),
            }),
            dst_info: Some(EnrichmentInfo::private()),
            threat: None,
        }
    }

    #[tokio::test]
    async fn test_append_writes_flat_row() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("packets.db");
        let writer = SqliteRecordWriter::new(&db_path).unwrap();

        writer.append(&create_test_record("8.8.8.8", 1500)).await.unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let (time, length, src_asn, dst_country, dst_org, threat): (
            String,
            i64,
            Option<String>,
            String,
            String,
            Option<String>,
        ) = conn
            .query_row(
                "SELECT time, length, src_asn, dst_country, dst_org, threat FROM packets WHERE src = ?1",
                params!["8.8.8.8"],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)),
            )
            .unwrap();

        assert_eq!(time, "2025-06-01 14:03:22");
        assert_eq!(length, 1500);
        assert_eq!(src_asn.as_deref(), Some("AS15169"));
        assert_eq!(dst_country, "Private");
        assert_eq!(dst_org, "Private Network");
        assert_eq!(threat, None);
    }

    #[tokio::test]
    async fn test_append_is_append_only() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("packets.db");
        let writer = SqliteRecordWriter::new(&db_path).unwrap();

        // Identical records are distinct observations; nothing is deduplicated
        let record = create_test_record("8.8.8.8", 100);
        for _ in 0..3 {
            writer.append(&record).await.unwrap();
        }

        let conn = Connection::open(&db_path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM packets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_missing_endpoint_stored_as_null() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("packets.db");
        let writer = SqliteRecordWriter::new(&db_path).unwrap();

        let mut record = create_test_record("8.8.8.8", 42);
        record.dst = None;
        record.dst_info = None;
        writer.append(&record).await.unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let (dst, dst_lat): (Option<String>, Option<f64>) = conn
            .query_row("SELECT dst, dst_lat FROM packets", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(dst, None);
        assert_eq!(dst_lat, None);
    }

    #[test]
    fn test_creates_parent_directory_and_index() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("store").join("packets.db");
        let _writer = SqliteRecordWriter::new(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let index_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_time'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 1);
    }
}
