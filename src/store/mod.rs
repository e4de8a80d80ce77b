//! Persistence for enriched records (SQLite `packets` table)

pub mod maintenance;
pub mod schema;
pub mod sqlite_reader;
pub mod sqlite_writer;
pub mod writer_backend;

pub use sqlite_reader::SqliteRecordReader;
pub use sqlite_writer::SqliteRecordWriter;
pub use writer_backend::{RecordWriter, StoreError};
