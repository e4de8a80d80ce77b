use crate::capture_core::EnrichedRecord;
use async_trait::async_trait;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Database(String),
    Poisoned,
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Poisoned => write!(f, "Database connection lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Append-only sink for enriched records
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Persist one record; it is durable (committed) when this returns Ok
    async fn append(&self, record: &EnrichedRecord) -> Result<(), StoreError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
