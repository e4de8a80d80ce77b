//! JSONL observation source
//!
//! Adapter between an external sniffer (or a replay file) and the ingestion
//! channel. One JSON object per line; malformed lines are skipped.

use super::observation::PacketObservation;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
    ChannelClosed,
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err)
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "IO error: {}", e),
            SourceError::ChannelClosed => write!(f, "ingestion channel closed"),
        }
    }
}

impl std::error::Error for SourceError {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceStats {
    pub forwarded: u64,
    pub skipped: u64,
}

/// Forward observations until EOF
///
/// Observations without a timestamp are stamped with local capture time.
pub async fn stream_observations<R>(
    reader: R,
    tx: mpsc::Sender<PacketObservation>,
) -> Result<SourceStats, SourceError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = SourceStats::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut observation = match PacketObservation::from_jsonl(line) {
            Ok(obs) => obs,
            Err(e) => {
                log::warn!("Packet parse error: {} ({})", e, line);
                stats.skipped += 1;
                continue;
            }
        };

        if observation.timestamp.is_none() {
            observation.timestamp = Some(chrono::Local::now().naive_local());
        }

        tx.send(observation)
            .await
            .map_err(|_| SourceError::ChannelClosed)?;
        stats.forwarded += 1;
    }

    log::info!(
        "📭 Observation source exhausted: {} forwarded, {} skipped",
        stats.forwarded,
        stats.skipped
    );

    Ok(stats)
}
