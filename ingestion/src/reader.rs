use crate::{decode_line, open_input, IngestError};
use graph::{InteractionAggregator, RecordOutcome};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStats {
    pub lines_read: u64,
    pub accepted: u64,
    pub skipped: u64,
}

/// Streams the interaction log into `aggregator`, one record per line.
pub async fn read_interaction_log(
    path: impl AsRef<Path>,
    delimiter: char,
    aggregator: &mut InteractionAggregator,
) -> Result<LogStats, IngestError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(open_input(path).await?);
    let mut stats = LogStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        stats.lines_read += 1;

        let line = decode_line(&buf);
        let fields: Vec<&str> = line.split(delimiter).collect();
        match aggregator.accept(&fields) {
            RecordOutcome::Accepted => stats.accepted += 1,
            RecordOutcome::Skipped(reason) => {
                stats.skipped += 1;
                debug!("Skipping record at line {}: {:?}", stats.lines_read, reason);
            }
        }
    }

    info!(
        "Read {} records from {} ({} accepted, {} skipped)",
        stats.lines_read,
        path.display(),
        stats.accepted,
        stats.skipped
    );
    Ok(stats)
}
