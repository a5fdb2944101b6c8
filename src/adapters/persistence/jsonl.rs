//! Append-only JSONL helpers shared by the order and refund logs.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Append one record as a JSON line and flush.
pub(crate) async fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut json = serde_json::to_string(record).context("Failed to serialize record")?;
    json.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    file.write_all(json.as_bytes())
        .await
        .context("Failed to write record")?;
    file.flush().await.context("Failed to flush log")?;

    Ok(())
}

/// Read every well-formed record; malformed lines are skipped.
pub(crate) async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut records = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                // A torn final line after a crash lands here.
                warn!(file = %path.display(), error = %e, "Skipping malformed record");
            }
        }
    }

    Ok(records)
}
