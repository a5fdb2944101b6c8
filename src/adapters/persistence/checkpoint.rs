//! Checkpoint File - Atomic JSON Cursor Persistence
//!
//! Saves the ingestion checkpoint to `checkpoint.json` using atomic
//! writes (write to tmp file, then rename), so a crash leaves either the
//! old or the new cursor on disk, never a partial one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument};

/// On-disk checkpoint document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Creation time of the last fully processed snapshot.
    pub checkpoint: DateTime<Utc>,
    /// Wall-clock time of the write.
    pub saved_at: DateTime<Utc>,
}

/// Atomic JSON checkpoint store.
pub struct CheckpointFile {
    /// Path to checkpoint.json.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl CheckpointFile {
    /// Create a checkpoint store in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            path: data_dir.join("checkpoint.json"),
            tmp_path: data_dir.join("checkpoint.json.tmp"),
        })
    }

    /// Persist a checkpoint atomically (tmp → rename).
    #[instrument(skip(self))]
    pub async fn save(&self, checkpoint: DateTime<Utc>) -> Result<()> {
        let record = CheckpointRecord {
            checkpoint,
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)
            .context("Failed to serialize checkpoint")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp checkpoint file")?;

        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename checkpoint file")?;

        debug!(path = %self.path.display(), "Checkpoint saved");
        Ok(())
    }

    /// Load the persisted checkpoint; `None` on first start.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<DateTime<Utc>>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            info!("No checkpoint file found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read checkpoint file")?;

        let record: CheckpointRecord =
            serde_json::from_str(&json).context("Failed to parse checkpoint JSON")?;

        info!(checkpoint = %record.checkpoint, "Checkpoint loaded");
        Ok(Some(record.checkpoint))
    }
}
