use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use harvest_common::CommentRecord;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::traits::CommentSink;

/// JSON Lines file, opened in append mode for every record.
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CommentSink for JsonlSink {
    async fn append(&self, record: &CommentRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize comment record")?;
        line.push('\n');

        // One write per record so concurrent appenders never interleave lines.
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open comment log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }
}
