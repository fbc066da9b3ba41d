//! Queue storage trait and the JSON file backend

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::QueueError;
use crate::job::WebhookJob;

/// Stable storage for the ordered job list.
///
/// `save` always receives the complete queue and overwrites whatever was stored before.
#[async_trait]
pub trait QueueStore: Send + Sync + Debug {
    /// Backend name, for logs
    fn name(&self) -> &str;

    /// Read the persisted job list. A store that was never written returns an empty list.
    async fn load(&self) -> Result<Vec<WebhookJob>, QueueError>;

    /// Replace the persisted job list
    async fn save(&self, jobs: &[WebhookJob]) -> Result<(), QueueError>;
}

/// Single JSON document holding the whole queue.
///
/// Writes go to a sibling temp file which is then renamed over the target, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "queue.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(path: &Path, source: std::io::Error) -> QueueError {
        QueueError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl QueueStore for JsonFileStore {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn load(&self) -> Result<Vec<WebhookJob>, QueueError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(&self.path, e)),
        };

        serde_json::from_slice(&data).map_err(|e| QueueError::Corrupt(e.to_string()))
    }

    async fn save(&self, jobs: &[WebhookJob]) -> Result<(), QueueError> {
        let json = serde_json::to_vec_pretty(jobs)?;
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(parent, e))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Self::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Self::io_error(&self.path, e))?;

        tracing::trace!(path = %self.path.display(), jobs = jobs.len(), "Queue persisted");
        Ok(())
    }
}
