use super::SummaryStore;
use crate::error::{AppError, Result};
use crate::metrics::SUMMARY_ROWS;
use crate::models::PipelineRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

/// Summary table stored as a JSON array on disk
///
/// Writes go to a sibling temp file that is then renamed over the table, so
/// readers never see a half-written file.
pub struct FileSummaryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSummaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SummaryStore for FileSummaryStore {
    async fn overwrite(&self, records: &[PipelineRecord]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let body = serde_json::to_vec_pretty(records)?;
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        SUMMARY_ROWS.set(records.len() as f64);
        info!(path = %self.path.display(), rows = records.len(), "Summary table written");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PipelineRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}
