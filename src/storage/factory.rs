use super::{FileSummaryStore, InMemorySummaryStore, SummaryStore};
use crate::config::{StorageBackend, StorageConfig};
use crate::error::{AppError, Result};
use std::sync::Arc;

/// Create a summary store based on configuration
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn SummaryStore>> {
    match config.backend {
        StorageBackend::InMemory => {
            tracing::info!("Initializing in-memory summary table");
            Ok(Arc::new(InMemorySummaryStore::new()))
        }

        StorageBackend::File => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("File backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing file summary table");
            Ok(Arc::new(FileSummaryStore::new(path)?))
        }
    }
}
