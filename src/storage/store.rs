use super::SummaryStore;
use crate::error::Result;
use crate::metrics::SUMMARY_ROWS;
use crate::models::PipelineRecord;
use async_trait::async_trait;
use parking_lot::RwLock;

/// In-memory summary table, lost on restart
#[derive(Default)]
pub struct InMemorySummaryStore {
    records: RwLock<Vec<PipelineRecord>>,
}

impl InMemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn overwrite(&self, records: &[PipelineRecord]) -> Result<()> {
        *self.records.write() = records.to_vec();
        SUMMARY_ROWS.set(records.len() as f64);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PipelineRecord>> {
        Ok(self.records.read().clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: f64) -> PipelineRecord {
        PipelineRecord {
            id,
            market: "US".to_string(),
            site: "Site".to_string(),
            turbine: "T1".to_string(),
            original: "# t\n".to_string(),
            summary: "### Symptoms:\ns".to_string(),
        }
    }

    #[tokio::test]
    async fn test_overwrite_replaces_rows() {
        let store = InMemorySummaryStore::new();
        store.overwrite(&[record(1.0), record(2.0)]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        store.overwrite(&[record(3.0)]).await.unwrap();
        let rows = store.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 3.0);
    }
}
