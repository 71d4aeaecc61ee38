pub mod factory;
pub mod file_store;
pub mod raw;
pub mod store;

pub use factory::create_store;
pub use file_store::FileSummaryStore;
pub use raw::{load_raw_issues, parse_raw_issues};
pub use store::InMemorySummaryStore;

use crate::error::Result;
use crate::models::PipelineRecord;
use async_trait::async_trait;

/// Trait for the persisted summary table
///
/// Every pipeline run replaces the whole table.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Replace all rows with `records`
    async fn overwrite(&self, records: &[PipelineRecord]) -> Result<()>;

    /// All rows in write order
    async fn list(&self) -> Result<Vec<PipelineRecord>>;

    /// Number of rows
    async fn count(&self) -> Result<usize>;
}
