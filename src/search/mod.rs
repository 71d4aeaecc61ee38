//! Similarity search over the indexed summary table.
//!
//! [`VectorSearchClient`] returns the raw manifest and rows; [`parser`]
//! turns them into [`SimilarIssue`](crate::models::SimilarIssue) values.

mod client;
pub mod parser;

pub use client::{DatabricksVectorSearch, StaticVectorSearch};
pub use parser::{parse_response, parse_row, validate_manifest};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw search result: column names and one value array per hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Similarity search backend
#[async_trait]
pub trait VectorSearchClient: Send + Sync {
    /// Return up to `num_results` hits for `query_text`, best first
    ///
    /// The service appends a similarity score column after `columns`.
    async fn query(
        &self,
        query_text: &str,
        columns: &[&str],
        num_results: usize,
    ) -> Result<SearchResponse>;

    /// Backend name for logs and metrics
    fn name(&self) -> &'static str;
}
