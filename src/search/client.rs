use super::{SearchResponse, VectorSearchClient};
use crate::error::{AppError, Result};
use crate::metrics::{SEARCH_REQUESTS_TOTAL, SEARCH_REQUEST_DURATION_SECONDS};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Databricks Vector Search index queried over REST
#[derive(Clone)]
pub struct DatabricksVectorSearch {
    client: Client,
    base_url: String,
    index_name: String,
    token: Option<String>,
    timeout_secs: u64,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_text: &'a str,
    columns: &'a [&'a str],
    num_results: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    manifest: Manifest,
    #[serde(default)]
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    columns: Vec<ManifestColumn>,
}

#[derive(Debug, Deserialize)]
struct ManifestColumn {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResult {
    #[serde(default)]
    data_array: Vec<Vec<serde_json::Value>>,
}

impl From<QueryResponse> for SearchResponse {
    fn from(response: QueryResponse) -> Self {
        Self {
            columns: response.manifest.columns.into_iter().map(|c| c.name).collect(),
            rows: response.result.data_array,
        }
    }
}

impl DatabricksVectorSearch {
    pub fn new(
        base_url: impl Into<String>,
        index_name: impl Into<String>,
        token: Option<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            token,
            timeout_secs,
            retry,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/2.0/vector-search/indexes/{}/query",
            self.base_url, self.index_name
        )
    }

    async fn query_once(&self, body: &QueryRequest<'_>) -> Result<SearchResponse> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.trim());
        }

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(format!(
                    "Vector search timed out after {} seconds",
                    self.timeout_secs
                ))
            } else {
                AppError::Network(format!("Vector search request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimit);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("Vector search returned {}: {}", status, body);
            return Err(if status.is_server_error() {
                AppError::Network(message)
            } else {
                AppError::Retrieval(message)
            });
        }

        let parsed: QueryResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Failed to parse vector search response: {}", e))
        })?;
        Ok(parsed.into())
    }
}

#[async_trait]
impl VectorSearchClient for DatabricksVectorSearch {
    async fn query(
        &self,
        query_text: &str,
        columns: &[&str],
        num_results: usize,
    ) -> Result<SearchResponse> {
        let body = QueryRequest {
            query_text,
            columns,
            num_results,
        };
        let start = Instant::now();
        let result = self
            .retry
            .run("vector_search", || self.query_once(&body))
            .await;

        SEARCH_REQUEST_DURATION_SECONDS
            .with_label_values(&[self.name()])
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(response) => {
                SEARCH_REQUESTS_TOTAL.with_label_values(&["success"]).inc();
                debug!(
                    index = %self.index_name,
                    hits = response.rows.len(),
                    "Vector search completed"
                );
            }
            Err(e) => {
                SEARCH_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                error!(index = %self.index_name, error = %e, "Vector search failed");
            }
        }

        result
    }

    fn name(&self) -> &'static str {
        "databricks"
    }
}

/// Searcher serving built-in sample hits, for running without an index
#[derive(Debug, Clone)]
pub struct StaticVectorSearch {
    response: SearchResponse,
}

impl StaticVectorSearch {
    pub fn new(response: SearchResponse) -> Self {
        Self { response }
    }

    /// Three pitch motor overtemperature issues
    pub fn with_samples() -> Self {
        let columns = ["id", "market", "site", "turbine", "original", "summary", "score"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = vec![
            vec![
                json!(9.0),
                json!("US"),
                json!("Windwhisper Park"),
                json!("T29"),
                json!("# Pitch motor overtemperature alarms\n\n## Description\nRepeated pitch motor overtemperature alarms on blade B.\n\n## Closing Comment\nCooling fan replaced.\n"),
                json!("### Symptoms:\nThe pitch motor on TURBINE/S reported overtemperature alarms.\n\n### Recommendation:\nInspect the pitch motor cooling fan.\n\n### Resolution:\nThe cooling fan was replaced."),
                json!(0.0028252013),
            ],
            vec![
                json!(8.0),
                json!("Australia"),
                json!("Galeforce Energy Center"),
                json!("T13"),
                json!("# Pitch motor overtemperature\n\n## Description\nHigh and frequent pitch motor temperatures during high wind.\n\n## Closing Comment\nPitch bearing greased.\n"),
                json!("### Symptoms:\nHigh and frequent pitch motor temperatures during high wind.\n\n### Recommendation:\nCheck pitch bearing lubrication.\n\n### Resolution:\nThe pitch bearing was greased."),
                json!(0.0027907745),
            ],
            vec![
                json!(11.0),
                json!("US"),
                json!("Sirocco Fields Energy"),
                json!("T28"),
                json!("# Pitch motor overtemperature\n\n## Description\nOvertemperature on the pitch motor after converter update.\n\n## Closing Comment\nParameters reverted.\n"),
                json!("### Symptoms:\nOvertemperature on the pitch motor after a converter update.\n\n### Recommendation:\nReview the pitch converter parameters.\n\n### Resolution:\nThe parameters were reverted."),
                json!(0.0027659389),
            ],
        ];
        Self::new(SearchResponse { columns, rows })
    }
}

#[async_trait]
impl VectorSearchClient for StaticVectorSearch {
    async fn query(
        &self,
        _query_text: &str,
        _columns: &[&str],
        num_results: usize,
    ) -> Result<SearchResponse> {
        SEARCH_REQUESTS_TOTAL.with_label_values(&["success"]).inc();
        Ok(SearchResponse {
            columns: self.response.columns.clone(),
            rows: self.response.rows.iter().take(num_results).cloned().collect(),
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
