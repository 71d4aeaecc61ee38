use super::composer::RecommendationComposer;
use crate::error::{AppError, Result};
use crate::metrics::RECOMMENDATIONS_TOTAL;
use crate::models::{PipelineRecord, SimilarIssue};
use crate::search::{parse_response, VectorSearchClient};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Generated recommendation and the issues it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub text: String,
    pub similar_issues: Vec<SimilarIssue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationOutcome {
    Generated(Recommendation),
    /// Search returned nothing; the model was not called
    NoSimilarIssues,
}

/// Search for similar past issues, then recommend from them
pub struct RetrievalRecommendationFlow {
    search: Arc<dyn VectorSearchClient>,
    composer: RecommendationComposer,
    num_results: usize,
}

impl RetrievalRecommendationFlow {
    pub fn new(
        search: Arc<dyn VectorSearchClient>,
        composer: RecommendationComposer,
        num_results: usize,
    ) -> Self {
        Self {
            search,
            composer,
            num_results,
        }
    }

    pub fn num_results(&self) -> usize {
        self.num_results
    }

    pub fn search_backend(&self) -> &'static str {
        self.search.name()
    }

    /// Similar issues for `query` using the configured result count
    pub async fn find_similar(&self, query: &str) -> Result<Vec<SimilarIssue>> {
        self.find_similar_n(query, self.num_results).await
    }

    #[instrument(skip(self), fields(backend = self.search.name()))]
    pub async fn find_similar_n(&self, query: &str, num_results: usize) -> Result<Vec<SimilarIssue>> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("query must not be empty".to_string()));
        }

        let response = self
            .search
            .query(query, &PipelineRecord::COLUMNS, num_results)
            .await
            .map_err(|e| match e {
                AppError::Retrieval(_) | AppError::SchemaMismatch(_) => e,
                other => AppError::Retrieval(other.to_string()),
            })?;

        parse_response(&response)
    }

    /// Retrieve similar issues and generate a recommendation from them
    pub async fn get_recommendation(&self, query: &str) -> Result<RecommendationOutcome> {
        let result = self.recommend(query).await;

        let label = match &result {
            Ok(RecommendationOutcome::Generated(_)) => "generated",
            Ok(RecommendationOutcome::NoSimilarIssues) => "no_similar_issues",
            Err(_) => "error",
        };
        RECOMMENDATIONS_TOTAL.with_label_values(&[label]).inc();

        result
    }

    async fn recommend(&self, query: &str) -> Result<RecommendationOutcome> {
        let similar_issues = self.find_similar(query).await?;
        if similar_issues.is_empty() {
            warn!("No similar issues found, skipping generation");
            return Ok(RecommendationOutcome::NoSimilarIssues);
        }

        let prompt = RecommendationComposer::compose_prompt(query, &similar_issues);
        let text = self.composer.generate(&prompt).await?;

        info!(
            similar_issues = similar_issues.len(),
            recommendation_length = text.len(),
            "Recommendation generated"
        );

        Ok(RecommendationOutcome::Generated(Recommendation {
            text,
            similar_issues,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRequest, LlmClient};
    use crate::search::{SearchResponse, StaticVectorSearch};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingClient {
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl LlmClient for CountingClient {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.requests.lock().push(request.clone());
            Ok(" Inspect the pitch motor cooling fan. ".to_string())
        }
    }

    struct FailingSearch(AppError);

    #[async_trait]
    impl VectorSearchClient for FailingSearch {
        async fn query(&self, _: &str, _: &[&str], _: usize) -> Result<SearchResponse> {
            Err(match &self.0 {
                AppError::SchemaMismatch(m) => AppError::SchemaMismatch(m.clone()),
                _ => AppError::Network("connection reset".to_string()),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn flow(search: Arc<dyn VectorSearchClient>, client: Arc<CountingClient>) -> RetrievalRecommendationFlow {
        RetrievalRecommendationFlow::new(search, RecommendationComposer::new(client, "instruct"), 5)
    }

    #[tokio::test]
    async fn test_pitch_motor_scenario() {
        let client = Arc::new(CountingClient::default());
        let flow = flow(Arc::new(StaticVectorSearch::with_samples()), client.clone());

        let outcome = flow
            .get_recommendation("Pitch motor overtemperature")
            .await
            .unwrap();

        let recommendation = match outcome {
            RecommendationOutcome::Generated(r) => r,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(recommendation.text, "Inspect the pitch motor cooling fan.");
        let ids: Vec<f64> = recommendation.similar_issues.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![9.0, 8.0, 11.0]);

        let requests = client.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.0));
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("# Current Issue Symptoms:\nPitch motor overtemperature\n"));
        let positions: Vec<usize> = (1..=3)
            .map(|n| prompt.find(&format!("## Issue {}:", n)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_no_similar_issues_skips_generation() {
        let empty = StaticVectorSearch::new(SearchResponse {
            columns: SimilarIssue::FIELD_NAMES.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        });
        let client = Arc::new(CountingClient::default());
        let flow = flow(Arc::new(empty), client.clone());

        let outcome = flow.get_recommendation("yaw misalignment").await.unwrap();

        assert_eq!(outcome, RecommendationOutcome::NoSimilarIssues);
        assert!(client.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_retrieval_error() {
        let client = Arc::new(CountingClient::default());
        let flow = flow(
            Arc::new(FailingSearch(AppError::Network(String::new()))),
            client.clone(),
        );

        let err = flow.get_recommendation("anything").await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
        assert!(client.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_kept() {
        let flow = flow(
            Arc::new(FailingSearch(AppError::SchemaMismatch("cols".to_string()))),
            Arc::new(CountingClient::default()),
        );
        let err = flow.find_similar("anything").await.unwrap_err();
        assert!(matches!(err, AppError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let flow = flow(
            Arc::new(StaticVectorSearch::with_samples()),
            Arc::new(CountingClient::default()),
        );
        assert!(matches!(
            flow.find_similar("   ").await,
            Err(AppError::Validation(_))
        ));
    }
}
