use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use crate::models::{IssueTag, RawIssue, SimilarIssue};
use crate::pipeline::{build_records, FailurePolicy, ItemError};
use crate::recommend::RecommendationOutcome;
use axum::{extract::State, http::header, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

async fn within_deadline<T>(state: &AppState, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(state.request_timeout, fut)
        .await
        .map_err(|_| {
            AppError::Timeout(format!(
                "request exceeded {} seconds",
                state.request_timeout.as_secs()
            ))
        })?
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness: the summary table is reachable
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    let summary_rows = state.store.count().await?;
    Ok(Json(ReadinessResponse {
        status: "ready".to_string(),
        search_backend: state.flow.search_backend().to_string(),
        summary_rows,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub search_backend: String,
    pub summary_rows: usize,
}

/// Similar issue with the display fields shown next to it
#[derive(Debug, Serialize, Deserialize)]
pub struct SimilarIssueView {
    #[serde(flatten)]
    pub issue: SimilarIssue,
    pub title: String,
    pub tags: Vec<IssueTag>,
}

impl From<SimilarIssue> for SimilarIssueView {
    fn from(issue: SimilarIssue) -> Self {
        Self {
            title: issue.title().to_string(),
            tags: issue.tags(),
            issue,
        }
    }
}

/// Find past issues similar to a description
pub async fn search_similar(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponseBody>> {
    request.validate()?;

    let num_results = request.num_results.unwrap_or_else(|| state.flow.num_results());
    let issues =
        within_deadline(&state, state.flow.find_similar_n(&request.query, num_results)).await?;

    Ok(Json(SearchResponseBody {
        count: issues.len(),
        issues: issues.into_iter().map(SimilarIssueView::from).collect(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 10000))]
    pub query: String,
    #[validate(range(min = 1, max = 100))]
    pub num_results: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponseBody {
    pub count: usize,
    pub issues: Vec<SimilarIssueView>,
}

/// Recommend actions for a new issue from similar past issues
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>> {
    request.validate()?;

    let outcome = within_deadline(&state, state.flow.get_recommendation(&request.query)).await?;
    let response = match outcome {
        RecommendationOutcome::Generated(recommendation) => RecommendResponse {
            status: RecommendStatus::Generated,
            recommendation: Some(recommendation.text),
            similar_issues: recommendation
                .similar_issues
                .into_iter()
                .map(SimilarIssueView::from)
                .collect(),
        },
        RecommendationOutcome::NoSimilarIssues => RecommendResponse {
            status: RecommendStatus::NoSimilarIssues,
            recommendation: None,
            similar_issues: Vec::new(),
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecommendRequest {
    #[validate(length(min = 1, max = 10000))]
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendStatus {
    Generated,
    NoSimilarIssues,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub status: RecommendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub similar_issues: Vec<SimilarIssueView>,
}

/// Distill and censor a batch, replacing the summary table when every issue succeeds
pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(request): Json<PipelineRunRequest>,
) -> Result<Json<PipelineRunResponse>> {
    request.validate()?;
    for (index, issue) in request.issues.iter().enumerate() {
        issue
            .validate()
            .map_err(|e| AppError::Validation(format!("issues[{}]: {}", index, e)))?;
    }

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let policy = match request.fail_fast {
        Some(true) => FailurePolicy::FailFast,
        Some(false) => FailurePolicy::ContinueOnError,
        None => state.runner.policy(),
    };

    info!(run_id = %run_id, issues = request.issues.len(), "Pipeline run requested");
    let outcome = state.runner.run_batch_with(&request.issues, policy).await;

    let items: Vec<ItemReport> = outcome
        .results
        .iter()
        .zip(&request.issues)
        .enumerate()
        .map(|(index, (result, issue))| ItemReport::new(index, issue, result.as_ref().err()))
        .collect();
    let total = outcome.len();
    let succeeded = outcome.succeeded();

    let written = if outcome.is_complete() {
        let censored = outcome.into_censored()?;
        let records = build_records(&request.issues, &censored)?;
        state.store.overwrite(&records).await?;
        true
    } else {
        false
    };

    info!(run_id = %run_id, total, succeeded, written, "Pipeline run finished");

    Ok(Json(PipelineRunResponse {
        run_id,
        started_at,
        finished_at: Utc::now(),
        total,
        succeeded,
        failed: total - succeeded,
        written,
        items,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PipelineRunRequest {
    #[validate(length(min = 1, max = 10000))]
    pub issues: Vec<RawIssue>,
    pub fail_fast: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PipelineRunResponse {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Whether the summary table was replaced
    pub written: bool,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemReport {
    pub index: usize,
    pub id: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemReport {
    fn new(index: usize, issue: &RawIssue, error: Option<&ItemError>) -> Self {
        let (status, stage) = match error {
            None => ("succeeded", None),
            Some(ItemError::Stage { stage, .. }) => ("failed", Some(stage.to_string())),
            Some(ItemError::TimedOut { .. }) => ("timed_out", None),
            Some(ItemError::Skipped { .. }) => ("skipped", None),
        };
        Self {
            index,
            id: issue.id,
            status: status.to_string(),
            stage,
            error: error.map(|e| e.to_string()),
        }
    }
}

/// Current contents of the summary table
pub async fn list_summaries(State(state): State<AppState>) -> Result<Json<SummariesResponse>> {
    let records = state.store.list().await?;
    Ok(Json(SummariesResponse {
        count: records.len(),
        records,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummariesResponse {
    pub count: usize,
    pub records: Vec<crate::models::PipelineRecord>,
}

/// Prometheus exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
