//! Builds the long-lived service components from configuration.
//!
//! HTTP clients are created once here and shared through `Arc`.

use crate::config::{Config, LlmConfig, VectorSearchConfig};
use crate::error::Result;
use crate::llm::{LlmClient, LlmStructuredGenerator, OpenAiCompatibleClient};
use crate::pipeline::PipelineRunner;
use crate::prompts::PromptSpec;
use crate::recommend::{RecommendationComposer, RetrievalRecommendationFlow};
use crate::retry::RetryPolicy;
use crate::search::{DatabricksVectorSearch, StaticVectorSearch, VectorSearchClient};
use crate::storage::{create_store, SummaryStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Everything the server and CLI need to do work
#[derive(Clone)]
pub struct Components {
    pub flow: Arc<RetrievalRecommendationFlow>,
    pub runner: Arc<PipelineRunner>,
    pub store: Arc<dyn SummaryStore>,
}

/// Read a credential from the environment variable named in config
pub fn read_secret(env_name: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            warn!(env = env_name, "Credential not set, calling without authorization");
            None
        }
    }
}

pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client = OpenAiCompatibleClient::new(
        &config.base_url,
        read_secret(&config.api_key_env),
        config.timeout_secs,
        RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.retry_backoff_ms),
        ),
    )?;
    Ok(Arc::new(client))
}

pub fn build_search_client(config: &VectorSearchConfig) -> Result<Arc<dyn VectorSearchClient>> {
    if config.mock {
        warn!("Using static sample results instead of the vector search index");
        return Ok(Arc::new(StaticVectorSearch::with_samples()));
    }

    let client = DatabricksVectorSearch::new(
        &config.base_url,
        &config.index_name,
        read_secret(&config.token_env),
        config.timeout_secs,
        RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.retry_backoff_ms),
        ),
    )?;
    Ok(Arc::new(client))
}

/// Pipeline runner using the instruct model and the configured prompts
pub fn build_pipeline_runner(
    config: &Config,
    client: Arc<dyn LlmClient>,
) -> Result<PipelineRunner> {
    let prompts = PromptSpec::load_or_default(config.prompts.path.as_deref())?;
    let generator = Arc::new(LlmStructuredGenerator::new(client, &config.llm.model));
    Ok(PipelineRunner::new(generator, &prompts, &config.pipeline))
}

pub fn build_recommendation_flow(
    config: &Config,
    client: Arc<dyn LlmClient>,
    search: Arc<dyn VectorSearchClient>,
) -> RetrievalRecommendationFlow {
    let composer = RecommendationComposer::new(client, config.llm.recommendation_model());
    RetrievalRecommendationFlow::new(search, composer, config.vector_search.num_results)
}

/// Validate configuration and build all components
pub fn build_components(config: &Config) -> Result<Components> {
    config.validate()?;

    let llm = build_llm_client(&config.llm)?;
    let search = build_search_client(&config.vector_search)?;
    let runner = build_pipeline_runner(config, llm.clone())?;
    let flow = build_recommendation_flow(config, llm, search);
    let store = create_store(&config.storage)?;

    info!(
        model = %config.llm.model,
        recommendation_model = %config.llm.recommendation_model(),
        search_backend = flow.search_backend(),
        "Components initialized"
    );

    Ok(Components {
        flow: Arc::new(flow),
        runner: Arc::new(runner),
        store,
    })
}
