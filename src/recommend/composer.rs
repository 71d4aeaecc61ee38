use crate::error::{AppError, Result};
use crate::llm::{ChatRequest, LlmClient};
use crate::metrics::observe_llm_stage;
use crate::models::SimilarIssue;
use std::sync::Arc;
use std::time::Instant;

const PERSONA: &str = "You are an expert turbine performance engineer.
You are given a current issue symptoms and previous issues with their symptoms, recommendations and resolutions as information.
Generate a reasonable recommendation on what to do to resolve the current issue in a very succinct way (max. 50 words).
Use only the provided previous issues to recommend actions.";

/// Builds the retrieval-augmented prompt and asks the model for a recommendation
pub struct RecommendationComposer {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl RecommendationComposer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Prompt embedding the current symptoms and each similar issue's original text
    ///
    /// Issues are numbered from 1 in the order given.
    pub fn compose_prompt(symptoms: &str, similar_issues: &[SimilarIssue]) -> String {
        let previous_issues = similar_issues
            .iter()
            .enumerate()
            .map(|(i, issue)| format!("## Issue {}:\n{}", i + 1, issue.original))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "{}\n\n# Current Issue Symptoms:\n{}\n\n# Previous Issues:\n{}\n",
            PERSONA, symptoms, previous_issues
        )
    }

    /// One unstructured call at temperature 0.0
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest::user(&self.model, prompt).with_temperature(0.0);
        let start = Instant::now();
        let reply = self.client.complete(&request).await;
        observe_llm_stage("recommendation", start.elapsed(), reply.is_ok());

        let text = reply.map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.to_string()),
        })?;
        Ok(text.trim().to_string())
    }
}
