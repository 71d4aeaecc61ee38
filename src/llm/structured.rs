use super::{ChatRequest, LlmClient, StructuredGenerator};
use crate::error::{AppError, Result};
use crate::models::IssueFields;
use crate::prompts::FieldSpecs;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// `response_format` asking for exactly the three issue fields
///
/// Field descriptions come from the stage prompt, so the model sees the
/// per-field instructions as schema documentation.
pub fn issue_response_format(fields: &FieldSpecs) -> Value {
    let mut properties = Map::new();
    for (name, description) in fields.entries() {
        properties.insert(
            name.to_string(),
            json!({ "type": "string", "description": description }),
        );
    }

    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "issue",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": properties,
                "required": ["symptoms", "recommendation", "resolution"],
                "additionalProperties": false
            }
        }
    })
}

/// JSON payload of a reply, taken from the first fenced block when there is one
///
/// Models often wrap the object in prose ("Here is the issue: ```json ... ```").
/// Without a fence the whole reply is used.
fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let body = &trimmed[open + 3..];
    let body = match body.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &body[4..],
        _ => body,
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Parse a model reply into issue fields
///
/// A reply that is not a JSON object with all three string fields is a
/// generation failure; it is never coerced.
pub fn parse_issue_fields(reply: &str) -> Result<IssueFields> {
    serde_json::from_str(extract_json_block(reply)).map_err(|e| {
        AppError::Generation(format!("Model reply does not match the issue schema: {}", e))
    })
}

/// [`StructuredGenerator`] backed by a chat-completion client
pub struct LlmStructuredGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmStructuredGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl StructuredGenerator for LlmStructuredGenerator {
    async fn generate(&self, prompt: &str, fields: &FieldSpecs) -> Result<IssueFields> {
        let request = ChatRequest::user(&self.model, prompt)
            .with_response_format(issue_response_format(fields));

        let reply = self.client.complete(&request).await.map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.to_string()),
        })?;

        parse_issue_fields(&reply)
    }
}
