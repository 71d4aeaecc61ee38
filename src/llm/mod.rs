//! Chat-completion access to the language model.
//!
//! [`LlmClient`] is the raw text-in/text-out seam; [`StructuredGenerator`]
//! sits on top of it and returns the three-field issue record.

mod client;
mod structured;

pub use client::OpenAiCompatibleClient;
pub use structured::{issue_response_format, parse_issue_fields, LlmStructuredGenerator};

use crate::error::Result;
use crate::models::IssueFields;
use crate::prompts::FieldSpecs;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// OpenAI-style `response_format` object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

impl ChatRequest {
    /// Single user-message request
    pub fn user(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: None,
            response_format: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_response_format(mut self, format: serde_json::Value) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// Text completion backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Return the content of the first choice
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Produces a structured issue record from a prompt
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, fields: &FieldSpecs) -> Result<IssueFields>;
}
