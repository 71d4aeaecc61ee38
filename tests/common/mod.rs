//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use eng_rec_helper::error::{AppError, Result};
use eng_rec_helper::llm::{ChatRequest, LlmClient};
use eng_rec_helper::models::RawIssue;
use parking_lot::Mutex;
use serde_json::json;

pub const RECOMMENDATION: &str = "Inspect the pitch motor cooling fan and check pitch bearing lubrication.";

pub fn raw_issue(id: f64, title: &str) -> RawIssue {
    RawIssue {
        id,
        market: "US".to_string(),
        site: "Windwhisper Park".to_string(),
        turbine: format!("T{}", id),
        title: title.to_string(),
        description: format!("{} reported by the site manager John Smith", title),
        closing_comment: "Component replaced by OEM technician".to_string(),
    }
}

pub fn sample_raw_issues() -> Vec<RawIssue> {
    vec![
        raw_issue(1.0, "Pitch motor overtemperature"),
        raw_issue(2.0, "Gearbox oil temperature high"),
        raw_issue(3.0, "Yaw misalignment after storm"),
    ]
}

/// OpenAI-style chat completion body whose first choice carries `content`
pub fn chat_completion_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

/// Issue fields as the JSON string a structured reply carries
pub fn fields_json(symptoms: &str, recommendation: &str, resolution: &str) -> String {
    json!({
        "symptoms": symptoms,
        "recommendation": recommendation,
        "resolution": resolution
    })
    .to_string()
}

/// Vector search body with the summary table columns plus score
pub fn search_body(rows: serde_json::Value) -> String {
    json!({
        "manifest": {
            "column_count": 7,
            "columns": [
                {"name": "Id"}, {"name": "Market"}, {"name": "Site"}, {"name": "Turbine"},
                {"name": "Original"}, {"name": "Summary"}, {"name": "score"}
            ]
        },
        "result": {"row_count": rows.as_array().map(|r| r.len()).unwrap_or(0), "data_array": rows}
    })
    .to_string()
}

pub fn pitch_motor_rows() -> serde_json::Value {
    json!([
        [9.0, "US", "Windwhisper Park", "T29", "# Pitch motor overtemperature alarms\n\n## Description\nalarms\n", "### Symptoms:\nThe pitch motor", 0.0028252013],
        [8.0, "Australia", "Galeforce Energy Center", "T13", "# Pitch motor overtemperature\n\n## Description\nhigh temps\n", "### Symptoms:\nHigh and frequent", 0.0027907745],
        [11.0, "US", "Sirocco Fields Energy", "T28", "# Pitch motor overtemperature\n\n## Description\novertemp\n", "### Symptoms:\nOvertemperature", 0.0027659389]
    ])
}

/// In-process model: structured requests echo the issue heading, plain
/// requests get a fixed recommendation. Prompts mentioning FAIL are refused.
#[derive(Default)]
pub struct ScriptedLlm {
    pub requests: Mutex<Vec<ChatRequest>>,
}

fn heading(prompt: &str) -> String {
    let mut lines = prompt.lines();
    while let Some(line) = lines.next() {
        if line == "## Symptoms" {
            return lines.next().unwrap_or_default().to_string();
        }
    }
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        let prompt = &request.messages[0].content;

        if request.response_format.is_none() {
            return Ok(RECOMMENDATION.to_string());
        }
        let subject = heading(prompt);
        if subject.contains("FAIL") {
            return Err(AppError::Generation("model refused".to_string()));
        }
        Ok(fields_json(&subject, &format!("Inspect {}", subject), "Replaced"))
    }
}
