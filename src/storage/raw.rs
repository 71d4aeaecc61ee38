use crate::error::{AppError, Result};
use crate::models::RawIssue;
use std::path::Path;
use validator::Validate;

/// Parse a JSON array of raw issues exported from the ticketing system
pub fn parse_raw_issues(json: &str) -> Result<Vec<RawIssue>> {
    let issues: Vec<RawIssue> = serde_json::from_str(json)?;
    for (index, issue) in issues.iter().enumerate() {
        issue.validate().map_err(|e| {
            AppError::Validation(format!("raw issue #{} (id {}): {}", index, issue.id, e))
        })?;
    }
    Ok(issues)
}

/// Load raw issues from a JSON file
pub fn load_raw_issues(path: &Path) -> Result<Vec<RawIssue>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        AppError::Storage(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_raw_issues(&json)
}
