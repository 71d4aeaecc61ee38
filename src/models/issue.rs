use crate::error::{AppError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::Deref;
use validator::Validate;

/// A closed engineering issue as exported from the ticketing system
///
/// Field names follow the export's column headers; snake_case aliases are
/// accepted so API clients can post idiomatic JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RawIssue {
    /// Ticket identifier
    #[serde(rename = "Id", alias = "id")]
    pub id: f64,

    /// Market the site belongs to
    #[serde(rename = "Market", alias = "market", default, deserialize_with = "null_as_empty")]
    pub market: String,

    /// Site name
    #[serde(rename = "Site", alias = "site", default, deserialize_with = "null_as_empty")]
    pub site: String,

    /// Turbine identifier(s)
    #[serde(rename = "Turbine", alias = "turbine", default, deserialize_with = "null_as_empty")]
    pub turbine: String,

    /// Ticket title
    #[validate(length(min = 1))]
    #[serde(rename = "Issue Title", alias = "title")]
    pub title: String,

    /// Opening description written by the engineer
    #[serde(rename = "Description", alias = "description", default, deserialize_with = "null_as_empty")]
    pub description: String,

    /// Comment recorded when the ticket was closed
    #[serde(rename = "Closing Comment", alias = "closing_comment", default, deserialize_with = "null_as_empty")]
    pub closing_comment: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The three structured fields every distilled or censored issue carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    pub symptoms: String,
    pub recommendation: String,
    pub resolution: String,
}

impl IssueFields {
    pub fn new(
        symptoms: impl Into<String>,
        recommendation: impl Into<String>,
        resolution: impl Into<String>,
    ) -> Self {
        Self {
            symptoms: symptoms.into(),
            recommendation: recommendation.into(),
            resolution: resolution.into(),
        }
    }

    /// Symptoms and recommendation must be present; resolution may be empty
    /// when the ticket never recorded one.
    pub fn validate_required(&self) -> Result<()> {
        if self.symptoms.trim().is_empty() {
            return Err(AppError::Validation("symptoms must not be empty".to_string()));
        }
        if self.recommendation.trim().is_empty() {
            return Err(AppError::Validation(
                "recommendation must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Field names paired with values, in the canonical order
    pub fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("symptoms", self.symptoms.as_str()),
            ("recommendation", self.recommendation.as_str()),
            ("resolution", self.resolution.as_str()),
        ]
    }
}

/// Output of the distill stage for exactly one raw issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistilledIssue(pub IssueFields);

impl Deref for DistilledIssue {
    type Target = IssueFields;

    fn deref(&self) -> &IssueFields {
        &self.0
    }
}

/// Anonymized output of the censor stage for exactly one distilled issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CensorIssue(pub IssueFields);

impl Deref for CensorIssue {
    type Target = IssueFields;

    fn deref(&self) -> &IssueFields {
        &self.0
    }
}

/// One row of the persisted summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    #[serde(rename = "Id")]
    pub id: f64,

    #[serde(rename = "Market")]
    pub market: String,

    #[serde(rename = "Site")]
    pub site: String,

    #[serde(rename = "Turbine")]
    pub turbine: String,

    /// Unredacted markdown of the raw issue
    #[serde(rename = "Original")]
    pub original: String,

    /// Redacted summary, the text that gets embedded and indexed
    #[serde(rename = "Summary")]
    pub summary: String,
}

impl PipelineRecord {
    /// Table column names, also the columns requested from the search index
    pub const COLUMNS: [&'static str; 6] = ["Id", "Market", "Site", "Turbine", "Original", "Summary"];
}
