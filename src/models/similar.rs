use serde::{Deserialize, Serialize};

/// A past issue returned by similarity search
///
/// `score` is a similarity: higher means closer to the query. Results keep the
/// order the index returned them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarIssue {
    pub id: f64,
    pub market: String,
    pub site: String,
    pub turbine: String,
    pub original: String,
    pub summary: String,
    pub score: f64,
}

impl SimilarIssue {
    /// Field names in the order the search manifest must list them
    pub const FIELD_NAMES: [&'static str; 7] = [
        "id", "market", "site", "turbine", "original", "summary", "score",
    ];

    /// Title line of the original markdown, without the heading marker
    pub fn title(&self) -> &str {
        crate::render::issue_title(&self.original)
    }

    /// Label/value pairs shown next to a result
    pub fn tags(&self) -> Vec<IssueTag> {
        vec![
            IssueTag::new("Issue ID", self.id.to_string()),
            IssueTag::new("Market", self.market.clone()),
            IssueTag::new("Site", self.site.clone()),
            IssueTag::new("Turbine", self.turbine.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTag {
    pub label: String,
    pub value: String,
}

impl IssueTag {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
        }
    }
}
