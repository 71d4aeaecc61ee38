//! Retrieval-augmented recommendations for a newly reported issue.

mod composer;
mod flow;

pub use composer::RecommendationComposer;
pub use flow::{Recommendation, RecommendationOutcome, RetrievalRecommendationFlow};
