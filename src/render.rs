//! Markdown rendering for issues handed to the model and stored in the summary table.
//!
//! Every function here is pure: identical input yields byte-identical output.

use crate::models::{IssueFields, RawIssue};

/// Render a raw ticket as the markdown block the distill stage reads
pub fn render_raw(issue: &RawIssue) -> String {
    format!(
        "# {}\n\n## Description\n{}\n\n## Closing Comment\n{}\n",
        issue.title, issue.description, issue.closing_comment
    )
}

/// Render a distilled or censored issue as the markdown block the next stage reads
pub fn render_structured(issue: &IssueFields) -> String {
    format!(
        "# Issue\n## Symptoms\n{}\n\n## Recommendation\n{}\n\n## Resolution\n{}\n",
        issue.symptoms, issue.recommendation, issue.resolution
    )
}

/// Render the stored/indexed summary text of a censored issue
pub fn render_summary(issue: &IssueFields) -> String {
    issue
        .entries()
        .iter()
        .map(|(name, value)| format!("### {}:\n{}", title_case(name), value))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First line of an original markdown block, without the leading `#`
pub fn issue_title(original: &str) -> &str {
    original
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| c == '#' || c == ' ')
        .trim_end()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, description: &str, closing_comment: &str) -> RawIssue {
        RawIssue {
            id: 1.0,
            market: String::new(),
            site: String::new(),
            turbine: String::new(),
            title: title.to_string(),
            description: description.to_string(),
            closing_comment: closing_comment.to_string(),
        }
    }

    #[test]
    fn test_render_raw_golden() {
        let issue = raw("title", "description", "closing_comment");
        assert_eq!(
            render_raw(&issue),
            "# title\n\n## Description\ndescription\n\n## Closing Comment\nclosing_comment\n"
        );
    }

    #[test]
    fn test_render_structured_golden() {
        let fields = IssueFields::new("s", "r", "res");
        assert_eq!(
            render_structured(&fields),
            "# Issue\n## Symptoms\ns\n\n## Recommendation\nr\n\n## Resolution\nres\n"
        );
    }

    #[test]
    fn test_render_structured_sample_fields() {
        let fields = IssueFields::new(
            "sample_symptoms",
            "sample_recommendation",
            "sample_resolution",
        );
        let expected = "# Issue\n## Symptoms\nsample_symptoms\n\n\
                        ## Recommendation\nsample_recommendation\n\n\
                        ## Resolution\nsample_resolution\n";
        assert_eq!(render_structured(&fields), expected);
    }

    #[test]
    fn test_render_summary_golden() {
        let fields = IssueFields::new("s", "r", "");
        assert_eq!(
            render_summary(&fields),
            "### Symptoms:\ns\n\n### Recommendation:\nr\n\n### Resolution:\n"
        );
    }

    #[test]
    fn test_renderers_are_deterministic() {
        let issue = raw("Gearbox noise", "Loud gearbox", "Bearing replaced");
        let fields = IssueFields::new("noise", "inspect", "replaced");
        assert_eq!(render_raw(&issue), render_raw(&issue));
        assert_eq!(render_structured(&fields), render_structured(&fields));
        assert_eq!(render_summary(&fields), render_summary(&fields));
    }

    #[test]
    fn test_issue_title() {
        assert_eq!(issue_title("# Pitch motor overtemperature\n\nbody"), "Pitch motor overtemperature");
        assert_eq!(issue_title("no heading"), "no heading");
        assert_eq!(issue_title(""), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("symptoms"), "Symptoms");
        assert_eq!(title_case("RESOLUTION"), "Resolution");
        assert_eq!(title_case(""), "");
    }
}
