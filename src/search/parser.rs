use super::SearchResponse;
use crate::error::{AppError, Result};
use crate::metrics::SEARCH_SCHEMA_MISMATCHES_TOTAL;
use crate::models::SimilarIssue;
use serde_json::Value;

/// Check that the manifest lists exactly the [`SimilarIssue`] fields, in order
///
/// Names are compared case-insensitively; the index reports table columns
/// in their original casing.
pub fn validate_manifest(manifest: &[String]) -> Result<()> {
    let lowered: Vec<String> = manifest.iter().map(|name| name.to_lowercase()).collect();
    if lowered != SimilarIssue::FIELD_NAMES {
        return Err(AppError::SchemaMismatch(format!(
            "Mismatched columns: {:?} != {:?}",
            manifest,
            SimilarIssue::FIELD_NAMES
        )));
    }
    Ok(())
}

fn number(value: &Value, column: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        AppError::SchemaMismatch(format!(
            "column '{}' expected a number, got {}",
            column, value
        ))
    })
}

fn text(value: &Value, column: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(AppError::SchemaMismatch(format!(
            "column '{}' expected a string, got {}",
            column, other
        ))),
    }
}

/// Build one [`SimilarIssue`] from a result row
pub fn parse_row(row: &[Value], manifest: &[String]) -> Result<SimilarIssue> {
    validate_manifest(manifest)?;
    if row.len() != manifest.len() {
        return Err(AppError::SchemaMismatch(format!(
            "row has {} values, manifest lists {} columns",
            row.len(),
            manifest.len()
        )));
    }

    Ok(SimilarIssue {
        id: number(&row[0], &manifest[0])?,
        market: text(&row[1], &manifest[1])?,
        site: text(&row[2], &manifest[2])?,
        turbine: text(&row[3], &manifest[3])?,
        original: text(&row[4], &manifest[4])?,
        summary: text(&row[5], &manifest[5])?,
        score: number(&row[6], &manifest[6])?,
    })
}

/// Parse every row of a response, keeping the service's order
pub fn parse_response(response: &SearchResponse) -> Result<Vec<SimilarIssue>> {
    let parsed = validate_manifest(&response.columns).and_then(|_| {
        response
            .rows
            .iter()
            .map(|row| parse_row(row, &response.columns))
            .collect::<Result<Vec<_>>>()
    });

    if let Err(AppError::SchemaMismatch(_)) = &parsed {
        SEARCH_SCHEMA_MISMATCHES_TOTAL.inc();
    }
    parsed
}
