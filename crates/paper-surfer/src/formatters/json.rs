//! JSON output formatting.

use serde::Serialize;
use serde_json::Value;

use crate::models::{Category, KeywordMatches, MetadataRecord, RunSummary, ScoredRecord};

/// On-disk JSON shape of one record: metadata fields at the top level plus
/// scoring fields.
#[derive(Serialize)]
struct RecordDocument<'a> {
    #[serde(flatten)]
    record: &'a MetadataRecord,
    source_url: String,
    score: f64,
    category: Category,
    matches: &'a KeywordMatches,
    found_via: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    synopsis: Option<&'a str>,
    collected_at: String,
}

/// Build the JSON document for one scored record.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn record_document(scored: &ScoredRecord) -> serde_json::Result<Value> {
    serde_json::to_value(RecordDocument {
        record: &scored.record,
        source_url: scored.record.source_url(),
        score: scored.score,
        category: scored.category,
        matches: &scored.matches,
        found_via: &scored.found_via,
        synopsis: scored.synopsis.as_deref(),
        collected_at: scored.collected_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    })
}

/// Pretty-printed JSON document for one scored record.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn format_record_json(scored: &ScoredRecord) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(&record_document(scored)?)?;
    text.push('\n');
    Ok(text)
}

/// Read the identifier out of a JSON record document.
#[must_use]
pub fn document_identifier(document: &str) -> Option<String> {
    let value: Value = serde_json::from_str(document).ok()?;
    value.get("identifier")?.as_str().map(str::to_string).filter(|id| !id.is_empty())
}

/// Pretty-printed JSON run summary.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn format_summary_json(summary: &RunSummary) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(summary)?;
    value["errored"] = Value::from(summary.errored());
    value["skipped"] = Value::from(summary.skipped());
    value["total_written"] = Value::from(summary.total_written());
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scored() -> ScoredRecord {
        ScoredRecord {
            record: MetadataRecord {
                title: Some("Somatic mutation atlas".into()),
                authors: vec!["Ada Lovelace".into()],
                ..MetadataRecord::new("42")
            },
            score: 0.8,
            category: Category::High,
            matches: [("somatic".to_string(), 1)].into_iter().collect(),
            found_via: vec!["somatic".into()],
            synopsis: None,
            collected_at: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_record_document_is_flat() {
        let doc = record_document(&scored()).unwrap();
        assert_eq!(doc["identifier"], "42");
        assert_eq!(doc["title"], "Somatic mutation atlas");
        assert_eq!(doc["category"], "high");
        assert_eq!(doc["matches"]["somatic"], 1);
        assert_eq!(doc["source_url"], "https://pubmed.ncbi.nlm.nih.gov/42/");
        assert_eq!(doc["collected_at"], "2026-01-02T03:04:05");
        assert!(doc.get("synopsis").is_none());
    }

    #[test]
    fn test_document_identifier() {
        let text = format_record_json(&scored()).unwrap();
        assert_eq!(document_identifier(&text).as_deref(), Some("42"));
        assert_eq!(document_identifier("not json"), None);
        assert_eq!(document_identifier("{\"identifier\": \"\"}"), None);
    }
}
