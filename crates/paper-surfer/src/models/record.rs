//! Metadata record for one retrieved PubMed article.

use serde::{Deserialize, Serialize};

use crate::config::api;

/// One retrieved document's metadata.
///
/// `identifier` is the PubMed id and the dedup key within a run. Every other
/// field is optional because the upstream record may omit it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// PubMed id (PMID).
    pub identifier: String,

    /// Article title.
    #[serde(default)]
    pub title: Option<String>,

    /// Abstract, labelled sections joined by spaces.
    #[serde(default)]
    pub r#abstract: Option<String>,

    /// Journal name.
    #[serde(default)]
    pub journal: Option<String>,

    /// Author names in publication order.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Publication date as `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
    #[serde(default)]
    pub publication_date: Option<String>,

    /// Digital Object Identifier.
    #[serde(default)]
    pub doi: Option<String>,

    /// PubMed Central id.
    #[serde(default)]
    pub pmc_id: Option<String>,

    /// Source URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Author-supplied keywords.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// MeSH descriptor names.
    #[serde(default)]
    pub mesh_terms: Vec<String>,

    /// Publication types (e.g. "Journal Article", "Review").
    #[serde(default)]
    pub publication_types: Vec<String>,

    /// Language code (e.g. "eng").
    #[serde(default)]
    pub language: Option<String>,

    /// Grant ids.
    #[serde(default)]
    pub grants: Vec<String>,
}

impl MetadataRecord {
    /// Create a record with only its identifier set.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), ..Default::default() }
    }

    /// A record is usable only when its identifier is present.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.identifier.trim().is_empty()
    }

    /// Get the title, falling back to "Untitled" if not available.
    #[must_use]
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("Untitled")
    }

    /// Get the abstract, or an empty string.
    #[must_use]
    pub fn abstract_text(&self) -> &str {
        self.r#abstract.as_deref().unwrap_or("")
    }

    /// Get the journal, or an empty string.
    #[must_use]
    pub fn journal_or_empty(&self) -> &str {
        self.journal.as_deref().unwrap_or("")
    }

    /// Get author names as a comma-separated string.
    #[must_use]
    pub fn author_names(&self) -> String {
        self.authors.join(", ")
    }

    /// Source URL, derived from the identifier when the record carries none.
    #[must_use]
    pub fn source_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("{}/{}/", api::PUBMED_RECORD_URL, self.identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_requires_identifier() {
        assert!(MetadataRecord::new("38000001").is_well_formed());
        assert!(!MetadataRecord::new("").is_well_formed());
        assert!(!MetadataRecord::new("  ").is_well_formed());
    }

    #[test]
    fn test_title_fallback() {
        let mut record = MetadataRecord::new("1");
        assert_eq!(record.title_or_default(), "Untitled");
        record.title = Some(String::new());
        assert_eq!(record.title_or_default(), "Untitled");
        record.title = Some("Clonal dynamics".to_string());
        assert_eq!(record.title_or_default(), "Clonal dynamics");
    }

    #[test]
    fn test_source_url_derived_from_pmid() {
        let record = MetadataRecord::new("12345");
        assert_eq!(record.source_url(), "https://pubmed.ncbi.nlm.nih.gov/12345/");

        let record =
            MetadataRecord { url: Some("https://example.org/p".into()), ..MetadataRecord::new("1") };
        assert_eq!(record.source_url(), "https://example.org/p");
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let json = serde_json::json!({"identifier": "77"});
        let record: MetadataRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.identifier, "77");
        assert!(record.authors.is_empty());
        assert!(record.title.is_none());
    }
}
