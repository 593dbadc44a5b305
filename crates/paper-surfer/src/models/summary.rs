//! Run summary: aggregate counts for one collection run.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Category;

/// Per-category counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// High relevance.
    pub high: usize,
    /// Medium relevance.
    pub medium: usize,
    /// Low relevance.
    pub low: usize,
}

impl CategoryCounts {
    /// Increment the counter for `category`.
    pub fn increment(&mut self, category: Category) {
        match category {
            Category::High => self.high += 1,
            Category::Medium => self.medium += 1,
            Category::Low => self.low += 1,
        }
    }

    /// Read the counter for `category`.
    #[must_use]
    pub const fn get(&self, category: Category) -> usize {
        match category {
            Category::High => self.high,
            Category::Medium => self.medium,
            Category::Low => self.low,
        }
    }

    /// Sum over all categories.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Stage at which a record failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Upstream fetch failed or the record was not found.
    Fetch,
    /// The record lacked its identifier.
    Validate,
    /// The document could not be written.
    Write,
}

/// One record that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Identifier as requested (may be empty for malformed records).
    pub identifier: String,
    /// Where it failed.
    pub stage: FailureStage,
    /// Error message.
    pub message: String,
}

/// Aggregate outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Date partition the run wrote into.
    pub run_date: NaiveDate,
    /// When the run started.
    pub started_at: NaiveDateTime,
    /// When the run finished (set once at the end).
    #[serde(default)]
    pub finished_at: Option<NaiveDateTime>,
    /// Keywords searched, in order.
    pub keywords: Vec<String>,
    /// Keywords whose search failed and were skipped.
    #[serde(default)]
    pub failed_keywords: Vec<String>,
    /// Unique identifiers found across all keywords.
    pub candidates: usize,
    /// Records fetched successfully.
    pub fetched: usize,
    /// Records rejected by the required-keyword gate.
    pub filtered: usize,
    /// Records outside the publication date window.
    pub out_of_window: usize,
    /// Records whose abstract was below the minimum length.
    pub too_short: usize,
    /// Records that passed the gate but scored below `min_score`.
    #[serde(default)]
    pub below_min_score: usize,
    /// Records that passed every filter and were scored.
    pub scored: usize,
    /// Scored records per category.
    pub categories: CategoryCounts,
    /// Documents written per category.
    pub written: CategoryCounts,
    /// Records that failed at fetch, validation or write.
    #[serde(default)]
    pub failures: Vec<RecordFailure>,
    /// Where the summary document was written, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_path: Option<PathBuf>,
}

impl RunSummary {
    /// Start a new summary.
    #[must_use]
    pub fn new(run_date: NaiveDate, started_at: NaiveDateTime, keywords: Vec<String>) -> Self {
        Self {
            run_date,
            started_at,
            finished_at: None,
            keywords,
            failed_keywords: Vec::new(),
            candidates: 0,
            fetched: 0,
            filtered: 0,
            out_of_window: 0,
            too_short: 0,
            below_min_score: 0,
            scored: 0,
            categories: CategoryCounts::default(),
            written: CategoryCounts::default(),
            failures: Vec::new(),
            summary_path: None,
        }
    }

    /// Record a failed record.
    pub fn record_failure(
        &mut self,
        identifier: impl Into<String>,
        stage: FailureStage,
        message: impl Into<String>,
    ) {
        self.failures.push(RecordFailure {
            identifier: identifier.into(),
            stage,
            message: message.into(),
        });
    }

    /// Number of records that errored at any stage.
    #[must_use]
    pub fn errored(&self) -> usize {
        self.failures.len()
    }

    /// Number of records dropped by a filter (not errors).
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.filtered + self.out_of_window + self.too_short + self.below_min_score
    }

    /// Number of documents written.
    #[must_use]
    pub const fn total_written(&self) -> usize {
        self.written.total()
    }

    /// Whether the given identifier failed in this run.
    #[must_use]
    pub fn has_failed(&self, identifier: &str) -> bool {
        self.failures.iter().any(|f| f.identifier == identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        RunSummary::new(date, date.and_hms_opt(9, 0, 0).unwrap(), vec!["cancer".into()])
    }

    #[test]
    fn test_category_counts() {
        let mut counts = CategoryCounts::default();
        counts.increment(Category::High);
        counts.increment(Category::High);
        counts.increment(Category::Low);
        assert_eq!(counts.get(Category::High), 2);
        assert_eq!(counts.get(Category::Medium), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_errored_and_skipped() {
        let mut s = summary();
        s.filtered = 2;
        s.out_of_window = 1;
        s.below_min_score = 4;
        s.record_failure("9", FailureStage::Write, "disk full");
        assert_eq!(s.skipped(), 7);
        assert_eq!(s.errored(), 1);
        assert!(s.has_failed("9"));
        assert!(!s.has_failed("10"));
    }

    #[test]
    fn test_summary_serializes_stage_lowercase() {
        let mut s = summary();
        s.record_failure("1", FailureStage::Fetch, "timeout");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["failures"][0]["stage"], "fetch");
        assert!(json.get("summary_path").is_none());
    }
}
