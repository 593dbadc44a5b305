//! Scored records and relevance categories.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::MetadataRecord;

/// Score at or above which a record is `High`.
pub const HIGH_THRESHOLD: f64 = 0.7;

/// Score at or above which a record is `Medium`.
pub const MEDIUM_THRESHOLD: f64 = 0.4;

/// Relevance tier derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// score >= 0.7
    High,
    /// 0.4 <= score < 0.7
    Medium,
    /// score < 0.4
    Low,
}

impl Category {
    /// All categories, most relevant first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Map a score to its tier. Boundaries belong to the higher tier.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Lowercase name, also the output directory name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// Keyword → total occurrence count across title, abstract and authors.
pub type KeywordMatches = BTreeMap<String, u32>;

/// A metadata record plus its relevance assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// The fetched record.
    pub record: MetadataRecord,

    /// Normalized score in [0, 1].
    pub score: f64,

    /// Relevance tier.
    pub category: Category,

    /// Per-keyword match counts (only keywords that matched).
    pub matches: KeywordMatches,

    /// Search keywords whose results contained this record, in run order.
    pub found_via: Vec<String>,

    /// Short topic synopsis, when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    /// When the run collected this record.
    pub collected_at: NaiveDateTime,
}

impl ScoredRecord {
    /// Shortcut to the record identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.record.identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_boundaries() {
        assert_eq!(Category::from_score(0.7), Category::High);
        assert_eq!(Category::from_score(0.699_99), Category::Medium);
        assert_eq!(Category::from_score(0.4), Category::Medium);
        assert_eq!(Category::from_score(0.399_99), Category::Low);
    }

    #[test]
    fn test_category_extremes() {
        assert_eq!(Category::from_score(1.0), Category::High);
        assert_eq!(Category::from_score(0.0), Category::Low);
    }

    #[test]
    fn test_category_parse_and_display() {
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>(), Ok(category));
        }
        assert_eq!(" HIGH ".parse::<Category>(), Ok(Category::High));
        assert!("urgent".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Category::Medium).unwrap(), "medium");
    }
}
