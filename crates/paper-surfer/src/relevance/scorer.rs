//! Keyword relevance scoring.
//!
//! Matching is case-insensitive substring matching. Each field (title,
//! abstract, joined author names) is searched separately and occurrences are
//! counted non-overlapping. A keyword that matches anywhere contributes its
//! weight once, plus a bonus for each field it appears in. The raw sum is
//! divided by [`ScoringConfig::normalizer`] and clamped to [0, 1].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{KeywordMatches, MetadataRecord};

/// Default divisor applied to the raw weighted sum.
pub const DEFAULT_NORMALIZER: f64 = 4.0;

/// Weights and keyword lists for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// A record must match at least one of these to be kept (empty = no gate).
    pub required_keywords: Vec<String>,

    /// Keywords scored with `priority_weight`.
    pub priority_keywords: Vec<String>,

    /// Weight of a priority keyword.
    pub priority_weight: f64,

    /// Weight of every other keyword.
    pub base_weight: f64,

    /// Added once when a keyword appears in the title.
    pub title_bonus: f64,

    /// Added once when a keyword appears in the abstract.
    pub abstract_bonus: f64,

    /// Added once when a keyword appears in the author names.
    pub author_bonus: f64,

    /// Divisor mapping the raw sum into [0, 1].
    pub normalizer: f64,

    /// Scored records below this normalized score are dropped.
    pub min_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            required_keywords: Vec::new(),
            priority_keywords: Vec::new(),
            priority_weight: 2.0,
            base_weight: 1.0,
            title_bonus: 0.5,
            abstract_bonus: 0.2,
            author_bonus: 0.3,
            normalizer: DEFAULT_NORMALIZER,
            min_score: 0.0,
        }
    }
}

impl ScoringConfig {
    /// Reject weights that would break the [0, 1] range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.normalizer.is_finite() && self.normalizer > 0.0) {
            return Err(ConfigError::invalid("scoring.normalizer", "must be a positive number"));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ConfigError::invalid("scoring.min_score", "must be between 0 and 1"));
        }
        let weights = [
            ("scoring.priority_weight", self.priority_weight),
            ("scoring.base_weight", self.base_weight),
            ("scoring.title_bonus", self.title_bonus),
            ("scoring.abstract_bonus", self.abstract_bonus),
            ("scoring.author_bonus", self.author_bonus),
        ];
        for (field, value) in weights {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::invalid(field, "must be a non-negative number"));
            }
        }
        Ok(())
    }
}

/// Result of scoring one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Relevance {
    /// Weighted sum before normalization.
    pub raw: f64,
    /// Normalized score in [0, 1].
    pub score: f64,
    /// Keywords that matched, with total occurrence counts.
    pub matches: KeywordMatches,
}

#[derive(Debug, Clone)]
struct Term {
    keyword: String,
    needle: String,
    weight: f64,
}

/// Occurrences of one keyword per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldHits {
    /// Occurrences in the title.
    pub title: u32,
    /// Occurrences in the abstract.
    pub r#abstract: u32,
    /// Occurrences in the joined author names.
    pub authors: u32,
}

impl FieldHits {
    /// Total occurrences across fields.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.title + self.r#abstract + self.authors
    }
}

/// Lowercased views of the scored fields.
struct Haystack {
    title: String,
    r#abstract: String,
    authors: String,
}

impl Haystack {
    fn of(record: &MetadataRecord) -> Self {
        Self {
            title: record.title.as_deref().unwrap_or("").to_lowercase(),
            r#abstract: record.abstract_text().to_lowercase(),
            authors: record.author_names().to_lowercase(),
        }
    }

    fn hits(&self, needle: &str) -> FieldHits {
        FieldHits {
            title: count(&self.title, needle),
            r#abstract: count(&self.r#abstract, needle),
            authors: count(&self.authors, needle),
        }
    }

    fn contains(&self, needle: &str) -> bool {
        self.title.contains(needle)
            || self.r#abstract.contains(needle)
            || self.authors.contains(needle)
    }
}

fn count(haystack: &str, needle: &str) -> u32 {
    haystack.matches(needle).count() as u32
}

fn normalize_keyword(keyword: &str) -> Option<String> {
    let trimmed = keyword.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Scoring configuration compiled against one run's search keywords.
///
/// The scored keyword set is the run keywords, then required, then priority
/// keywords, deduplicated case-insensitively (first spelling wins).
#[derive(Debug, Clone)]
pub struct Scorer {
    terms: Vec<Term>,
    required: Vec<String>,
    config: ScoringConfig,
}

impl Scorer {
    /// Compile a scorer.
    pub fn new(config: &ScoringConfig, search_keywords: &[String]) -> Result<Self, ConfigError> {
        config.validate()?;

        let priority: Vec<String> =
            config.priority_keywords.iter().filter_map(|k| normalize_keyword(k)).collect();

        let mut terms: Vec<Term> = Vec::new();
        let all = search_keywords
            .iter()
            .chain(&config.required_keywords)
            .chain(&config.priority_keywords);
        for keyword in all {
            let Some(needle) = normalize_keyword(keyword) else {
                continue;
            };
            if terms.iter().any(|t| t.needle == needle) {
                continue;
            }
            let weight = if priority.contains(&needle) {
                config.priority_weight
            } else {
                config.base_weight
            };
            terms.push(Term { keyword: keyword.trim().to_string(), needle, weight });
        }

        let mut required: Vec<String> = Vec::new();
        for needle in config.required_keywords.iter().filter_map(|k| normalize_keyword(k)) {
            if !required.contains(&needle) {
                required.push(needle);
            }
        }

        Ok(Self { terms, required, config: config.clone() })
    }

    /// Keywords this scorer looks for, in scoring order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.keyword.as_str())
    }

    /// Weight assigned to `keyword`, if it is scored at all.
    #[must_use]
    pub fn weight_of(&self, keyword: &str) -> Option<f64> {
        let needle = normalize_keyword(keyword)?;
        self.terms.iter().find(|t| t.needle == needle).map(|t| t.weight)
    }

    /// Whether the record matches at least one required keyword.
    ///
    /// Always true when no required keywords are configured.
    #[must_use]
    pub fn passes_required_gate(&self, record: &MetadataRecord) -> bool {
        if self.required.is_empty() {
            return true;
        }
        let haystack = Haystack::of(record);
        self.required.iter().any(|needle| haystack.contains(needle))
    }

    /// Per-field hits for every scored keyword.
    #[must_use]
    pub fn field_hits(&self, record: &MetadataRecord) -> Vec<(&str, FieldHits)> {
        let haystack = Haystack::of(record);
        self.terms.iter().map(|t| (t.keyword.as_str(), haystack.hits(&t.needle))).collect()
    }

    /// Score a record. Does not apply the required-keyword gate.
    #[must_use]
    pub fn score(&self, record: &MetadataRecord) -> Relevance {
        let haystack = Haystack::of(record);
        let mut raw = 0.0;
        let mut matches = KeywordMatches::new();

        for term in &self.terms {
            let hits = haystack.hits(&term.needle);
            if hits.total() == 0 {
                continue;
            }

            let mut contribution = term.weight;
            if hits.title > 0 {
                contribution += self.config.title_bonus;
            }
            if hits.r#abstract > 0 {
                contribution += self.config.abstract_bonus;
            }
            if hits.authors > 0 {
                contribution += self.config.author_bonus;
            }

            raw += contribution;
            matches.insert(term.keyword.clone(), hits.total());
        }

        let score = (raw / self.config.normalizer).clamp(0.0, 1.0);
        Relevance { raw, score, matches }
    }

    /// Whether a score reaches the configured `min_score`.
    #[must_use]
    pub fn meets_min_score(&self, relevance: &Relevance) -> bool {
        relevance.score >= self.config.min_score
    }

    /// Gate then score: `None` when the record matches no required keyword.
    #[must_use]
    pub fn evaluate(&self, record: &MetadataRecord) -> Option<Relevance> {
        self.passes_required_gate(record).then(|| self.score(record))
    }
}
