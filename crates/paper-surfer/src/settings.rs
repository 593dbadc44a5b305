//! Run settings, loaded from an optional JSON file.
//!
//! Every field has a default, so a settings file only needs the values it
//! changes:
//!
//! ```json
//! { "keywords": ["tumor evolution"], "filter": { "lookback_days": 7 } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collector::FilterConfig;
use crate::config::api;
use crate::error::ConfigError;
use crate::models::OutputFormat;
use crate::relevance::ScoringConfig;
use crate::schedule::{Schedule, ScheduleConfig};

const DEFAULT_KEYWORDS: &[&str] = &[
    "breast cancer",
    "cancer genomics",
    "sequencing",
    "mutation",
    "cancer evolution",
    "cancer",
    "evolution",
    "trajectory",
    "tumor",
    "somatic",
    "germline",
];

const DEFAULT_HIGH_IMPACT: &[&str] = &["nature", "cell", "science"];

const DEFAULT_REQUIRED: &[&str] = &["breast cancer", "cancer", "sequencing", "mutation"];

const DEFAULT_PRIORITY: &[&str] = &[
    "cancer evolution",
    "evolution",
    "clonal",
    "whole genome duplication",
    "whole genome doubling",
    "giant tumor cell",
    "WGD",
    "WGS",
    "SNV",
    "SV",
    "CNV",
    "CNA",
    "copy number alteration",
    "copynumber alteration",
    "structural",
];

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Synopsis generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynopsisConfig {
    /// Attach a synopsis to every written record.
    pub enabled: bool,
    /// Maximum synopsis length in characters.
    pub max_length: usize,
}

impl Default for SynopsisConfig {
    fn default() -> Self {
        Self { enabled: true, max_length: 150 }
    }
}

/// Everything a collection run needs apart from the HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Keywords searched when none are given on the command line.
    pub keywords: Vec<String>,
    /// Candidate ids requested per keyword.
    pub max_results: u32,
    /// Root of the date-partitioned output tree.
    pub output_root: PathBuf,
    /// Document format.
    pub format: OutputFormat,
    /// Keyword lists and weights.
    pub scoring: ScoringConfig,
    /// Pre-scoring filters.
    pub filter: FilterConfig,
    /// Journals whose records are always filed as high relevance. Matched as
    /// case-insensitive substrings of the journal name.
    pub high_impact_journals: Vec<String>,
    /// Synopsis generation.
    pub synopsis: SynopsisConfig,
    /// Weekly schedule for `schedule` mode.
    pub schedule: ScheduleConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keywords: strings(DEFAULT_KEYWORDS),
            max_results: 50,
            output_root: PathBuf::from("./output/papers"),
            format: OutputFormat::Markdown,
            scoring: ScoringConfig {
                required_keywords: strings(DEFAULT_REQUIRED),
                priority_keywords: strings(DEFAULT_PRIORITY),
                ..ScoringConfig::default()
            },
            filter: FilterConfig::default(),
            high_impact_journals: strings(DEFAULT_HIGH_IMPACT),
            synopsis: SynopsisConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Settings {
    /// Load and validate settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid settings JSON,
    /// or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let settings = Self::from_json(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parse settings JSON without validating it.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid settings JSON.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyKeywords);
        }
        validate_max_results(self.max_results)?;
        self.scoring.validate()?;
        self.filter.validate()?;
        if self.synopsis.enabled && self.synopsis.max_length == 0 {
            return Err(ConfigError::invalid("synopsis.max_length", "must be positive"));
        }
        Schedule::parse(&self.schedule)?;
        Ok(())
    }
}

/// `max_results` must be within `1..=MAX_RESULTS_LIMIT`.
pub fn validate_max_results(value: u32) -> Result<(), ConfigError> {
    if value == 0 || value > api::MAX_RESULTS_LIMIT {
        return Err(ConfigError::InvalidMaxResults { value, max: api::MAX_RESULTS_LIMIT });
    }
    Ok(())
}
