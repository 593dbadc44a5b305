//! Collection driver.
//!
//! One run: search every keyword, deduplicate the candidate ids, fetch the
//! records once, filter, score, categorize, then write each accepted record
//! and a run summary. Only configuration errors stop a run; everything else
//! is counted in the [`RunSummary`] and the run carries on.

mod filter;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

pub use filter::{FilterConfig, MAX_LOOKBACK_DAYS, Verdict, latest_day};

use crate::client::{DateWindow, LiteratureSource};
use crate::error::{CollectError, ConfigError};
use crate::models::{FailureStage, RunSummary, ScoredRecord};
use crate::output::RecordSink;
use crate::relevance::{Scorer, categorize, promote_for_journal, synopsis};
use crate::settings::{Settings, validate_max_results};

fn local_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Date and timestamp stamped on everything a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// Date directory the run writes into.
    pub run_date: NaiveDate,
    /// Collection timestamp recorded in every document.
    pub collected_at: NaiveDateTime,
}

impl RunContext {
    /// Context for a run starting now (local time).
    #[must_use]
    pub fn now() -> Self {
        Self::at(local_now())
    }

    /// Context for a run at a fixed instant.
    #[must_use]
    pub fn at(collected_at: NaiveDateTime) -> Self {
        Self { run_date: collected_at.date(), collected_at }
    }
}

/// Scored records of one run, not yet written.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Accepted records, highest score first.
    pub records: Vec<ScoredRecord>,
    /// Counters up to (not including) the write stage.
    pub summary: RunSummary,
}

impl Collection {
    /// The `n` best records.
    #[must_use]
    pub fn top(&self, n: usize) -> &[ScoredRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

/// Trim, drop blanks and deduplicate case-insensitively (first spelling wins).
fn normalize_keywords(keywords: &[String]) -> Result<Vec<String>, ConfigError> {
    let mut seen = HashSet::new();
    let normalized: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .map(str::to_string)
        .collect();
    if normalized.is_empty() {
        return Err(ConfigError::EmptyKeywords);
    }
    Ok(normalized)
}

/// Drives collection runs against a literature source and a record sink.
pub struct Collector {
    source: Arc<dyn LiteratureSource>,
    sink: Arc<dyn RecordSink>,
    settings: Settings,
    clock: fn() -> NaiveDateTime,
}

impl Collector {
    /// Create a collector.
    #[must_use]
    pub fn new(
        source: Arc<dyn LiteratureSource>,
        sink: Arc<dyn RecordSink>,
        settings: Settings,
    ) -> Self {
        Self { source, sink, settings, clock: local_now }
    }

    /// Replace the clock used for `finished_at`.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Settings this collector runs with.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Search, fetch, filter, score and categorize without writing anything.
    ///
    /// # Errors
    ///
    /// Returns a configuration error (empty keyword list, `max_results` out of
    /// range, invalid scoring or filter settings) before any request is made.
    pub async fn collect(
        &self,
        keywords: &[String],
        max_results: u32,
        ctx: RunContext,
    ) -> Result<Collection, CollectError> {
        let keywords = normalize_keywords(keywords)?;
        validate_max_results(max_results)?;
        self.settings.filter.validate()?;
        let scorer = Scorer::new(&self.settings.scoring, &keywords)?;

        let mut summary = RunSummary::new(ctx.run_date, ctx.collected_at, keywords.clone());
        tracing::info!(
            keywords = ?keywords,
            max_results,
            run_date = %ctx.run_date,
            "Starting collection"
        );

        // Candidate ids in first-seen order, with the keywords that found them.
        let mut candidates: Vec<String> = Vec::new();
        let mut found_via: HashMap<String, Vec<String>> = HashMap::new();
        let window = self
            .settings
            .filter
            .window_start(ctx.run_date)
            .map(|from| DateWindow { from, to: ctx.run_date });

        for keyword in &keywords {
            let ids = match self.source.search(keyword, max_results, window).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(keyword = %keyword, error = %e, "Search failed, skipping keyword");
                    summary.failed_keywords.push(keyword.clone());
                    continue;
                }
            };
            tracing::info!(keyword = %keyword, count = ids.len(), "Search returned candidates");

            for id in ids.iter().take(max_results as usize) {
                let id = id.trim();
                if id.is_empty() {
                    continue;
                }
                let via = found_via.entry(id.to_string()).or_default();
                if via.is_empty() {
                    candidates.push(id.to_string());
                }
                if !via.contains(keyword) {
                    via.push(keyword.clone());
                }
            }
        }
        summary.candidates = candidates.len();

        let outcomes =
            if candidates.is_empty() { Vec::new() } else { self.source.fetch_many(&candidates).await };

        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for (id, outcome) in outcomes {
            let record = match outcome {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(pmid = %id, error = %e, "Fetch failed, skipping record");
                    summary.record_failure(id, FailureStage::Fetch, e.to_string());
                    continue;
                }
            };
            summary.fetched += 1;

            if !record.is_well_formed() {
                tracing::warn!(pmid = %id, "Fetched record has no identifier");
                summary.record_failure(id, FailureStage::Validate, "record has no identifier");
                continue;
            }
            if !seen.insert(record.identifier.clone()) {
                tracing::debug!(pmid = %record.identifier, "Duplicate record in fetch results");
                continue;
            }

            match self.settings.filter.check(&record, ctx.run_date) {
                Verdict::Keep => {}
                Verdict::OutOfWindow => {
                    tracing::debug!(
                        pmid = %record.identifier,
                        published = record.publication_date.as_deref().unwrap_or(""),
                        "Outside the date window"
                    );
                    summary.out_of_window += 1;
                    continue;
                }
                Verdict::TooShort => {
                    tracing::debug!(pmid = %record.identifier, "Abstract too short");
                    summary.too_short += 1;
                    continue;
                }
            }

            let Some(relevance) = scorer.evaluate(&record) else {
                tracing::debug!(pmid = %record.identifier, "No required keyword matched");
                summary.filtered += 1;
                continue;
            };
            if !scorer.meets_min_score(&relevance) {
                tracing::debug!(
                    pmid = %record.identifier,
                    score = relevance.score,
                    "Below minimum score"
                );
                summary.below_min_score += 1;
                continue;
            }

            let category = promote_for_journal(
                categorize(relevance.score),
                record.journal.as_deref(),
                &self.settings.high_impact_journals,
            );
            tracing::debug!(
                pmid = %record.identifier,
                score = relevance.score,
                category = %category,
                "Scored record"
            );

            let synopsis = self
                .settings
                .synopsis
                .enabled
                .then(|| synopsis(&record, self.settings.synopsis.max_length));
            let via = found_via
                .remove(&id)
                .or_else(|| found_via.remove(&record.identifier))
                .unwrap_or_default();

            summary.scored += 1;
            summary.categories.increment(category);
            records.push(ScoredRecord {
                record,
                score: relevance.score,
                category,
                matches: relevance.matches,
                found_via: via,
                synopsis,
                collected_at: ctx.collected_at,
            });
        }

        records.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| a.identifier().cmp(b.identifier()))
        });

        tracing::info!(
            candidates = summary.candidates,
            fetched = summary.fetched,
            scored = summary.scored,
            skipped = summary.skipped(),
            errored = summary.errored(),
            "Collection finished"
        );
        Ok(Collection { records, summary })
    }

    /// Write every record of a collection, then the run summary.
    ///
    /// A failed write is counted against that record and the remaining
    /// records are still written. A failed summary write is logged.
    pub fn persist(&self, collection: Collection) -> RunSummary {
        let Collection { records, mut summary } = collection;

        for scored in &records {
            match self.sink.write_record(scored, summary.run_date) {
                Ok(path) => {
                    summary.written.increment(scored.category);
                    tracing::info!(
                        pmid = %scored.identifier(),
                        category = %scored.category,
                        path = %path.display(),
                        "Saved record"
                    );
                }
                Err(e) => {
                    tracing::error!(pmid = %scored.identifier(), error = %e, "Write failed");
                    summary.record_failure(scored.identifier(), FailureStage::Write, e.to_string());
                }
            }
        }

        summary.finished_at = Some((self.clock)());
        match self.sink.write_summary(&summary) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Saved run summary");
                summary.summary_path = Some(path);
            }
            Err(e) => tracing::error!(error = %e, "Could not write run summary"),
        }

        tracing::info!(
            high = summary.written.high,
            medium = summary.written.medium,
            low = summary.written.low,
            skipped = summary.skipped(),
            errored = summary.errored(),
            "Run complete"
        );
        summary
    }

    /// Collect and persist in one go.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any processing begins; every
    /// other failure is reported in the returned summary.
    pub async fn run(
        &self,
        keywords: &[String],
        max_results: u32,
        ctx: RunContext,
    ) -> Result<RunSummary, CollectError> {
        let collection = self.collect(keywords, max_results, ctx).await?;
        Ok(self.persist(collection))
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector").field("settings", &self.settings).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keywords() {
        let input = vec![" Cancer ".to_string(), "cancer".into(), String::new(), "WGD".into()];
        assert_eq!(normalize_keywords(&input).unwrap(), vec!["Cancer", "WGD"]);
        assert!(matches!(normalize_keywords(&[" ".to_string()]), Err(ConfigError::EmptyKeywords)));
    }

    #[test]
    fn test_run_context_at() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(23, 59, 59).unwrap();
        let ctx = RunContext::at(at);
        assert_eq!(ctx.run_date, at.date());
        assert_eq!(ctx.collected_at, at);
    }
}
