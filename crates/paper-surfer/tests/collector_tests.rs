//! Driver tests against an in-memory literature source and a temp output tree.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use paper_surfer::client::DateWindow;
use paper_surfer::collector::FilterConfig;
use paper_surfer::error::{ClientError, ClientResult};
use paper_surfer::models::{Category, FailureStage, MetadataRecord, OutputFormat};
use paper_surfer::output::{SUMMARY_FILE_NAME, file_name};
use paper_surfer::relevance::ScoringConfig;
use paper_surfer::settings::SynopsisConfig;
use paper_surfer::{
    CollectError, Collector, ConfigError, LiteratureSource, OutputWriter, RunContext, Settings,
};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct FakeSource {
    searches: HashMap<String, Vec<String>>,
    failing_keywords: HashSet<String>,
    records: HashMap<String, MetadataRecord>,
    failing_fetches: HashSet<String>,
    search_log: Mutex<Vec<String>>,
    window_log: Mutex<Vec<Option<DateWindow>>>,
    fetch_log: Mutex<Vec<String>>,
}

impl FakeSource {
    fn search_returns(mut self, keyword: &str, ids: &[&str]) -> Self {
        self.searches.insert(keyword.to_string(), ids.iter().map(|s| (*s).to_string()).collect());
        self
    }

    fn with_record(mut self, record: MetadataRecord) -> Self {
        self.records.insert(record.identifier.clone(), record);
        self
    }

    fn search_fails(mut self, keyword: &str) -> Self {
        self.failing_keywords.insert(keyword.to_string());
        self
    }

    fn fetch_fails(mut self, id: &str) -> Self {
        self.failing_fetches.insert(id.to_string());
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetch_log.lock().unwrap().clone()
    }

    fn searched(&self) -> Vec<String> {
        self.search_log.lock().unwrap().clone()
    }

    fn windows(&self) -> Vec<Option<DateWindow>> {
        self.window_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiteratureSource for FakeSource {
    async fn search(
        &self,
        keyword: &str,
        max_results: u32,
        window: Option<DateWindow>,
    ) -> ClientResult<Vec<String>> {
        self.search_log.lock().unwrap().push(keyword.to_string());
        self.window_log.lock().unwrap().push(window);
        if self.failing_keywords.contains(keyword) {
            return Err(ClientError::server(503, "service unavailable"));
        }
        let mut ids = self.searches.get(keyword).cloned().unwrap_or_default();
        ids.truncate(max_results as usize);
        Ok(ids)
    }

    async fn fetch(&self, identifier: &str) -> ClientResult<MetadataRecord> {
        self.fetch_log.lock().unwrap().push(identifier.to_string());
        if self.failing_fetches.contains(identifier) {
            return Err(ClientError::rate_limited(1));
        }
        self.records
            .get(identifier)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("PMID {identifier}")))
    }
}

fn record(id: &str, title: &str, abs: &str) -> MetadataRecord {
    MetadataRecord {
        title: Some(title.to_string()),
        r#abstract: Some(abs.to_string()),
        journal: Some("J Onc".to_string()),
        authors: vec!["Ada Lovelace".to_string()],
        ..MetadataRecord::new(id)
    }
}

fn collected_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(9, 0, 0).unwrap()
}

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap().and_hms_opt(9, 5, 0).unwrap()
}

fn ctx() -> RunContext {
    RunContext::at(collected_at())
}

fn settings(root: &Path, format: OutputFormat) -> Settings {
    Settings {
        keywords: vec!["cancer".into()],
        output_root: root.to_path_buf(),
        format,
        scoring: ScoringConfig {
            required_keywords: vec!["cancer".into()],
            priority_keywords: vec!["evolution".into()],
            ..ScoringConfig::default()
        },
        filter: FilterConfig { lookback_days: None, min_abstract_length: 0 },
        synopsis: SynopsisConfig { enabled: false, max_length: 150 },
        ..Settings::default()
    }
}

fn make_collector(source: &Arc<FakeSource>, settings: Settings) -> Collector {
    let writer = OutputWriter::new(&settings.output_root, settings.format);
    Collector::new(source.clone(), Arc::new(writer), settings).with_clock(fixed_clock)
}

fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn date_dir(root: &Path) -> PathBuf {
    root.join("2026-10-16")
}

/// Every file under `root` with its contents.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let contents = fs::read_to_string(&path).unwrap();
                files.insert(path, contents);
            }
        }
    }
    files
}

/// Record documents only (summary excluded).
fn record_files(root: &Path) -> Vec<PathBuf> {
    snapshot(root)
        .into_keys()
        .filter(|p| p.file_name().is_some_and(|n| n != SUMMARY_FILE_NAME))
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_end_to_end_single_record_is_high() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default().search_returns("cancer", &["1"]).with_record(record(
            "1",
            "Cancer evolution study",
            "We sequenced cancer samples to follow cancer progression.",
        )),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.written.high, 1);
    assert_eq!(summary.total_written(), 1);
    assert_eq!(summary.errored(), 0);
    assert_eq!(summary.finished_at, Some(fixed_clock()));

    let path = date_dir(dir.path()).join("high").join("J_Onc_Cancer_evolution_study_1.md");
    let document = fs::read_to_string(&path).unwrap();
    assert!(document.starts_with("---\nidentifier: 1\nscore: 1.00\ncategory: high\n"));
    assert!(document.contains("| cancer | 3 |"));
    assert!(document.contains("| evolution | 1 |"));
    assert!(document.contains("https://pubmed.ncbi.nlm.nih.gov/1/"));
    assert!(document.contains("2026-10-16 09:00:00"));

    let summary_path = date_dir(dir.path()).join(SUMMARY_FILE_NAME);
    assert_eq!(summary.summary_path.as_deref(), Some(summary_path.as_path()));
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(summary_path).unwrap()).unwrap();
    assert_eq!(json["written"]["high"], 1);
    assert_eq!(json["total_written"], 1);
}

#[tokio::test]
async fn test_record_without_required_keyword_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("evolution", &["5"])
            .with_record(record("5", "Clonal evolution of finches", "Evolution evolution.")),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["evolution"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.filtered, 1);
    assert_eq!(summary.scored, 0);
    assert_eq!(summary.total_written(), 0);
    assert!(record_files(dir.path()).is_empty());
    assert!(date_dir(dir.path()).join(SUMMARY_FILE_NAME).exists());
}

#[tokio::test]
async fn test_record_found_by_two_keywords_is_fetched_and_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["7", "8"])
            .search_returns("tumor", &["7"])
            .with_record(record("7", "Tumor and cancer", "A tumor study in cancer."))
            .with_record(record("8", "Cancer only", "Nothing else.")),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Json));

    let summary = collector.run(&keywords(&["cancer", "tumor"]), 10, ctx()).await.unwrap();

    assert_eq!(source.fetched(), vec!["7", "8"]);
    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.total_written(), 2);

    let files: Vec<PathBuf> = record_files(dir.path())
        .into_iter()
        .filter(|p| p.to_string_lossy().ends_with("_7.json"))
        .collect();
    assert_eq!(files.len(), 1);

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(doc["found_via"], serde_json::json!(["cancer", "tumor"]));
    assert_eq!(doc["matches"]["cancer"], 2);
    assert_eq!(doc["matches"]["tumor"], 2);
}

#[tokio::test]
async fn test_same_day_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2"])
            .with_record(record("1", "Cancer evolution", "cancer"))
            .with_record(record("2", "Cancer atlas", "Pan-cancer atlas.")),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();
    let first = snapshot(dir.path());
    collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();
    let second = snapshot(dir.path());

    assert_eq!(first.len(), 3, "two records and one summary");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_identical_journal_and_title_get_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["100", "200"])
            .with_record(record("100", "Cancer review", "cancer"))
            .with_record(record("200", "Cancer review", "cancer")),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.total_written(), 2);
    let files = record_files(dir.path());
    assert_eq!(files.len(), 2);
    for (file, id) in files.iter().zip(["100", "200"]) {
        let text = fs::read_to_string(file).unwrap();
        assert!(text.starts_with(&format!("---\nidentifier: {id}\n")));
    }
}

#[tokio::test]
async fn test_write_failure_is_counted_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let broken = record("1", "Cancer evolution", "cancer");
    let healthy = record("2", "Cancer atlas", "cancer");

    // A directory where the document should go makes that single write fail.
    let name = file_name(&broken, OutputFormat::Markdown);
    for category in Category::ALL {
        fs::create_dir_all(date_dir(dir.path()).join(category.as_str()).join(&name)).unwrap();
    }

    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2"])
            .with_record(broken)
            .with_record(healthy.clone()),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.errored(), 1);
    assert_eq!(summary.failures[0].identifier, "1");
    assert_eq!(summary.failures[0].stage, FailureStage::Write);
    assert_eq!(summary.total_written(), 1);

    let healthy_name = file_name(&healthy, OutputFormat::Markdown);
    let written: Vec<PathBuf> = record_files(dir.path());
    assert_eq!(written.len(), 1);
    assert!(written[0].ends_with(&healthy_name));
    assert!(date_dir(dir.path()).join(SUMMARY_FILE_NAME).exists());
}

#[tokio::test]
async fn test_fetch_failure_skips_only_that_record() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2", "3"])
            .with_record(record("1", "Cancer one", "cancer"))
            .with_record(record("3", "Cancer three", "cancer"))
            .fetch_fails("2"),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.total_written(), 2);
    assert_eq!(summary.errored(), 1);
    assert!(summary.has_failed("2"));
    assert_eq!(summary.failures[0].stage, FailureStage::Fetch);
}

#[tokio::test]
async fn test_missing_record_counts_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::default().search_returns("cancer", &["404"]));
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert!(summary.has_failed("404"));
    assert_eq!(summary.total_written(), 0);
    assert!(summary.summary_path.is_some());
}

#[tokio::test]
async fn test_malformed_record_is_dropped_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FakeSource::default().search_returns("cancer", &["9"]);
    source.records.insert("9".into(), record("", "Cancer without id", "cancer"));
    let source = Arc::new(source);
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.errored(), 1);
    assert_eq!(summary.failures[0].stage, FailureStage::Validate);
    assert!(record_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_failed_search_skips_keyword() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_fails("tumor")
            .search_returns("cancer", &["1"])
            .with_record(record("1", "Cancer", "cancer")),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["tumor", "cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(source.searched(), vec!["tumor", "cancer"]);
    assert_eq!(summary.failed_keywords, vec!["tumor"]);
    assert_eq!(summary.total_written(), 1);
}

#[tokio::test]
async fn test_every_record_failing_still_produces_summary() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default().search_returns("cancer", &["1", "2"]).fetch_fails("1").fetch_fails("2"),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.errored(), 2);
    assert_eq!(summary.total_written(), 0);
    assert!(date_dir(dir.path()).join(SUMMARY_FILE_NAME).exists());
}

#[tokio::test]
async fn test_configuration_errors_stop_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(FakeSource::default().search_returns("cancer", &["1"]));
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let empty = collector.run(&keywords(&["  ", ""]), 10, ctx()).await.unwrap_err();
    assert!(matches!(empty, CollectError::Config(ConfigError::EmptyKeywords)));

    let zero = collector.run(&keywords(&["cancer"]), 0, ctx()).await.unwrap_err();
    assert!(matches!(zero, CollectError::Config(ConfigError::InvalidMaxResults { value: 0, .. })));

    let mut bad = settings(dir.path(), OutputFormat::Markdown);
    bad.scoring.normalizer = -1.0;
    let bad = make_collector(&source, bad);
    assert!(bad.run(&keywords(&["cancer"]), 10, ctx()).await.is_err());

    assert!(source.searched().is_empty());
    assert!(!dir.path().join("2026-10-16").exists());
}

#[tokio::test]
async fn test_date_window_drops_old_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut old = record("1", "Cancer history", "cancer");
    old.publication_date = Some("2020-01-01".into());
    let mut boundary = record("2", "Cancer boundary", "cancer");
    boundary.publication_date = Some("2026-09-16".into());
    let undated = record("3", "Cancer undated", "cancer");

    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2", "3"])
            .with_record(old)
            .with_record(boundary)
            .with_record(undated),
    );
    let mut settings = settings(dir.path(), OutputFormat::Markdown);
    settings.filter.lookback_days = Some(30);
    let collector = make_collector(&source, settings);

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.out_of_window, 1);
    assert_eq!(summary.total_written(), 2);
}

#[tokio::test]
async fn test_search_asks_only_for_the_lookback_window() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1"])
            .search_returns("tumor", &["1"])
            .with_record(record("1", "Cancer", "cancer")),
    );
    let mut settings = settings(dir.path(), OutputFormat::Markdown);
    settings.filter.lookback_days = Some(30);
    let collector = make_collector(&source, settings);

    collector.run(&keywords(&["cancer", "tumor"]), 10, ctx()).await.unwrap();

    let expected = DateWindow {
        from: NaiveDate::from_ymd_opt(2026, 9, 16).unwrap(),
        to: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
    };
    assert_eq!(source.windows(), vec![Some(expected), Some(expected)]);
}

#[tokio::test]
async fn test_search_is_unbounded_without_lookback() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1"])
            .with_record(record("1", "Cancer", "cancer")),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(source.windows(), vec![None]);
}

#[tokio::test]
async fn test_short_abstracts_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2"])
            .with_record(record("1", "Cancer", "cancer"))
            .with_record(record("2", "Cancer", &"cancer genomics ".repeat(10))),
    );
    let mut settings = settings(dir.path(), OutputFormat::Markdown);
    settings.filter.min_abstract_length = 50;
    let collector = make_collector(&source, settings);

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert_eq!(summary.too_short, 1);
    assert_eq!(summary.total_written(), 1);
}

#[tokio::test]
async fn test_records_below_min_score_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2"])
            .with_record(record("1", "A note", "on cancer"))
            .with_record(record("2", "Cancer evolution", "cancer evolution")),
    );
    let mut settings = settings(dir.path(), OutputFormat::Markdown);
    settings.scoring.min_score = 0.5;
    let collector = make_collector(&source, settings);

    let summary = collector.run(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    // "1" scores (1.0 + 0.2) / 4.0 = 0.3
    assert_eq!(summary.below_min_score, 1);
    assert_eq!(summary.scored, 1);
    assert_eq!(summary.total_written(), 1);
    assert_eq!(record_files(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_high_impact_journal_is_promoted() {
    let dir = tempfile::tempdir().unwrap();
    let mut paper = record("1", "A note", "on cancer");
    paper.journal = Some("Nature Genetics".into());
    let source = Arc::new(FakeSource::default().search_returns("cancer", &["1"]).with_record(paper));
    let mut settings = settings(dir.path(), OutputFormat::Markdown);
    settings.high_impact_journals = vec!["nature".into()];
    let collector = make_collector(&source, settings);

    let collection = collector.collect(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    assert!(collection.records[0].score < 0.4);
    assert_eq!(collection.records[0].category, Category::High);
}

#[tokio::test]
async fn test_collect_sorts_by_score_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2"])
            .with_record(record("1", "A note", "on cancer"))
            .with_record(record("2", "Cancer evolution", "cancer evolution")),
    );
    let mut settings = settings(dir.path(), OutputFormat::Markdown);
    settings.synopsis.enabled = true;
    let collector = make_collector(&source, settings);

    let collection = collector.collect(&keywords(&["cancer"]), 10, ctx()).await.unwrap();

    let ids: Vec<&str> = collection.records.iter().map(|r| r.identifier()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert_eq!(collection.top(1).len(), 1);
    assert_eq!(collection.top(10).len(), 2);
    assert!(collection.records.iter().all(|r| r.synopsis.is_some()));
    assert!(!dir.path().join("2026-10-16").exists());

    let summary = collector.persist(collection);
    assert_eq!(summary.total_written(), 2);
}

#[tokio::test]
async fn test_max_results_caps_each_keyword() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        FakeSource::default()
            .search_returns("cancer", &["1", "2", "3"])
            .with_record(record("1", "Cancer", "cancer"))
            .with_record(record("2", "Cancer", "cancer"))
            .with_record(record("3", "Cancer", "cancer")),
    );
    let collector = make_collector(&source, settings(dir.path(), OutputFormat::Markdown));

    let summary = collector.run(&keywords(&["cancer"]), 2, ctx()).await.unwrap();

    assert_eq!(summary.candidates, 2);
    assert_eq!(source.fetched(), vec!["1", "2"]);
}
