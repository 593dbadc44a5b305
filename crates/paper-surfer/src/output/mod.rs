//! Output tree: `<root>/<YYYY-MM-DD>/<category>/<file>`.
//!
//! Documents are written atomically (temp file + rename in the same
//! directory). An existing file is only replaced when it belongs to the same
//! record; anything else is a collision and the write fails.

mod naming;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

pub use naming::{MAX_JOURNAL_CHARS, MAX_TITLE_CHARS, file_name, file_stem, sanitize_component};

use crate::error::{OutputError, OutputResult};
use crate::formatters;
use crate::models::{Category, OutputFormat, RunSummary, ScoredRecord};

/// File name of the per-run summary inside the date directory.
pub const SUMMARY_FILE_NAME: &str = "collection_summary.json";

/// Destination for scored records and run summaries.
pub trait RecordSink: Send + Sync {
    /// Write one scored record, returning the path written.
    fn write_record(&self, scored: &ScoredRecord, run_date: NaiveDate) -> OutputResult<PathBuf>;

    /// Write the run summary, returning the path written.
    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf>;
}

/// Writes documents into a date-partitioned directory tree.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a writer rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self { root: root.into(), format }
    }

    /// Output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// `<root>/<YYYY-MM-DD>`
    #[must_use]
    pub fn date_dir(&self, run_date: NaiveDate) -> PathBuf {
        self.root.join(run_date.format("%Y-%m-%d").to_string())
    }

    /// `<root>/<YYYY-MM-DD>/<category>`
    #[must_use]
    pub fn category_dir(&self, run_date: NaiveDate, category: Category) -> PathBuf {
        self.date_dir(run_date).join(category.as_str())
    }

    /// Full path a record is written to.
    #[must_use]
    pub fn record_path(&self, scored: &ScoredRecord, run_date: NaiveDate) -> PathBuf {
        self.category_dir(run_date, scored.category).join(file_name(&scored.record, self.format))
    }

    /// Render the document for a record in this writer's format.
    pub fn render(&self, scored: &ScoredRecord) -> OutputResult<String> {
        match self.format {
            OutputFormat::Markdown => Ok(formatters::format_record_markdown(scored)),
            OutputFormat::Json => Ok(formatters::format_record_json(scored)?),
        }
    }

    /// Write a record, creating its category directory if needed.
    pub fn write(&self, scored: &ScoredRecord, run_date: NaiveDate) -> OutputResult<PathBuf> {
        let dir = self.category_dir(run_date, scored.category);
        fs::create_dir_all(&dir).map_err(|e| OutputError::io(&dir, e))?;

        let path = dir.join(file_name(&scored.record, self.format));
        self.ensure_owned_by(&path, scored.identifier())?;

        let document = self.render(scored)?;
        write_atomic(&path, document.as_bytes())?;

        self.remove_stale_copies(scored, run_date);
        tracing::debug!(pmid = %scored.identifier(), path = %path.display(), "Wrote record");
        Ok(path)
    }

    /// Write the run summary as JSON into the date directory.
    pub fn write_summary_file(&self, summary: &RunSummary) -> OutputResult<PathBuf> {
        let dir = self.date_dir(summary.run_date);
        fs::create_dir_all(&dir).map_err(|e| OutputError::io(&dir, e))?;

        let path = dir.join(SUMMARY_FILE_NAME);
        let document = formatters::format_summary_json(summary)?;
        write_atomic(&path, document.as_bytes())?;
        Ok(path)
    }

    /// Fail unless `path` is absent or already holds `identifier`.
    fn ensure_owned_by(&self, path: &Path, identifier: &str) -> OutputResult<()> {
        if !path.exists() {
            return Ok(());
        }
        let existing = fs::read_to_string(path).map_err(|e| OutputError::io(path, e))?;
        let owner = owner_of(&existing);
        if owner.as_deref() == Some(identifier) {
            return Ok(());
        }
        Err(OutputError::Collision {
            path: path.to_path_buf(),
            existing: owner.unwrap_or_default(),
            incoming: identifier.to_string(),
        })
    }

    /// After a category change between same-day runs, drop the copy left in
    /// the old category so each record lives in exactly one file.
    fn remove_stale_copies(&self, scored: &ScoredRecord, run_date: NaiveDate) {
        let name = file_name(&scored.record, self.format);
        for category in Category::ALL.into_iter().filter(|c| *c != scored.category) {
            let stale = self.category_dir(run_date, category).join(&name);
            let Ok(existing) = fs::read_to_string(&stale) else {
                continue;
            };
            if owner_of(&existing).as_deref() != Some(scored.identifier()) {
                continue;
            }
            match fs::remove_file(&stale) {
                Ok(()) => tracing::info!(
                    pmid = %scored.identifier(),
                    from = %category,
                    to = %scored.category,
                    "Record changed category, removed old copy"
                ),
                Err(e) => tracing::warn!(path = %stale.display(), error = %e, "Could not remove stale copy"),
            }
        }
    }
}

impl RecordSink for OutputWriter {
    fn write_record(&self, scored: &ScoredRecord, run_date: NaiveDate) -> OutputResult<PathBuf> {
        self.write(scored, run_date)
    }

    fn write_summary(&self, summary: &RunSummary) -> OutputResult<PathBuf> {
        self.write_summary_file(summary)
    }
}

/// Identifier recorded in a document of either format.
fn owner_of(document: &str) -> Option<String> {
    formatters::front_matter_identifier(document)
        .map(str::to_string)
        .or_else(|| formatters::document_identifier(document))
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, contents: &[u8]) -> OutputResult<()> {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp, contents).map_err(|e| OutputError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(OutputError::io(path, e));
    }
    Ok(())
}
