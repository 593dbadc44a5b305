//! Deterministic, filesystem-safe file names for records.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{MetadataRecord, OutputFormat};

/// Longest journal segment kept in a file name (characters).
pub const MAX_JOURNAL_CHARS: usize = 40;

/// Longest title segment kept in a file name (characters).
pub const MAX_TITLE_CHARS: usize = 80;

/// Byte budget for a whole stem. Leaves room under the 255-byte name limit
/// for the extension and the writer's `.<name>.tmp` staging file.
pub const MAX_STEM_BYTES: usize = 200;

static ILLEGAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").expect("valid regex"));

/// Replace characters that are illegal in paths with `_` and tidy the result.
#[must_use]
pub fn sanitize_component(input: &str) -> String {
    let replaced = ILLEGAL.replace_all(input, "_");
    let replaced = WHITESPACE.replace_all(&replaced, "_");
    let replaced = UNDERSCORES.replace_all(&replaced, "_");
    replaced.trim_matches(|c| c == '_' || c == '.').to_string()
}

fn segment(value: Option<&str>, max_chars: Option<usize>, fallback: &str) -> String {
    let mut cleaned = sanitize_component(value.unwrap_or(""));
    if let Some(max) = max_chars {
        if cleaned.chars().count() > max {
            cleaned = cleaned.chars().take(max).collect::<String>();
            cleaned = cleaned.trim_end_matches(['_', '.']).to_string();
        }
    }
    if cleaned.is_empty() { fallback.to_string() } else { cleaned }
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a char.
fn clip_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn fit(segment: &str, max_bytes: usize, fallback: &str) -> String {
    let clipped = clip_bytes(segment, max_bytes).trim_end_matches(['_', '.']);
    if clipped.is_empty() { fallback.to_string() } else { clipped.to_string() }
}

/// `<journal>_<title>_<identifier>` with each part sanitized.
///
/// Journal and title are truncated, first by characters and then so the stem
/// stays within [`MAX_STEM_BYTES`]; the identifier never is, so two records
/// with the same journal and title still get distinct names.
#[must_use]
pub fn file_stem(record: &MetadataRecord) -> String {
    let journal = segment(record.journal.as_deref(), Some(MAX_JOURNAL_CHARS), "unknown_journal");
    let title = segment(record.title.as_deref(), Some(MAX_TITLE_CHARS), "untitled");
    let id = segment(Some(&record.identifier), None, "unknown_id");

    // Two separators plus the identifier come off the top.
    let room = MAX_STEM_BYTES.saturating_sub(id.len() + 2);
    let journal = fit(&journal, room / 3, "j");
    let title = fit(&title, room.saturating_sub(journal.len()), "t");
    format!("{journal}_{title}_{id}")
}

/// File name including the extension for `format`.
#[must_use]
pub fn file_name(record: &MetadataRecord, format: OutputFormat) -> String {
    format!("{}.{}", file_stem(record), format.extension())
}
