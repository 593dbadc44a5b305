//! Markdown output formatting.

use crate::models::{Category, RunSummary, ScoredRecord};

const NOT_AVAILABLE: &str = "Not available";

const FRONT_MATTER_FENCE: &str = "---";

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(NOT_AVAILABLE)
}

fn list_or_na(values: &[String]) -> String {
    if values.is_empty() { NOT_AVAILABLE.to_string() } else { values.join(", ") }
}

/// Format one scored record as a Markdown document.
///
/// The document opens with a front-matter block carrying the identifier,
/// which the writer reads back to tell who owns an existing file.
#[must_use]
pub fn format_record_markdown(scored: &ScoredRecord) -> String {
    let record = &scored.record;
    let mut output = String::new();

    // Front matter
    output.push_str(&format!("{FRONT_MATTER_FENCE}\n"));
    output.push_str(&format!("identifier: {}\n", record.identifier));
    output.push_str(&format!("score: {:.2}\n", scored.score));
    output.push_str(&format!("category: {}\n", scored.category));
    output.push_str(&format!("collected_at: {}\n", scored.collected_at.format("%Y-%m-%dT%H:%M:%S")));
    output.push_str(&format!("{FRONT_MATTER_FENCE}\n\n"));

    // Title
    output.push_str(&format!("# {}\n\n", record.title_or_default()));

    if let Some(synopsis) = &scored.synopsis {
        output.push_str(&format!("## Summary\n{synopsis}\n\n"));
    }

    output.push_str("## Paper Information\n");
    output.push_str(&format!("- **Title**: {}\n", record.title_or_default()));
    output.push_str(&format!("- **Authors**: {}\n", list_or_na(&record.authors)));
    output.push_str(&format!("- **Journal**: {}\n", or_na(record.journal.as_deref())));
    output.push_str(&format!(
        "- **Publication Date**: {}\n",
        or_na(record.publication_date.as_deref())
    ));
    match record.doi.as_deref().filter(|d| !d.is_empty()) {
        Some(doi) => output.push_str(&format!("- **DOI**: [{doi}](https://doi.org/{doi})\n")),
        None => output.push_str(&format!("- **DOI**: {NOT_AVAILABLE}\n")),
    }
    output.push_str(&format!("- **PMID**: {}\n", record.identifier));
    output.push_str(&format!("- **PMC ID**: {}\n", or_na(record.pmc_id.as_deref())));
    output.push_str(&format!("- **Keywords**: {}\n\n", list_or_na(&record.keywords)));

    output.push_str("## Abstract\n");
    output.push_str(&format!("{}\n\n", or_na(record.r#abstract.as_deref())));

    output.push_str("## Relevance\n");
    output.push_str(&format!("- **Score**: {:.2}\n", scored.score));
    output.push_str(&format!("- **Category**: {}\n", scored.category));
    output.push_str(&format!("- **Found via**: {}\n\n", list_or_na(&scored.found_via)));

    if scored.matches.is_empty() {
        output.push_str("No keyword matches.\n\n");
    } else {
        output.push_str("| Keyword | Matches |\n|---|---|\n");
        for (keyword, count) in &scored.matches {
            output.push_str(&format!("| {keyword} | {count} |\n"));
        }
        output.push('\n');
    }

    output.push_str("## Collection Information\n");
    output.push_str(&format!(
        "- **Collected**: {}\n",
        scored.collected_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("- **Source URL**: {}\n\n", record.source_url()));

    output.push_str("## Metadata\n");
    output.push_str(&format!("- **Language**: {}\n", or_na(record.language.as_deref())));
    output.push_str(&format!(
        "- **Publication Type**: {}\n",
        list_or_na(&record.publication_types)
    ));
    output.push_str(&format!("- **MeSH Terms**: {}\n", list_or_na(&record.mesh_terms)));
    output.push_str(&format!("- **Grants**: {}\n", list_or_na(&record.grants)));

    output
}

/// Read the identifier out of a document's front-matter block.
#[must_use]
pub fn front_matter_identifier(document: &str) -> Option<&str> {
    let mut lines = document.lines();
    if lines.next()?.trim_end() != FRONT_MATTER_FENCE {
        return None;
    }
    lines
        .take_while(|line| line.trim_end() != FRONT_MATTER_FENCE)
        .find_map(|line| line.strip_prefix("identifier:"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Format a run summary for the terminal or a report file.
#[must_use]
pub fn format_summary_markdown(summary: &RunSummary) -> String {
    let mut output = format!("# Collection Summary ({})\n\n", summary.run_date);

    output.push_str(&format!("**Keywords**: {}\n\n", list_or_na(&summary.keywords)));
    if !summary.failed_keywords.is_empty() {
        output.push_str(&format!(
            "**Failed searches**: {}\n\n",
            summary.failed_keywords.join(", ")
        ));
    }

    output.push_str("| Category | Scored | Written |\n|---|---|---|\n");
    for category in Category::ALL {
        output.push_str(&format!(
            "| {} | {} | {} |\n",
            category,
            summary.categories.get(category),
            summary.written.get(category)
        ));
    }
    output.push('\n');

    let mut meta = Vec::new();
    meta.push(format!("**Candidates**: {}", summary.candidates));
    meta.push(format!("**Fetched**: {}", summary.fetched));
    meta.push(format!("**Skipped**: {}", summary.skipped()));
    meta.push(format!("**Errored**: {}", summary.errored()));
    output.push_str(&format!("{}\n\n", meta.join(" | ")));

    output.push_str(&format!(
        "Filtered by required keywords: {}, outside date window: {}, abstract too short: {}, below minimum score: {}\n",
        summary.filtered, summary.out_of_window, summary.too_short, summary.below_min_score
    ));

    if !summary.failures.is_empty() {
        output.push_str("\n## Failures\n");
        for failure in &summary.failures {
            let id = if failure.identifier.is_empty() { "?" } else { &failure.identifier };
            output.push_str(&format!(
                "- `{}` ({:?}): {}\n",
                id, failure.stage, failure.message
            ));
        }
    }

    output
}
