//! One-line topic synopsis from keyword cues in title and abstract.

use crate::models::MetadataRecord;

const FALLBACK: &str = "A research paper in the field of medicine and life sciences.";

/// Build a short synopsis, truncated to `max_chars` characters.
#[must_use]
pub fn synopsis(record: &MetadataRecord, max_chars: usize) -> String {
    let title = record.title.as_deref().unwrap_or("").to_lowercase();
    let abs = record.abstract_text().to_lowercase();
    let either = |cue: &str| title.contains(cue) || abs.contains(cue);

    let mut topics: Vec<&str> = Vec::new();
    if title.contains("breast cancer") {
        topics.push("Breast Cancer");
    } else if title.contains("cancer") {
        topics.push("Cancer");
    }
    if either("sequencing") {
        topics.push("Sequencing");
    }
    if title.contains("genomics") || title.contains("genomic") {
        topics.push("Genomics");
    }
    if either("mutation") {
        topics.push("Mutation");
    }

    let purpose = if abs.contains("treatment") || abs.contains("therapy") {
        Some("Treatment Method")
    } else if abs.contains("diagnosis") {
        Some("Diagnosis Method")
    } else if either("analysis") {
        Some("Analysis")
    } else if title.contains("study") {
        Some("Study")
    } else {
        None
    };

    let mut text = if topics.is_empty() {
        FALLBACK.to_string()
    } else {
        let mut s = format!("This study is about {}.", topics.join(", "));
        if let Some(purpose) = purpose {
            s.push_str(&format!(" {purpose} research."));
        }
        s
    };

    let context: Vec<&str> = [
        ("patient", "Utilized patient data"),
        ("clinical", "Clinical study"),
        ("genetic", "Genetic approach"),
        ("therapeutic", "Therapeutic approach"),
    ]
    .into_iter()
    .filter(|(cue, _)| abs.contains(cue) || (*cue == "genetic" && abs.contains("genomic")))
    .map(|(_, label)| label)
    .collect();

    if !context.is_empty() {
        text.push_str(&format!(" Providing new insights through {}.", context.join(", ")));
    }

    truncate(&text, max_chars)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
