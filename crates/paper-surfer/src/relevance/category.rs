//! Score → category mapping and journal promotion.

use crate::models::Category;

/// Map a normalized score to its relevance tier.
///
/// `>= 0.7` is high, `>= 0.4` is medium, anything lower is low.
#[must_use]
pub fn categorize(score: f64) -> Category {
    Category::from_score(score)
}

/// Promote to `High` when the journal name contains one of `high_impact`
/// (case-insensitive). Other categories pass through unchanged.
#[must_use]
pub fn promote_for_journal(
    category: Category,
    journal: Option<&str>,
    high_impact: &[String],
) -> Category {
    let Some(journal) = journal.filter(|j| !j.trim().is_empty()) else {
        return category;
    };
    let journal = journal.to_lowercase();
    let hit = high_impact
        .iter()
        .map(|name| name.trim().to_lowercase())
        .any(|name| !name.is_empty() && journal.contains(&name));

    if hit { Category::High } else { category }
}
