//! Relevance assessment: scoring, categorization and synopsis.
//!
//! Everything here is a pure function of the record and an immutable
//! configuration value.

mod category;
mod scorer;
mod synopsis;

pub use category::{categorize, promote_for_journal};
pub use scorer::{DEFAULT_NORMALIZER, FieldHits, Relevance, Scorer, ScoringConfig};
pub use synopsis::synopsis;
