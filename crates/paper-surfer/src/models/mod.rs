//! Data models for collected records and run bookkeeping.
//!
//! Optional upstream fields are `Option<_>` with `#[serde(default)]`; the
//! identifier is the only field every record must carry.

mod enums;
mod record;
mod scored;
mod summary;

pub use enums::OutputFormat;
pub use record::MetadataRecord;
pub use scored::{Category, HIGH_THRESHOLD, KeywordMatches, MEDIUM_THRESHOLD, ScoredRecord};
pub use summary::{CategoryCounts, FailureStage, RecordFailure, RunSummary};
