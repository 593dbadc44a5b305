//! Pre-scoring record filters: publication date window and abstract length.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::MetadataRecord;

/// Longest accepted lookback window.
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

/// Record filters applied before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Keep only records published at most this many days before the run
    /// date. `None` disables the date filter.
    pub lookback_days: Option<u32>,

    /// Minimum abstract length in characters (0 disables the check).
    pub min_abstract_length: usize,
}

/// Default minimum abstract length.
pub const DEFAULT_MIN_ABSTRACT_LENGTH: usize = 50;

impl Default for FilterConfig {
    fn default() -> Self {
        Self { lookback_days: Some(30), min_abstract_length: DEFAULT_MIN_ABSTRACT_LENGTH }
    }
}

/// Why a record was dropped before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Passed every filter.
    Keep,
    /// Published before the lookback window.
    OutOfWindow,
    /// Abstract shorter than the minimum.
    TooShort,
}

impl FilterConfig {
    /// Reject a zero or absurdly long lookback window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.lookback_days {
            Some(0) => Err(ConfigError::invalid(
                "filter.lookback_days",
                "must be at least 1 (use null to disable the date filter)",
            )),
            Some(days) if days > MAX_LOOKBACK_DAYS => Err(ConfigError::invalid(
                "filter.lookback_days",
                format!("must be at most {MAX_LOOKBACK_DAYS}, got {days}"),
            )),
            _ => Ok(()),
        }
    }

    /// First day inside the window, inclusive.
    #[must_use]
    pub fn window_start(&self, run_date: NaiveDate) -> Option<NaiveDate> {
        let days = self.lookback_days?;
        run_date.checked_sub_days(Days::new(u64::from(days)))
    }

    /// Apply the filters to one record.
    ///
    /// A record without a parseable publication date is kept; a partial date
    /// is treated as the last day it could denote.
    #[must_use]
    pub fn check(&self, record: &MetadataRecord, run_date: NaiveDate) -> Verdict {
        if let Some(start) = self.window_start(run_date) {
            let published = record.publication_date.as_deref().and_then(latest_day);
            if published.is_some_and(|day| day < start) {
                return Verdict::OutOfWindow;
            }
        }

        if self.min_abstract_length > 0
            && record.abstract_text().trim().chars().count() < self.min_abstract_length
        {
            return Verdict::TooShort;
        }

        Verdict::Keep
    }
}

/// Last calendar day a `YYYY[-MM[-DD]]` date can denote.
///
/// `/` is accepted as a separator too.
#[must_use]
pub fn latest_day(date: &str) -> Option<NaiveDate> {
    let mut parts = date.trim().split(['-', '/']);
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month = parts.next().map(|m| m.trim().parse::<u32>()).transpose().ok()?;
    let day = parts.next().map(|d| d.trim().parse::<u32>()).transpose().ok()?;
    if parts.next().is_some() {
        return None;
    }

    match (month, day) {
        (Some(m), Some(d)) => NaiveDate::from_ymd_opt(year, m, d),
        (Some(m), None) => NaiveDate::from_ymd_opt(year, m, 1)?
            .checked_add_months(Months::new(1))?
            .pred_opt(),
        (None, _) => NaiveDate::from_ymd_opt(year, 12, 31),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn published(date: Option<&str>) -> MetadataRecord {
        MetadataRecord {
            publication_date: date.map(str::to_string),
            r#abstract: Some("x".repeat(60)),
            ..MetadataRecord::new("1")
        }
    }

    #[test]
    fn test_latest_day() {
        assert_eq!(latest_day("2024-03-05"), Some(day(2024, 3, 5)));
        assert_eq!(latest_day("2024-02"), Some(day(2024, 2, 29)));
        assert_eq!(latest_day("2023-12"), Some(day(2023, 12, 31)));
        assert_eq!(latest_day("2024"), Some(day(2024, 12, 31)));
        assert_eq!(latest_day("2024/01/09"), Some(day(2024, 1, 9)));
        assert_eq!(latest_day("Spring 2024"), None);
        assert_eq!(latest_day("2024-13"), None);
        assert_eq!(latest_day(""), None);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let filter = FilterConfig { lookback_days: Some(30), min_abstract_length: 0 };
        let run = day(2026, 10, 16);
        assert_eq!(filter.window_start(run), Some(day(2026, 9, 16)));

        assert_eq!(filter.check(&published(Some("2026-09-16")), run), Verdict::Keep);
        assert_eq!(filter.check(&published(Some("2026-09-15")), run), Verdict::OutOfWindow);
        assert_eq!(filter.check(&published(Some("2026-09")), run), Verdict::Keep);
        assert_eq!(filter.check(&published(Some("2026-08")), run), Verdict::OutOfWindow);
    }

    #[test]
    fn test_undated_records_are_kept() {
        let filter = FilterConfig::default();
        let run = day(2026, 10, 16);
        assert_eq!(filter.check(&published(None), run), Verdict::Keep);
        assert_eq!(filter.check(&published(Some("n.d.")), run), Verdict::Keep);
    }

    #[test]
    fn test_disabled_window() {
        let filter = FilterConfig { lookback_days: None, min_abstract_length: 0 };
        assert_eq!(filter.check(&published(Some("1990")), day(2026, 1, 1)), Verdict::Keep);
    }

    #[test]
    fn test_min_abstract_length() {
        let filter = FilterConfig { lookback_days: None, min_abstract_length: 100 };
        assert_eq!(filter.check(&published(None), day(2026, 1, 1)), Verdict::TooShort);
        let filter = FilterConfig { lookback_days: None, min_abstract_length: 60 };
        assert_eq!(filter.check(&published(None), day(2026, 1, 1)), Verdict::Keep);
    }

    #[test]
    fn test_validate() {
        assert!(FilterConfig::default().validate().is_ok());
        assert!(FilterConfig { lookback_days: Some(0), ..Default::default() }.validate().is_err());
        assert!(FilterConfig { lookback_days: None, ..Default::default() }.validate().is_ok());
        assert!(
            FilterConfig { lookback_days: Some(MAX_LOOKBACK_DAYS + 1), ..Default::default() }
                .validate()
                .is_err()
        );
    }
}
