//! Weekly schedule for repeated collection runs.

use std::time::Duration;

use chrono::{Datelike, Days, Local, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::collector::{Collector, RunContext};
use crate::error::{CollectError, ConfigError};

/// Schedule as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Whether `schedule` mode is allowed to run.
    pub enabled: bool,
    /// Day names (`"sunday"`, `"Mon"`, ...).
    pub days: Vec<String>,
    /// Local time of day, `HH:MM`.
    pub time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { enabled: true, days: vec!["sunday".to_string()], time: "09:00".to_string() }
    }
}

/// Parsed weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Days the run fires on.
    pub days: Vec<Weekday>,
    /// Local time of day the run fires at.
    pub time: NaiveTime,
}

impl Schedule {
    /// Parse day names (case-insensitive) and an `HH:MM` time.
    pub fn parse(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        let mut days = Vec::new();
        for name in &config.days {
            let day: Weekday = name
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("schedule.days", format!("unknown day '{name}'")))?;
            if !days.contains(&day) {
                days.push(day);
            }
        }
        if days.is_empty() {
            return Err(ConfigError::invalid("schedule.days", "at least one day is required"));
        }

        let time = NaiveTime::parse_from_str(config.time.trim(), "%H:%M").map_err(|e| {
            ConfigError::invalid("schedule.time", format!("'{}' is not HH:MM: {e}", config.time))
        })?;

        Ok(Self { days, time })
    }

    /// The first scheduled slot strictly after `now`.
    #[must_use]
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        (0..=7)
            .filter_map(|offset| now.date().checked_add_days(Days::new(offset)))
            .filter(|date| self.days.contains(&date.weekday()))
            .map(|date| date.and_time(self.time))
            .find(|slot| *slot > now)
            .unwrap_or_else(|| now + chrono::Duration::days(7))
    }
}

/// Run the collector at every scheduled slot until Ctrl-C.
///
/// Upstream and filesystem failures inside a run are reported in its summary
/// and never stop the loop; a configuration error does.
pub async fn run_scheduled(
    collector: &Collector,
    schedule: &Schedule,
    keywords: &[String],
    max_results: u32,
) -> Result<(), CollectError> {
    tracing::info!(days = ?schedule.days, time = %schedule.time, "Scheduler started");

    loop {
        let now = Local::now().naive_local();
        let next = schedule.next_run_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!(next_run = %next, wait_secs = wait.as_secs(), "Waiting for next run");

        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping scheduler");
                return Ok(());
            }
        }

        let summary = collector.run(keywords, max_results, RunContext::now()).await?;
        tracing::info!(
            run_date = %summary.run_date,
            written = summary.total_written(),
            skipped = summary.skipped(),
            errored = summary.errored(),
            "Scheduled run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn sunday_nine() -> Schedule {
        Schedule::parse(&ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let schedule = sunday_nine();
        assert_eq!(schedule.days, vec![Weekday::Sun]);
        assert_eq!(schedule.time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_is_case_insensitive_and_dedups() {
        let config = ScheduleConfig {
            enabled: true,
            days: vec!["Monday".into(), "fri".into(), "MONDAY".into()],
            time: "18:30".into(),
        };
        let schedule = Schedule::parse(&config).unwrap();
        assert_eq!(schedule.days, vec![Weekday::Mon, Weekday::Fri]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let bad_day = ScheduleConfig { days: vec!["someday".into()], ..Default::default() };
        assert!(Schedule::parse(&bad_day).is_err());

        let no_days = ScheduleConfig { days: vec![], ..Default::default() };
        assert!(Schedule::parse(&no_days).is_err());

        let bad_time = ScheduleConfig { time: "25:00".into(), ..Default::default() };
        assert!(Schedule::parse(&bad_time).is_err());
    }

    #[test]
    fn test_next_run_later_same_day() {
        // 2026-10-18 is a Sunday
        let next = sunday_nine().next_run_after(at(2026, 10, 18, 8, 59));
        assert_eq!(next, at(2026, 10, 18, 9, 0));
    }

    #[test]
    fn test_next_run_is_strictly_later() {
        let next = sunday_nine().next_run_after(at(2026, 10, 18, 9, 0));
        assert_eq!(next, at(2026, 10, 25, 9, 0));
    }

    #[test]
    fn test_next_run_midweek() {
        let next = sunday_nine().next_run_after(at(2026, 10, 16, 12, 0));
        assert_eq!(next, at(2026, 10, 18, 9, 0));
    }
}
