//! The search and fetch collaborator seen by the collector.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ClientResult;
use crate::models::MetadataRecord;

/// Per-identifier outcome of a batched fetch, in request order.
pub type FetchOutcome = (String, ClientResult<MetadataRecord>);

/// Inclusive publication-date range a search is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// A literature database that can be searched by keyword and fetched by id.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Candidate identifiers for a keyword, at most `max_results`.
    ///
    /// With a `window`, only records published inside it are asked for.
    /// Callers still filter dates themselves since upstream date data is
    /// often partial.
    async fn search(
        &self,
        keyword: &str,
        max_results: u32,
        window: Option<DateWindow>,
    ) -> ClientResult<Vec<String>>;

    /// Fetch one record.
    async fn fetch(&self, identifier: &str) -> ClientResult<MetadataRecord>;

    /// Fetch several records. One outcome per requested id, same order.
    async fn fetch_many(&self, identifiers: &[String]) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            outcomes.push((id.clone(), self.fetch(id).await));
        }
        outcomes
    }
}
