//! PubMed E-utilities client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - Request pacing (3 req/s, 10 req/s with an API key)
//! - Response caching keyed by request

mod source;
pub mod xml;

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;

pub use source::{DateWindow, FetchOutcome, LiteratureSource};
pub use xml::{clean_text, parse_efetch};

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};
use crate::models::MetadataRecord;

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

/// PubMed E-utilities client.
#[derive(Clone)]
pub struct PubMedClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Response bodies keyed by request hash. `None` when caching is off.
    cache: Option<Cache<String, String>>,

    /// Request pacing. `None` when pacing is off.
    limiter: Option<Arc<DefaultDirectRateLimiter>>,

    api_key: Option<String>,
    email: Option<String>,
    tool_name: String,
    base_url: String,

    /// Language names appended to every search term.
    languages: Vec<String>,
}

impl PubMedClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "application/json, application/xml;q=0.9".parse().expect("valid accept header"),
        );
        headers.insert(reqwest::header::USER_AGENT, config.tool_name.parse()?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = (config.cache_max_size > 0).then(|| {
            Cache::builder()
                .max_capacity(config.cache_max_size)
                .time_to_live(config.cache_ttl)
                .build()
        });

        let limiter = NonZeroU32::new(config.requests_per_second)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));

        Ok(Self {
            client,
            cache,
            limiter,
            api_key: config.api_key,
            email: config.email,
            tool_name: config.tool_name,
            base_url: config.base_url,
            languages: config.languages,
        })
    }

    /// Check if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// ESearch term for a keyword, with the language filter applied.
    #[must_use]
    pub fn search_term(&self, keyword: &str) -> String {
        let mut term = format!("\"{}\"[All Fields]", keyword.replace('"', ""));
        if !self.languages.is_empty() {
            let languages = self
                .languages
                .iter()
                .map(|lang| format!("\"{lang}\"[Language]"))
                .collect::<Vec<_>>()
                .join(" OR ");
            term.push_str(&format!(" AND ({languages})"));
        }
        term
    }

    /// Search PubMed for PMIDs matching a keyword, most relevant first.
    ///
    /// A `window` restricts the search to that publication-date range
    /// (`datetype=pdat`), so relevance ranking only sees recent papers.
    ///
    /// # Errors
    ///
    /// Returns error on API failure or an error reported in the response.
    pub async fn search_pmids(
        &self,
        keyword: &str,
        max_results: u32,
        window: Option<DateWindow>,
    ) -> ClientResult<Vec<String>> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("term".to_string(), self.search_term(keyword)),
            ("retmax".to_string(), max_results.to_string()),
            ("retmode".to_string(), "json".to_string()),
            ("sort".to_string(), "relevance".to_string()),
        ];
        if let Some(window) = window {
            params.extend(date_params(window));
        }
        params.extend(self.identity_params());

        let body = self.get_text(&url, &params).await?;
        let response: ESearchResponse = serde_json::from_str(&body)?;

        if let Some(message) = response.error {
            return Err(ClientError::bad_request(message));
        }
        let result = response
            .esearchresult
            .ok_or_else(|| ClientError::malformed("ESearch response without esearchresult"))?;
        if let Some(message) = result.error {
            return Err(ClientError::bad_request(message));
        }

        let mut ids = result.idlist;
        ids.truncate(max_results as usize);
        tracing::debug!(keyword = %keyword, count = ids.len(), window = ?window, "ESearch returned ids");
        Ok(ids)
    }

    /// Fetch full records for the given PMIDs in batches.
    ///
    /// Returns one outcome per requested id, in request order. Ids missing
    /// from the response are `NotFound`; a failed batch reports its error for
    /// every id it carried.
    pub async fn fetch_records(&self, pmids: &[String]) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::with_capacity(pmids.len());

        for chunk in pmids.chunks(api::EFETCH_BATCH_SIZE) {
            match self.fetch_chunk(chunk).await {
                Ok(records) => {
                    let mut by_id: HashMap<String, MetadataRecord> =
                        records.into_iter().map(|r| (r.identifier.clone(), r)).collect();
                    for id in chunk {
                        let outcome = by_id
                            .remove(id)
                            .ok_or_else(|| ClientError::not_found(format!("PMID {id}")));
                        outcomes.push((id.clone(), outcome));
                    }
                }
                Err(e) => {
                    tracing::warn!(batch = chunk.len(), error = %e, "EFetch batch failed");
                    for id in chunk {
                        outcomes.push((id.clone(), Err(ClientError::batch_failed(&e))));
                    }
                }
            }
        }

        outcomes
    }

    async fn fetch_chunk(&self, chunk: &[String]) -> ClientResult<Vec<MetadataRecord>> {
        let url = format!("{}/efetch.fcgi", self.base_url);
        let mut params = vec![
            ("db".to_string(), "pubmed".to_string()),
            ("id".to_string(), chunk.join(",")),
            ("retmode".to_string(), "xml".to_string()),
            ("rettype".to_string(), "abstract".to_string()),
        ];
        params.extend(self.identity_params());

        let body = self.get_text(&url, &params).await?;
        parse_efetch(&body)
    }

    /// `tool`, `email` and `api_key` parameters NCBI asks every caller to send.
    fn identity_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("tool".to_string(), self.tool_name.clone())];
        if let Some(ref email) = self.email {
            params.push(("email".to_string(), email.clone()));
        }
        if let Some(ref key) = self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }
        params
    }

    /// Make a GET request and return the body.
    async fn get_text(&self, url: &str, params: &[(String, String)]) -> ClientResult<String> {
        let cache_key = self.cache_key("GET", url, params);
        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get(&cache_key).await {
                return Ok(cached);
            }
        }

        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }

        let response = self.client.get(url).query(params).send().await?;
        let response = self.handle_response(response).await?;
        let body = response.text().await?;

        if let Some(ref cache) = self.cache {
            cache.insert(cache_key, body.clone()).await;
        }
        Ok(body)
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::bad_request(text))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }

    /// Generate cache key. The API key is left out.
    fn cache_key(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(method.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");

        for (k, v) in params.iter().filter(|(k, _)| k != "api_key") {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }

        format!("{:x}", hasher.finalize())
    }
}

/// ESearch publication-date range, both ends inclusive.
fn date_params(window: DateWindow) -> [(String, String); 3] {
    [
        ("datetype".to_string(), "pdat".to_string()),
        ("mindate".to_string(), window.from.format("%Y/%m/%d").to_string()),
        ("maxdate".to_string(), window.to.format("%Y/%m/%d").to_string()),
    ]
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    async fn search(
        &self,
        keyword: &str,
        max_results: u32,
        window: Option<DateWindow>,
    ) -> ClientResult<Vec<String>> {
        self.search_pmids(keyword, max_results, window).await
    }

    async fn fetch(&self, identifier: &str) -> ClientResult<MetadataRecord> {
        let ids = [identifier.to_string()];
        match self.fetch_records(&ids).await.pop() {
            Some((_, outcome)) => outcome,
            None => Err(ClientError::not_found(format!("PMID {identifier}"))),
        }
    }

    async fn fetch_many(&self, identifiers: &[String]) -> Vec<FetchOutcome> {
        self.fetch_records(identifiers).await
    }
}

impl std::fmt::Debug for PubMedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubMedClient")
            .field("has_api_key", &self.has_api_key())
            .field("base_url", &self.base_url)
            .field("paced", &self.limiter.is_some())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
