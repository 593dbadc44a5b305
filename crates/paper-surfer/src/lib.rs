//! Paper Surfer
//!
//! Collects PubMed literature for a set of keywords, scores every record for
//! keyword relevance, and files the matches as documents in a
//! date-partitioned folder tree.
//!
//! # Features
//!
//! - **Relevance scoring**: weighted keyword matching with a required-keyword gate
//! - **Categories**: high / medium / low tiers, one directory each
//! - **Rate-limited**: Respects NCBI E-utilities limits (3 or 10 req/s)
//! - **Idempotent**: re-running a day's collection overwrites, never duplicates
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use paper_surfer::{
//!     Collector, Config, OutputWriter, PubMedClient, RunContext, Settings,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::default();
//!     let client = PubMedClient::new(Config::from_env()?)?;
//!     let writer = OutputWriter::new(&settings.output_root, settings.format);
//!     let keywords = settings.keywords.clone();
//!     let max_results = settings.max_results;
//!
//!     let collector = Collector::new(Arc::new(client), Arc::new(writer), settings);
//!     let summary = collector.run(&keywords, max_results, RunContext::now()).await?;
//!     println!("{} records written", summary.total_written());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod formatters;
pub mod models;
pub mod output;
pub mod relevance;
pub mod schedule;
pub mod settings;

pub use client::{LiteratureSource, PubMedClient};
pub use collector::{Collection, Collector, RunContext};
pub use config::Config;
pub use error::{ClientError, CollectError, ConfigError, OutputError};
pub use output::{OutputWriter, RecordSink};
pub use settings::Settings;
