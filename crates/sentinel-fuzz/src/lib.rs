//! Fuzzing library for paper-surfer.
//!
//! This crate provides fuzzing targets for the EFetch XML parser and the
//! settings file parser.
//!
//! # Usage
//!
//! ```bash
//! cd crates/sentinel-fuzz
//! cargo +nightly fuzz run fuzz_efetch_parse -- -max_total_time=60
//! ```

pub use paper_surfer::client::xml;
pub use paper_surfer::settings;
