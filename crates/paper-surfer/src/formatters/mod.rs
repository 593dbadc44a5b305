//! Document formatters for records and run summaries.

pub mod json;
pub mod markdown;

pub use json::{document_identifier, format_record_json, format_summary_json, record_document};
pub use markdown::{format_record_markdown, format_summary_markdown, front_matter_identifier};
