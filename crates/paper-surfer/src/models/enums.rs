//! Enum types shared by settings and the CLI.

use serde::{Deserialize, Serialize};

/// Document format for written records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown with a front-matter block.
    #[default]
    Markdown,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}
