use std::time::Duration;

use thiserror::Error;

/// Why a user-supplied URL was rejected.
///
/// The `Display` strings are user-facing: the CLI prints them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Blank or whitespace-only input.
    #[error("URL is required")]
    Empty,

    /// Not an absolute URL with a hostname.
    #[error("invalid URL format")]
    InvalidFormat,

    /// Hostname matches no entry of the platform table.
    #[error("unsupported platform")]
    UnsupportedPlatform,
}

/// Failures of the extraction pipeline (tool invocation + normalization).
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The external tool could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited with a non-zero status.
    #[error("extraction tool exited with status {code:?}")]
    Failed { code: Option<i32>, stderr: String },

    /// Standard output was not a JSON document.
    #[error("extraction tool produced no parseable output: {0}")]
    Unparseable(String),

    /// JSON was produced but did not have the expected metadata shape.
    #[error("unexpected metadata shape: {0}")]
    Normalization(String),

    /// The tool did not finish (metadata) or went silent (media) in time.
    #[error("extraction tool timed out after {0:?}")]
    Timeout(Duration),

    /// Every admission permit is taken.
    #[error("too many concurrent extractions (limit {limit})")]
    Busy { limit: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the download-history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history i/o error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
}
