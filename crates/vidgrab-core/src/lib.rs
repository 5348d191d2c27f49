//! vidgrab-core – the data-shaping half of vidgrab.
//!
//! - [`platform`]: the fixed platform table and the URL validator shared by
//!   the server (authoritative) and the CLI (advisory).
//! - [`format`] / [`metadata`]: the raw `yt-dlp` schema and its normalization
//!   into the stable response contract.
//! - [`extract`]: the [`MetadataFetcher`] / [`MediaStreamer`] capabilities and
//!   the process-backed [`YtDlp`] binding.
//! - [`admission`]: bounded concurrency for external tool invocations.
//! - [`history`]: the client-local download history store.

pub mod admission;
pub mod error;
pub mod extract;
pub mod format;
pub mod history;
pub mod metadata;
pub mod platform;

pub use admission::{Admission, Permit};
pub use error::{ExtractError, HistoryError, ValidationError};
pub use extract::ytdlp::{ToolCommand, YtDlp};
pub use extract::{await_first_chunk, MediaSelection, MediaStream, MediaStreamer, MetadataFetcher};
pub use format::{FormatDescriptor, Quality};
pub use history::{DownloadHistory, HistoryItem, NewHistoryItem};
pub use metadata::{normalize, parse_tool_output, MediaMetadata, RawFormat, RawInfo};
pub use platform::{validate, Platform, ValidatedUrl};
