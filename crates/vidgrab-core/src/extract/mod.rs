//! Extraction capabilities.
//!
//! [`MetadataFetcher`] and [`MediaStreamer`] describe what the server needs
//! from an extraction backend. [`ytdlp::YtDlp`] binds both to an external
//! `yt-dlp` process; tests inject in-memory fakes instead.

pub mod ytdlp;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::ExtractError;
use crate::platform::ValidatedUrl;

/// Incrementally produced media bytes.
///
/// An `Err` item ends the stream: the producer failed after (or before) the
/// preceding chunks were delivered.
pub type MediaStream = Pin<Box<dyn Stream<Item = Result<Bytes, ExtractError>> + Send>>;

/// What to ask the tool for on a media download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSelection {
    /// Audio-only extraction, transcoded to the fixed audio container.
    AudioOnly,
    /// Exactly this tool-assigned format.
    Format(String),
    /// Whatever the tool selects by default.
    ToolDefault,
}

impl MediaSelection {
    /// `audio_only` wins over any supplied format id; blank ids mean default.
    pub fn from_request(format_id: Option<&str>, audio_only: bool) -> Self {
        if audio_only {
            return MediaSelection::AudioOnly;
        }
        match format_id.map(str::trim) {
            Some(id) if !id.is_empty() => MediaSelection::Format(id.to_owned()),
            _ => MediaSelection::ToolDefault,
        }
    }

    /// Extension of the produced container, when it is known up front.
    pub fn audio_container(&self) -> Option<&'static str> {
        match self {
            MediaSelection::AudioOnly => Some(ytdlp::AUDIO_FORMAT),
            _ => None,
        }
    }
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch the raw metadata document for a single item (never a playlist).
    async fn fetch_metadata(&self, url: &ValidatedUrl) -> Result<serde_json::Value, ExtractError>;
}

#[async_trait]
pub trait MediaStreamer: Send + Sync {
    /// Start producing media bytes for a single item (never a playlist).
    ///
    /// Returns once the producer is running; bytes arrive through the
    /// returned stream as they become available.
    async fn stream_media(
        &self,
        url: &ValidatedUrl,
        selection: &MediaSelection,
    ) -> Result<MediaStream, ExtractError>;
}

/// Wait for the first item of `stream`.
///
/// A failure before any byte is surfaced as `Err`, so the caller can still
/// answer with a proper error status. Otherwise the returned stream replays
/// the first chunk followed by the rest.
pub async fn await_first_chunk(mut stream: MediaStream) -> Result<MediaStream, ExtractError> {
    match stream.next().await {
        Some(Ok(first)) => {
            let head = futures::stream::once(async move { Ok::<_, ExtractError>(first) });
            Ok(Box::pin(head.chain(stream)))
        }
        Some(Err(e)) => Err(e),
        None => Ok(Box::pin(futures::stream::empty())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stream_of(items: Vec<Result<Bytes, ExtractError>>) -> MediaStream {
        Box::pin(futures::stream::iter(items))
    }

    #[test]
    fn audio_only_ignores_format_id() {
        assert_eq!(
            MediaSelection::from_request(Some("137"), true),
            MediaSelection::AudioOnly
        );
        assert_eq!(
            MediaSelection::from_request(Some("137"), false),
            MediaSelection::Format("137".into())
        );
        assert_eq!(MediaSelection::from_request(None, false), MediaSelection::ToolDefault);
        assert_eq!(MediaSelection::from_request(Some("  "), false), MediaSelection::ToolDefault);
    }

    #[tokio::test]
    async fn early_failure_is_reported_before_any_bytes() {
        let stream = stream_of(vec![Err(ExtractError::Failed {
            code: Some(1),
            stderr: "ERROR: video unavailable".into(),
        })]);
        let err = await_first_chunk(stream).await.err().expect("should fail");
        assert!(matches!(err, ExtractError::Failed { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn first_chunk_is_replayed() {
        let stream = stream_of(vec![
            Ok(Bytes::from_static(b"one")),
            Ok(Bytes::from_static(b"two")),
            Err(ExtractError::Failed { code: Some(1), stderr: String::new() }),
        ]);
        let primed = await_first_chunk(stream).await.unwrap();
        let items: Vec<_> = primed.collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), &Bytes::from_static(b"one"));
        assert_eq!(items[1].as_ref().unwrap(), &Bytes::from_static(b"two"));
        assert!(items[2].is_err());
    }

    #[tokio::test]
    async fn empty_success_yields_empty_stream() {
        let primed = await_first_chunk(stream_of(vec![])).await.unwrap();
        let items: Vec<_> = primed.collect().await;
        assert!(items.is_empty());
    }
}
