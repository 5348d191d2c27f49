//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a `{"error": "..."}` JSON body with an appropriate status code.
//!
//! **Security note:** extraction failures are logged with full detail (exit
//! code, yt-dlp stderr) but only a fixed message is returned to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use vidgrab_core::ExtractError;

/// Message returned for every rejected URL, whatever the exact reason.
pub const INVALID_URL_MESSAGE: &str = "Invalid URL or unsupported platform";

/// All errors that can occur in the vidgrab-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing, malformed or unsupported URL. Nothing was spawned.
    #[error("input rejected: {0}")]
    InputRejected(String),

    /// The metadata dump failed or produced nothing parseable.
    #[error("extraction failed: {0}")]
    ExtractionFailed(#[source] ExtractError),

    /// The metadata dump produced JSON of the wrong shape.
    #[error("normalization failed: {0}")]
    NormalizationFailed(#[source] ExtractError),

    /// The media download failed before any byte was sent.
    #[error("download failed: {0}")]
    DownloadFailed(#[source] ExtractError),

    /// Every yt-dlp slot is taken.
    #[error("server busy: {0}")]
    Busy(#[source] ExtractError),
}

impl ServerError {
    /// Classify a failure of the metadata path.
    pub fn from_metadata(e: ExtractError) -> Self {
        match e {
            ExtractError::Busy { .. } => ServerError::Busy(e),
            ExtractError::Normalization(_) => ServerError::NormalizationFailed(e),
            other => ServerError::ExtractionFailed(other),
        }
    }

    /// Classify a failure of the download path.
    pub fn from_download(e: ExtractError) -> Self {
        match e {
            ExtractError::Busy { .. } => ServerError::Busy(e),
            other => ServerError::DownloadFailed(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InputRejected(_) => StatusCode::BAD_REQUEST,
            ServerError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::ExtractionFailed(_)
            | ServerError::NormalizationFailed(_)
            | ServerError::DownloadFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let client_message = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::InputRejected(m) => m.clone(),
            ServerError::Busy(e) => {
                warn!(error = %e, "rejecting request: extraction slots exhausted");
                "Server busy, please retry later".to_owned()
            }

            // Internal errors: log the full detail, return a fixed message.
            ServerError::ExtractionFailed(e) => {
                log_extract_error("yt-dlp metadata dump failed", e);
                "Failed to fetch video information".to_owned()
            }
            ServerError::NormalizationFailed(e) => {
                error!(error = %e, "yt-dlp metadata did not match the expected shape");
                "Failed to parse video information".to_owned()
            }
            ServerError::DownloadFailed(e) => {
                log_extract_error("yt-dlp download failed before streaming", e);
                "Download failed".to_owned()
            }
        };
        (self.status(), Json(json!({ "error": client_message }))).into_response()
    }
}

fn log_extract_error(context: &str, e: &ExtractError) {
    match e {
        ExtractError::Failed { code, stderr } => {
            error!(exit_code = ?code, stderr = %stderr, "{context}");
        }
        other => error!(error = %other, "{context}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn tool_diagnostics_are_not_leaked() {
        let err = ServerError::from_metadata(ExtractError::Failed {
            code: Some(1),
            stderr: "ERROR: /home/secret/cookies.txt not found".into(),
        });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Failed to fetch video information");
    }

    #[test]
    fn normalization_is_distinct_from_extraction() {
        let err = ServerError::from_metadata(ExtractError::Normalization("missing title".into()));
        assert!(matches!(err, ServerError::NormalizationFailed(_)));
        let err = ServerError::from_metadata(ExtractError::Unparseable("eof".into()));
        assert!(matches!(err, ServerError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn busy_maps_to_503() {
        let resp = ServerError::from_download(ExtractError::Busy { limit: 4 }).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn rejected_input_exposes_message() {
        let resp = ServerError::InputRejected(INVALID_URL_MESSAGE.into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], INVALID_URL_MESSAGE);
    }
}
