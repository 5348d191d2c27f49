//! Metadata and download relay endpoints.
//!
//! Both handlers run the authoritative URL check before anything is spawned,
//! then take one admission permit for the lifetime of the yt-dlp process.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::TryStreamExt;
use tracing::{debug, error, info};
use utoipa::OpenApi;
use validator::Validate;
use vidgrab_core::{
    await_first_chunk, normalize, validate, ExtractError, FormatDescriptor, MediaMetadata,
    MediaSelection, Platform, ValidatedUrl,
};

use crate::error::{ServerError, INVALID_URL_MESSAGE};
use crate::schemas::media::{DownloadRequest, ErrorResponse, InfoRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_info, download),
    components(schemas(
        InfoRequest,
        DownloadRequest,
        ErrorResponse,
        MediaMetadata,
        FormatDescriptor,
        Platform,
    )),
)]
pub struct MediaApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/info", post(get_info))
        .route("/download", post(download))
}

/// Validate a request URL against the platform table.
///
/// All rejection reasons collapse into one client-facing message.
fn authorize(url: &str) -> Result<ValidatedUrl, ServerError> {
    validate(url).map_err(|reason| {
        debug!(%reason, "rejecting url");
        ServerError::InputRejected(INVALID_URL_MESSAGE.to_owned())
    })
}

/// Unwrap a JSON body and run its field validators.
fn accept<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    let Json(req) = payload.map_err(|e| {
        debug!(error = %e, "rejecting unreadable request body");
        ServerError::InputRejected(INVALID_URL_MESSAGE.to_owned())
    })?;
    req.validate().map_err(|e| {
        debug!(error = %e, "rejecting invalid request body");
        ServerError::InputRejected(INVALID_URL_MESSAGE.to_owned())
    })?;
    Ok(req)
}

/// Fetch and normalize metadata for one media item (`POST /api/info`).
#[utoipa::path(
    post,
    path = "/api/info",
    tag = "media",
    request_body = InfoRequest,
    responses(
        (status = 200, description = "Normalized metadata", body = MediaMetadata),
        (status = 400, description = "Invalid URL or unsupported platform", body = ErrorResponse),
        (status = 500, description = "yt-dlp failed or returned unexpected output", body = ErrorResponse),
        (status = 503, description = "Too many concurrent extractions", body = ErrorResponse),
    )
)]
pub async fn get_info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> Result<Json<MediaMetadata>, ServerError> {
    let req = accept(payload)?;
    let url = authorize(&req.url)?;

    let _permit = state
        .admission
        .try_acquire()
        .map_err(ServerError::from_metadata)?;

    let timeout = state.config.metadata_timeout;
    let raw = tokio::time::timeout(timeout, state.fetcher.fetch_metadata(&url))
        .await
        .map_err(|_| ServerError::from_metadata(ExtractError::Timeout(timeout)))?
        .map_err(ServerError::from_metadata)?;

    let metadata = normalize(raw, url.as_str()).map_err(ServerError::from_metadata)?;

    info!(
        url = %url,
        platform = %metadata.platform,
        formats = metadata.formats.len(),
        "metadata ready"
    );
    Ok(Json(metadata))
}

/// Stream a media download (`POST /api/download`).
///
/// Headers are only sent once yt-dlp has produced its first chunk, so a
/// failure up to that point is still answered with a JSON error. After that
/// a failure can only cut the body short.
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "media",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Raw media bytes (application/octet-stream, attachment)"),
        (status = 400, description = "Invalid URL or unsupported platform", body = ErrorResponse),
        (status = 500, description = "Download failed before any byte was sent", body = ErrorResponse),
        (status = 503, description = "Too many concurrent extractions", body = ErrorResponse),
    )
)]
pub async fn download(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let req = accept(payload)?;
    let url = authorize(&req.url)?;
    let selection =
        MediaSelection::from_request(req.format_id.as_deref(), req.audio_only.unwrap_or(false));

    let permit = state
        .admission
        .try_acquire()
        .map_err(ServerError::from_download)?;

    let stream = state
        .streamer
        .stream_media(&url, &selection)
        .await
        .map_err(ServerError::from_download)?;

    let idle = state.config.stream_idle_timeout;
    let stream = tokio::time::timeout(idle, await_first_chunk(stream))
        .await
        .map_err(|_| ServerError::from_download(ExtractError::Timeout(idle)))?
        .map_err(ServerError::from_download)?;

    info!(url = %url, selection = ?selection, "streaming download");

    let trace_url = url.to_string();
    let body = Body::from_stream(permit.attach(stream).inspect_err(move |e| {
        // Headers are gone; the client only sees a truncated body.
        error!(url = %trace_url, error = %e, "download aborted mid-stream");
    }));

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_DISPOSITION, "attachment"),
        ],
        body,
    )
        .into_response())
}
