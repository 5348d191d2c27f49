//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use vidgrab_core::{Admission, MediaStreamer, MetadataFetcher, YtDlp};

use crate::config::Config;

/// State shared across all HTTP handlers.
///
/// The extraction backend is held behind the capability traits so tests can
/// swap the yt-dlp binding for in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn MetadataFetcher>,
    pub streamer: Arc<dyn MediaStreamer>,
    /// Caps concurrent yt-dlp processes.
    pub admission: Admission,
}

impl AppState {
    /// State wired to a real yt-dlp process binding.
    pub fn from_config(config: Config) -> Self {
        let ytdlp = Arc::new(
            YtDlp::new(config.tool.clone())
                .with_metadata_timeout(config.metadata_timeout)
                .with_idle_timeout(config.stream_idle_timeout),
        );
        Self {
            admission: Admission::new(config.max_concurrent_jobs),
            config: Arc::new(config),
            fetcher: ytdlp.clone(),
            streamer: ytdlp,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}
