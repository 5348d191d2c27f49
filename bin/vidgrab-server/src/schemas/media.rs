use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct InfoRequest {
    /// Link to a video on a supported platform.
    #[serde(default)]
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct DownloadRequest {
    /// Link to a video on a supported platform.
    #[serde(default)]
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    /// A `format_id` from `/api/info`. Ignored when `audio_only` is set.
    #[serde(default)]
    #[validate(length(max = 128))]
    pub format_id: Option<String>,
    /// Extract the audio track as mp3.
    #[serde(default)]
    pub audio_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"OK"`.
    pub status: String,
    /// ISO-8601 server time.
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
