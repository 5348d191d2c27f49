//! Raw `yt-dlp` metadata and its normalization into [`MediaMetadata`].
//!
//! `normalize` is the whole contract between the extraction tool and the
//! client:
//!
//! 1. Resolve the platform from the original URL's hostname (once).
//! 2. Keep formats with a container extension that carry audio or video.
//! 3. Label each one `"{height}p"` or `"audio"`.
//! 4. Rank best-first, audio-only last, stable on ties.
//! 5. Pass the remaining fields through; absent optionals stay absent.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::error::ExtractError;
use crate::format::{rank_formats, FormatDescriptor, Quality, CODEC_NONE};
use crate::platform::{self, Platform};

/// The subset of `yt-dlp --dump-json` output vidgrab reads.
///
/// Unknown fields are ignored. `formats: null` and a missing `formats` key are
/// both treated as an empty list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInfo {
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<RawFormat>>,
}

/// One entry of the raw `formats` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
}

impl RawFormat {
    fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    /// A format survives when it has a container, an identifier the download
    /// call can select, and carries at least one of audio or video.
    fn is_selectable(&self) -> bool {
        let has_ext = self.ext.as_deref().is_some_and(|e| !e.is_empty());
        let has_id = self.format_id.as_deref().is_some_and(|id| !id.is_empty());
        has_ext && has_id && (self.has_audio() || self.has_video())
    }

    fn into_descriptor(self) -> Option<FormatDescriptor> {
        Some(FormatDescriptor {
            format_id: self.format_id?,
            ext: self.ext?,
            quality: Quality::from_height(self.height),
            filesize: self.filesize,
            acodec: self.acodec.unwrap_or_else(|| CODEC_NONE.to_owned()),
            vcodec: self.vcodec.unwrap_or_else(|| CODEC_NONE.to_owned()),
            format_note: self.format_note,
        })
    }
}

fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != CODEC_NONE)
}

/// Normalized metadata returned by `POST /api/info`.
///
/// `thumbnail`, `duration` and `uploader` are always present as keys (`null`
/// when the tool did not report them); the remaining optionals are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaMetadata {
    pub title: String,
    pub thumbnail: Option<String>,
    /// Seconds.
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    /// `YYYYMMDD`, as reported by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webpage_url: Option<String>,
    pub formats: Vec<FormatDescriptor>,
}

/// Parse the tool's captured standard output as a JSON document.
///
/// Output that is not JSON at all is an invocation failure
/// ([`ExtractError::Unparseable`]), not a normalization failure.
pub fn parse_tool_output(stdout: &[u8]) -> Result<serde_json::Value, ExtractError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Err(ExtractError::Unparseable("empty output".to_owned()));
    }
    serde_json::from_slice(stdout).map_err(|e| ExtractError::Unparseable(e.to_string()))
}

/// Map raw tool output onto the response contract.
pub fn normalize(raw: serde_json::Value, original_url: &str) -> Result<MediaMetadata, ExtractError> {
    let platform = platform::validate(original_url)
        .map_err(|e| ExtractError::Normalization(format!("original url: {e}")))?
        .platform();

    let info: RawInfo =
        serde_json::from_value(raw).map_err(|e| ExtractError::Normalization(e.to_string()))?;

    let mut formats: Vec<FormatDescriptor> = info
        .formats
        .unwrap_or_default()
        .into_iter()
        .filter(RawFormat::is_selectable)
        .filter_map(RawFormat::into_descriptor)
        .collect();
    rank_formats(&mut formats);

    Ok(MediaMetadata {
        title: info.title,
        thumbnail: info.thumbnail,
        duration: info.duration,
        uploader: info.uploader,
        platform,
        description: info.description,
        view_count: info.view_count,
        upload_date: info.upload_date,
        webpage_url: info.webpage_url,
        formats,
    })
}

// `yt-dlp` occasionally reports integral quantities as floats (`720.0`).
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(value.and_then(|n| n.as_f64()).filter(|n| n.is_finite() && *n >= 0.0))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.map(|n| n.min(u32::MAX as f64) as u32))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.map(|n| n as u64))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
