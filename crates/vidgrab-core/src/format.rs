//! Format descriptors and their quality ranking.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Codec sentinel used by `yt-dlp` (and by us) for "no such stream".
pub const CODEC_NONE: &str = "none";

/// Quality of a format, ordered from worst to best.
///
/// `AudioOnly` is below every `Numeric` height, and heights compare
/// numerically. Listing formats best-first is therefore a descending sort,
/// which puts audio-only entries strictly last.
///
/// On the wire a quality is the label `"{height}p"` or `"audio"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Quality {
    Numeric(u32),
    AudioOnly,
}

impl Quality {
    /// Quality for a raw `height` field. Missing or zero heights carry no
    /// video and rank as audio.
    pub fn from_height(height: Option<u32>) -> Self {
        match height {
            Some(h) if h > 0 => Quality::Numeric(h),
            _ => Quality::AudioOnly,
        }
    }

    pub fn height(&self) -> Option<u32> {
        match self {
            Quality::Numeric(h) => Some(*h),
            Quality::AudioOnly => None,
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, Quality::AudioOnly)
    }
}

impl Ord for Quality {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Quality::Numeric(a), Quality::Numeric(b)) => a.cmp(b),
            (Quality::Numeric(_), Quality::AudioOnly) => Ordering::Greater,
            (Quality::AudioOnly, Quality::Numeric(_)) => Ordering::Less,
            (Quality::AudioOnly, Quality::AudioOnly) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Quality {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Numeric(h) => write!(f, "{h}p"),
            Quality::AudioOnly => f.write_str("audio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid quality label `{0}`")]
pub struct ParseQualityError(String);

impl FromStr for Quality {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "audio" {
            return Ok(Quality::AudioOnly);
        }
        s.strip_suffix('p')
            .and_then(|h| h.parse::<u32>().ok())
            .filter(|h| *h > 0)
            .map(Quality::Numeric)
            .ok_or_else(|| ParseQualityError(s.to_owned()))
    }
}

impl From<Quality> for String {
    fn from(q: Quality) -> Self {
        q.to_string()
    }
}

impl TryFrom<String> for Quality {
    type Error = ParseQualityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One selectable encoding variant of a media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FormatDescriptor {
    /// Tool-assigned identifier, passed back verbatim on download.
    pub format_id: String,
    /// Container extension, e.g. `"mp4"`.
    pub ext: String,
    /// `"{height}p"` or `"audio"`.
    #[schema(value_type = String, example = "1080p")]
    pub quality: Quality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    /// Audio codec, or `"none"`.
    pub acodec: String,
    /// Video codec, or `"none"`.
    pub vcodec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_note: Option<String>,
}

/// Sort best-first: descending height, audio-only last, ties in input order.
pub fn rank_formats(formats: &mut [FormatDescriptor]) {
    // `sort_by` is stable.
    formats.sort_by(|a, b| b.quality.cmp(&a.quality));
}
