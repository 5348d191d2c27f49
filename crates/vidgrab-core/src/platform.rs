//! Platform table and URL validation.
//!
//! [`validate`] is the single validator used on both sides of the wire: the
//! CLI calls it before contacting the server (advisory), and the server calls
//! it on every request before any external process is spawned
//! (authoritative). Both paths therefore agree case-for-case.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use url::Url;
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Display platform a media URL belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, ToSchema,
)]
pub enum Platform {
    #[strum(to_string = "YouTube")]
    #[serde(rename = "YouTube")]
    YouTube,
    #[strum(to_string = "Facebook")]
    #[serde(rename = "Facebook")]
    Facebook,
    #[strum(to_string = "Instagram")]
    #[serde(rename = "Instagram")]
    Instagram,
    #[strum(to_string = "TikTok")]
    #[serde(rename = "TikTok")]
    TikTok,
    #[strum(to_string = "LinkedIn")]
    #[serde(rename = "LinkedIn")]
    LinkedIn,
    #[strum(to_string = "X (Twitter)")]
    #[serde(rename = "X (Twitter)")]
    X,
}

/// Known hostname fragments, in match order. First containment hit wins.
pub const PLATFORM_TABLE: &[(&str, Platform)] = &[
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("facebook.com", Platform::Facebook),
    ("fb.watch", Platform::Facebook),
    ("instagram.com", Platform::Instagram),
    ("tiktok.com", Platform::TikTok),
    ("linkedin.com", Platform::LinkedIn),
    ("twitter.com", Platform::X),
    ("x.com", Platform::X),
    ("t.co", Platform::X),
];

/// Resolve a hostname against [`PLATFORM_TABLE`].
///
/// A single leading `www.` is stripped, then each table key is tested for
/// substring containment in declaration order.
pub fn platform_for_host(host: &str) -> Option<Platform> {
    let host = host.strip_prefix("www.").unwrap_or(host);
    PLATFORM_TABLE
        .iter()
        .find(|(domain, _)| host.contains(domain))
        .map(|(_, platform)| *platform)
}

/// A URL that passed [`validate`]. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    url: Url,
    platform: Platform,
}

impl ValidatedUrl {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Validate a user-supplied media URL.
///
/// ```
/// use vidgrab_core::{validate, Platform, ValidationError};
///
/// let ok = validate("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
/// assert_eq!(ok.platform(), Platform::YouTube);
///
/// assert_eq!(validate("not a url"), Err(ValidationError::InvalidFormat));
/// assert_eq!(
///     validate("https://example.com/video"),
///     Err(ValidationError::UnsupportedPlatform)
/// );
/// ```
pub fn validate(input: &str) -> Result<ValidatedUrl, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }

    let url = Url::parse(input).map_err(|_| ValidationError::InvalidFormat)?;
    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => return Err(ValidationError::InvalidFormat),
    };

    let platform = platform_for_host(host).ok_or(ValidationError::UnsupportedPlatform)?;
    Ok(ValidatedUrl { url, platform })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
