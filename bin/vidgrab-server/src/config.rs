//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use vidgrab_core::ToolCommand;

/// Runtime configuration for vidgrab-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3001"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, additionally write daily-rotated log files into this directory.
    pub log_dir: Option<String>,

    /// Comma-separated CORS origin allowlist. `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,

    /// Directory holding a built web client to serve for non-API paths.
    pub static_dir: Option<String>,

    /// How to launch yt-dlp.
    pub tool: ToolCommand,

    /// Maximum number of yt-dlp processes running at once.
    pub max_concurrent_jobs: usize,

    /// Upper bound for a metadata dump.
    pub metadata_timeout: Duration,

    /// Longest silence tolerated on a media stream.
    pub stream_idle_timeout: Duration,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("VIDGRAB_BIND", "0.0.0.0:3001"),
            log_level: env_or("VIDGRAB_LOG", "info"),
            log_json: env_flag("VIDGRAB_LOG_JSON", false),
            log_dir: env_opt("VIDGRAB_LOG_DIR"),
            cors_allowed_origins: env_opt("VIDGRAB_CORS_ORIGINS"),
            enable_swagger: env_flag("VIDGRAB_ENABLE_SWAGGER", true),
            static_dir: env_opt("VIDGRAB_STATIC_DIR"),
            tool: ToolCommand::new(
                env_or("VIDGRAB_YTDLP", "yt-dlp"),
                env_or("VIDGRAB_YTDLP_ARGS", "").split_whitespace(),
            ),
            max_concurrent_jobs: parse_env("VIDGRAB_MAX_CONCURRENT_JOBS", 4),
            metadata_timeout: Duration::from_secs(parse_env("VIDGRAB_METADATA_TIMEOUT_SECS", 60)),
            stream_idle_timeout: Duration::from_secs(parse_env(
                "VIDGRAB_STREAM_IDLE_TIMEOUT_SECS",
                120,
            )),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            enable_swagger: true,
            static_dir: None,
            tool: ToolCommand::default(),
            max_concurrent_jobs: 4,
            metadata_timeout: Duration::from_secs(60),
            stream_idle_timeout: Duration::from_secs(120),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
