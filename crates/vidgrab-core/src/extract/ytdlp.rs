//! `yt-dlp` process binding.
//!
//! Every call spawns exactly one child process and owns it for its whole
//! lifetime. Children are spawned with `kill_on_drop`, so dropping the
//! metadata future (timeout) or the media stream (client went away) kills
//! the process instead of leaving orphaned work behind.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, info, warn};

use super::{MediaSelection, MediaStream, MediaStreamer, MetadataFetcher};
use crate::error::ExtractError;
use crate::metadata::parse_tool_output;
use crate::platform::ValidatedUrl;

/// Container produced by audio-only extraction.
pub const AUDIO_FORMAT: &str = "mp3";

const CHUNK_SIZE: usize = 64 * 1024;
const STDERR_TAIL_BYTES: usize = 4 * 1024;
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// How to launch the tool: a program plus leading arguments.
///
/// The default is a plain `yt-dlp` on `PATH`; `python -m yt_dlp` is
/// `ToolCommand::new("python", ["-m", "yt_dlp"])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub base_args: Vec<String>,
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_owned(),
            base_args: Vec::new(),
        }
    }
}

impl ToolCommand {
    pub fn new<I, S>(program: impl Into<String>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> ExtractError {
        ExtractError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

/// Arguments for a single-item JSON metadata dump.
pub fn metadata_args(url: &str) -> Vec<String> {
    ["--dump-json", "--no-playlist", "--", url]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Arguments for a single-item media download written to standard output.
///
/// The URL always follows `--`, and a format id is a single argv element,
/// so neither can be interpreted as an option.
pub fn media_args(url: &str, selection: &MediaSelection) -> Vec<String> {
    let mut args: Vec<String> = ["--no-playlist", "--no-progress", "-o", "-"]
        .into_iter()
        .map(str::to_owned)
        .collect();

    match selection {
        MediaSelection::AudioOnly => {
            args.extend(["-x".to_owned(), "--audio-format".to_owned(), AUDIO_FORMAT.to_owned()]);
        }
        MediaSelection::Format(id) => {
            args.extend(["-f".to_owned(), id.clone()]);
        }
        MediaSelection::ToolDefault => {}
    }

    args.extend(["--".to_owned(), url.to_owned()]);
    args
}

/// [`MetadataFetcher`] + [`MediaStreamer`] backed by an external `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlp {
    tool: ToolCommand,
    metadata_timeout: Duration,
    idle_timeout: Duration,
}

impl YtDlp {
    pub fn new(tool: ToolCommand) -> Self {
        Self {
            tool,
            metadata_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(120),
        }
    }

    /// Upper bound for a whole metadata dump.
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Longest silence tolerated on the media stream before giving up.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.tool
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(ToolCommand::default())
    }
}

#[async_trait]
impl MetadataFetcher for YtDlp {
    async fn fetch_metadata(&self, url: &ValidatedUrl) -> Result<serde_json::Value, ExtractError> {
        let args = metadata_args(url.as_str());
        let child = self
            .tool
            .command(&args)
            .spawn()
            .map_err(|e| self.tool.spawn_error(e))?;
        debug!(url = %url, pid = ?child.id(), "metadata dump started");

        // On timeout the future is dropped together with the child, which
        // kills it.
        let output = tokio::time::timeout(self.metadata_timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(url = %url, timeout = ?self.metadata_timeout, "metadata dump timed out");
                ExtractError::Timeout(self.metadata_timeout)
            })??;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if !output.status.success() {
            return Err(ExtractError::Failed {
                code: output.status.code(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            debug!(url = %url, stderr = %stderr, "yt-dlp diagnostics");
        }

        info!(url = %url, bytes = output.stdout.len(), "metadata dump finished");
        parse_tool_output(&output.stdout)
    }
}

#[async_trait]
impl MediaStreamer for YtDlp {
    async fn stream_media(
        &self,
        url: &ValidatedUrl,
        selection: &MediaSelection,
    ) -> Result<MediaStream, ExtractError> {
        let args = media_args(url.as_str(), selection);
        let mut child = self
            .tool
            .command(&args)
            .spawn()
            .map_err(|e| self.tool.spawn_error(e))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Io(std::io::Error::other("stdout was not captured")))?;
        let stderr_task = child.stderr.take().map(|s| tokio::spawn(drain_stderr(s)));

        info!(url = %url, selection = ?selection, pid = ?child.id(), "media stream started");

        let idle = self.idle_timeout;
        let url = url.to_string();
        let stream = async_stream::stream! {
            // The stream owns the child: dropping the stream kills it.
            let mut child = child;
            let mut forwarded: u64 = 0;

            loop {
                let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
                match tokio::time::timeout(idle, stdout.read_buf(&mut buf)).await {
                    Err(_) => {
                        warn!(url = %url, forwarded, timeout = ?idle, "media stream went idle; killing tool");
                        let _ = child.start_kill();
                        yield Err(ExtractError::Timeout(idle));
                        return;
                    }
                    Ok(Err(e)) => {
                        yield Err(ExtractError::Io(e));
                        return;
                    }
                    Ok(Ok(0)) => break,
                    Ok(Ok(n)) => {
                        forwarded += n as u64;
                        yield Ok(buf.freeze());
                    }
                }
            }

            let status = match tokio::time::timeout(idle, child.wait()).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    yield Err(ExtractError::Io(e));
                    return;
                }
                Err(_) => {
                    let _ = child.start_kill();
                    yield Err(ExtractError::Timeout(idle));
                    return;
                }
            };

            if status.success() {
                info!(url = %url, forwarded, "media stream finished");
            } else {
                let stderr = match stderr_task {
                    Some(task) => tokio::time::timeout(STDERR_GRACE, task)
                        .await
                        .ok()
                        .and_then(Result::ok)
                        .unwrap_or_default(),
                    None => String::new(),
                };
                yield Err(ExtractError::Failed { code: status.code(), stderr });
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Log the tool's diagnostics line by line and keep a bounded tail.
async fn drain_stderr(stderr: ChildStderr) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = String::new();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.starts_with("ERROR") {
            warn!(line = %line, "yt-dlp stderr");
        } else {
            debug!(line = %line, "yt-dlp stderr");
        }
        tail.push_str(&line);
        tail.push('\n');
        if tail.len() > STDERR_TAIL_BYTES {
            let mut cut = tail.len() - STDERR_TAIL_BYTES;
            while !tail.is_char_boundary(cut) {
                cut += 1;
            }
            tail.drain(..cut);
        }
    }
    tail
}

// ── Tests ──────────────────────────────────────────────────────────────────────
