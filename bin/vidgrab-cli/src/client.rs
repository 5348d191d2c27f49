//! HTTP client for the vidgrab-server API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::json;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use vidgrab_core::MediaMetadata;

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(server: &str) -> Result<Self> {
        let base = Url::parse(server).with_context(|| format!("Invalid server URL: {server}"))?;
        // No overall timeout: downloads may legitimately run for a long time.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Failed to build endpoint URL for {path}"))
    }

    /// `POST /api/info`
    pub async fn info(&self, url: &str) -> Result<MediaMetadata> {
        let endpoint = self.endpoint("/api/info")?;
        debug!(%endpoint, url, "requesting metadata");

        let response = self
            .http
            .post(endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await
            .context("Failed to reach vidgrab-server")?;

        let response = ensure_success(response).await?;
        response
            .json::<MediaMetadata>()
            .await
            .context("Failed to decode video information")
    }

    /// `POST /api/download`, streamed into `destination`.
    ///
    /// Bytes go to a `.part` sibling that is renamed on success and removed
    /// on failure, so a truncated download never looks complete.
    pub async fn download(
        &self,
        url: &str,
        format_id: Option<&str>,
        audio_only: bool,
        destination: &Path,
    ) -> Result<u64> {
        let endpoint = self.endpoint("/api/download")?;
        debug!(%endpoint, url, ?format_id, audio_only, "requesting download");

        let response = self
            .http
            .post(endpoint)
            .json(&json!({ "url": url, "format_id": format_id, "audio_only": audio_only }))
            .send()
            .await
            .context("Failed to reach vidgrab-server")?;
        let response = ensure_success(response).await?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let partial = partial_path(destination);
        match write_stream(response, &partial).await {
            Ok(written) => {
                fs::rename(&partial, destination)
                    .await
                    .with_context(|| format!("Failed to move download to {}", destination.display()))?;
                Ok(written)
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&partial).await {
                    warn!(path = %partial.display(), error = %rm, "failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}

async fn write_stream(response: Response, path: &Path) -> Result<u64> {
    let mut file = File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.context("Download was interrupted")?;
        file.write_all(&bytes).await?;
        written += bytes.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        bail!("Download failed: server sent no data");
    }
    Ok(written)
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{}", error_message(status.as_u16(), &body))
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(ApiError { error }) => format!("{error} (HTTP {status})"),
        Err(_) => format!("Server returned HTTP {status}"),
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod test {
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    /// Answer exactly one request with `response`, then close the socket.
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket.write_all(response).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    /// Consume request headers and a `Content-Length` body.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let mut expected: Option<usize> = None;
        loop {
            if let Some(total) = expected {
                if buf.len() >= total {
                    return;
                }
            }
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if expected.is_none() {
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    expected = Some(end + 4 + body_len);
                }
            }
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn completed_download_is_renamed_into_place() {
        let server = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
              Content-Length: 6\r\nConnection: close\r\n\r\nabcdef",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        let written = ApiClient::new(&server)
            .unwrap()
            .download(URL, Some("22"), false, &dest)
            .await
            .unwrap();

        assert_eq!(written, 6);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdef");
        assert_eq!(entries(dir.path()), ["clip.mp4"]);
    }

    #[tokio::test]
    async fn truncated_download_fails_and_leaves_nothing() {
        let server = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
              Content-Length: 100\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        let err = ApiClient::new(&server)
            .unwrap()
            .download(URL, None, false, &dest)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("Download was interrupted"));
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn empty_download_fails_and_leaves_nothing() {
        let server = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\n\
              Content-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("song.mp3");

        let err = ApiClient::new(&server)
            .unwrap()
            .download(URL, None, true, &dest)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("server sent no data"));
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn server_error_is_reported_before_creating_files() {
        let server = serve_once(
            b"HTTP/1.1 500 Internal Server Error\r\nContent-Type: application/json\r\n\
              Content-Length: 28\r\nConnection: close\r\n\r\n{\"error\":\"Download failed\"}\n",
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip.mp4");

        let err = ApiClient::new(&server)
            .unwrap()
            .download(URL, None, false, &dest)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Download failed (HTTP 500)");
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn endpoints_are_rooted_at_server() {
        let client = ApiClient::new("http://localhost:3001").unwrap();
        assert_eq!(client.endpoint("/api/info").unwrap().as_str(), "http://localhost:3001/api/info");

        let client = ApiClient::new("http://media.lan:8080/").unwrap();
        assert_eq!(
            client.endpoint("/api/download").unwrap().as_str(),
            "http://media.lan:8080/api/download"
        );
    }

    #[test]
    fn rejects_unparseable_server() {
        assert!(ApiClient::new("localhost without scheme").is_err());
    }

    #[test]
    fn server_error_message_is_surfaced() {
        let msg = error_message(400, r#"{"error":"Invalid URL or unsupported platform"}"#);
        assert_eq!(msg, "Invalid URL or unsupported platform (HTTP 400)");
        assert_eq!(error_message(502, "<html>bad gateway</html>"), "Server returned HTTP 502");
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(partial_path(Path::new("out/Song.mp3")), PathBuf::from("out/Song.mp3.part"));
    }
}
