//! Client-local download history.
//!
//! [`DownloadHistory`] is an explicit store handed to whoever needs it; there
//! is no process-wide instance. It keeps the [`MAX_HISTORY_ITEMS`] most recent
//! downloads, newest first, one entry per URL, persisted as a JSON array.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::HistoryError;

pub const MAX_HISTORY_ITEMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub url: String,
    pub thumbnail: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    /// Format id, `"audio"` for audio-only downloads, or `"default"` when
    /// no format was requested and the tool picked one.
    pub format: String,
}

/// A history entry before it is stamped with an id and a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryItem {
    pub title: String,
    pub platform: String,
    pub url: String,
    pub thumbnail: String,
    pub format: String,
}

#[derive(Debug, Clone)]
pub struct DownloadHistory {
    path: PathBuf,
    items: Vec<HistoryItem>,
}

impl DownloadHistory {
    /// Open the history stored at `path`.
    ///
    /// A missing file is an empty history. A file that does not decode is
    /// logged and treated as empty; it is overwritten on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let items = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<HistoryItem>>(&bytes) {
                Ok(items) => items,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse download history; starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_error(&path, e)),
        };
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries, newest first.
    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Record a download. An older entry for the same URL is replaced and
    /// the list is trimmed to [`MAX_HISTORY_ITEMS`].
    pub fn add(&mut self, item: NewHistoryItem) -> &HistoryItem {
        self.add_at(item, chrono::Utc::now().timestamp_millis())
    }

    fn add_at(&mut self, item: NewHistoryItem, timestamp: i64) -> &HistoryItem {
        self.items.retain(|h| h.url != item.url);
        self.items.insert(
            0,
            HistoryItem {
                id: Uuid::new_v4().simple().to_string(),
                title: item.title,
                platform: item.platform,
                url: item.url,
                thumbnail: item.thumbnail,
                timestamp,
                format: item.format,
            },
        );
        self.items.truncate(MAX_HISTORY_ITEMS);
        &self.items[0]
    }

    /// Remove the entry with `id`. Returns `false` when there was none.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|h| h.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Persist to disk. An empty history removes the file.
    pub fn save(&self) -> Result<(), HistoryError> {
        if self.items.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_error(&self.path, e)),
            };
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(&self.items)?;
        std::fs::write(&self.path, json).map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> HistoryError {
    HistoryError::Io {
        path: path.display().to_string(),
        source,
    }
}
