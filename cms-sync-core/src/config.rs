use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BLOG_KEY: &str = "blog_data";
pub const DEFAULT_ALBUMS_KEY: &str = "cosplay_data";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const PHOTOS_API_BASE: &str = "https://photoslibrary.googleapis.com/v1";

/// What one sync run touches: the document folder, the albums and where results go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Drive folder holding the blog documents.
    pub folder_id: String,
    /// Albums to sync. Empty means every album visible to the access token.
    #[serde(default)]
    pub album_ids: Vec<String>,
    /// Upper bound on concurrent item fetches per stream.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub keys: StorageKeys,
}

impl SyncConfig {
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            album_ids: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            keys: StorageKeys::default(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            folder_id = %self.folder_id,
            album_count = self.album_ids.len(),
            concurrency = self.concurrency,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

/// Storage keys the two collections are written under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageKeys {
    pub blog: String,
    pub albums: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            blog: DEFAULT_BLOG_KEY.to_string(),
            albums: DEFAULT_ALBUMS_KEY.to_string(),
        }
    }
}

/// Transport settings for the HTTP clients.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub drive_base_url: String,
    pub photos_base_url: String,
    /// Applied to every request; a hung upstream fails the call instead of the sync.
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            drive_base_url: DRIVE_API_BASE.to_string(),
            photos_base_url: PHOTOS_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
