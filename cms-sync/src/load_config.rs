/// `load_config` module: loads a static YAML config file and injects secrets from the
/// environment, producing the core [`SyncConfig`], [`HttpConfig`] and [`Credentials`].
///
/// This module is the only place where untrusted YAML is parsed.
///
/// # Secrets
/// Credentials never live in the YAML file. They are read from:
/// - `DRIVE_API_KEY`: Drive API key for the blog stream
/// - `PHOTOS_ACCESS_TOKEN`: OAuth access token for the album stream
///
/// Either may be absent; the matching stream is then skipped at sync time.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use cms_sync_core::config::{
    HttpConfig, StorageKeys, SyncConfig, DEFAULT_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use cms_sync_core::synchronise::Credentials;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const DRIVE_API_KEY_ENV: &str = "DRIVE_API_KEY";
pub const PHOTOS_ACCESS_TOKEN_ENV: &str = "PHOTOS_ACCESS_TOKEN";

/// Fully resolved CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub sync: SyncConfig,
    pub http: HttpConfig,
    pub credentials: Credentials,
    pub store_dir: PathBuf,
    /// Overall bound on a sync run. `None` means unbounded.
    pub deadline: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    drive: DriveSection,
    #[serde(default)]
    photos: PhotosSection,
    #[serde(default)]
    sync: SyncSection,
    store: StoreSection,
}

#[derive(Debug, Deserialize)]
struct DriveSection {
    folder_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct PhotosSection {
    #[serde(default)]
    album_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SyncSection {
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default)]
    deadline_secs: Option<u64>,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_secs: default_timeout_secs(),
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    dir: PathBuf,
    #[serde(default)]
    keys: StorageKeys,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Loads a static YAML config file (no secrets) and injects secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.sync.concurrency == 0 {
        return Err(anyhow::anyhow!("sync.concurrency must be at least 1"));
    }

    let credentials = Credentials {
        drive_api_key: read_secret(DRIVE_API_KEY_ENV),
        photos_access_token: read_secret(PHOTOS_ACCESS_TOKEN_ENV),
    };
    info!(
        drive_api_key = credentials.drive_api_key.is_some(),
        photos_access_token = credentials.photos_access_token.is_some(),
        "Secrets resolved from environment"
    );

    let sync = SyncConfig {
        folder_id: raw.drive.folder_id,
        album_ids: raw.photos.album_ids,
        concurrency: raw.sync.concurrency,
        keys: raw.store.keys,
    };
    sync.trace_loaded();

    Ok(CliConfig {
        sync,
        http: HttpConfig {
            request_timeout: Duration::from_secs(raw.sync.request_timeout_secs),
            ..HttpConfig::default()
        },
        credentials,
        store_dir: raw.store.dir,
        deadline: raw.sync.deadline_secs.map(Duration::from_secs),
    })
}

/// Blank values count as absent.
fn read_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
