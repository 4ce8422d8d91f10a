//! Directory-backed [`KvStore`]: one `<key>.json` file per key.

use async_trait::async_trait;
use cms_sync_core::contract::KvStore;
use cms_sync_core::error::SyncError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SyncError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(SyncError::Persistence {
                key: key.to_string(),
                message: "invalid key".to_string(),
            });
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => {
                debug!(key = %key, path = ?path, "Read stored value");
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::Persistence {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), SyncError> {
        let path = self.path_for(key)?;
        let to_error = |e: std::io::Error| SyncError::Persistence {
            key: key.to_string(),
            message: e.to_string(),
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(to_error)?;

        // Write then rename so readers never observe a half-written collection.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value.as_bytes())
            .await
            .map_err(to_error)?;
        tokio::fs::rename(&tmp, &path).await.map_err(to_error)?;

        info!(key = %key, path = ?path, bytes = value.len(), "Wrote stored value");
        Ok(())
    }
}
