//! In-memory [`KvStore`] and the read side used by renderers.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::contract::{BlogPost, CosplayAlbum, KvStore};
use crate::error::Result;

/// Process-local store. Useful for tests and for embedding without a backing service.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Read a stored collection.
///
/// Missing key, store failure and malformed JSON all yield an empty collection; the
/// renderer shows an empty page rather than an error.
pub async fn load_collection<S, T>(store: &S, key: &str) -> Vec<T>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = match store.get(key).await {
        Ok(Some(raw)) if !raw.is_empty() => raw,
        Ok(_) => {
            debug!(key = %key, "No stored collection found");
            return Vec::new();
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read stored collection");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Option<Vec<T>>>(&raw) {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            warn!(key = %key, error = %e, "Stored collection is not valid JSON");
            Vec::new()
        }
    }
}

pub async fn load_blog_posts<S: KvStore + ?Sized>(store: &S, key: &str) -> Vec<BlogPost> {
    load_collection(store, key).await
}

pub async fn load_albums<S: KvStore + ?Sized>(store: &S, key: &str) -> Vec<CosplayAlbum> {
    load_collection(store, key).await
}
