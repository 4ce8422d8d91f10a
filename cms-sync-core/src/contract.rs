//! # contract: data model and collaborator interfaces
//!
//! Plain data for the two content entities ([`BlogPost`], [`CosplayAlbum`]) and the
//! transient descriptors returned by the remote stores, plus the three async traits the
//! pipeline consumes:
//!
//! - [`DriveApi`]: the document store (list a folder page, raw download, export).
//! - [`PhotosApi`]: the photo store (list albums, get one album, search its media).
//! - [`KvStore`]: the persistence sink holding serialized collections as strings.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` so tests get `MockDriveApi`, `MockPhotosApi`
//!   and `MockKvStore` (behind `cfg(test)` or the `test-export-mocks` feature).

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SyncError;

/// Title assigned to a post whose header carries no `Title:` line.
pub const UNTITLED: &str = "Untitled";

/// Lightweight record identifying one fetchable unit inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    /// Opaque external identifier, unique within its container.
    pub id: String,
    /// Display string; never parsed.
    pub name: String,
    /// Only used to choose the retrieval strategy. Arbitrary values are tolerated.
    pub content_type_hint: String,
}

/// One page of a container listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<ItemDescriptor>,
    pub next_page_token: Option<String>,
}

/// A textual post built from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: String,
    #[serde(default = "untitled")]
    pub title: String,
    /// Free-form, passed through without validation.
    #[serde(default)]
    pub date: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub html_content: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
}

impl BlogPost {
    /// A post carrying only its identifier, every other field at its default.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: untitled(),
            date: String::new(),
            tags: Vec::new(),
            html_content: String::new(),
            image_url: String::new(),
            kind: String::new(),
            summary: String::new(),
        }
    }
}

/// A photo album with metadata parsed from its title and cover description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosplayAlbum {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub images: Vec<String>,
    #[serde(default)]
    pub photographer: String,
    #[serde(default)]
    pub assistant: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

impl CosplayAlbum {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Album resource as returned by the photo store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Media item resource as returned by the photo store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    /// Not usable at full resolution without a size suffix.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub description: String,
}

/// One page of a media search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPage {
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One page of the album listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumPage {
    #[serde(default)]
    pub albums: Vec<AlbumInfo>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Document store: folder listing and the two retrieval operations.
///
/// The credential is held by the implementor; the trait is agnostic of auth and
/// transport details.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// List one page of the items whose parent is `container_id`, sub-containers included.
    async fn list_page(
        &self,
        container_id: &str,
        page_token: Option<String>,
    ) -> Result<ListPage, SyncError>;

    /// Download the stored bytes of an item as-is.
    async fn fetch_raw(&self, item_id: &str) -> Result<Vec<u8>, SyncError>;

    /// Export a rich document into `target_mime`.
    async fn fetch_export(&self, item_id: &str, target_mime: &str) -> Result<Vec<u8>, SyncError>;
}

/// Photo store: album discovery, album metadata and media search.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PhotosApi: Send + Sync {
    /// List one page of the albums visible to the credential.
    async fn list_albums_page(&self, page_token: Option<String>) -> Result<AlbumPage, SyncError>;

    async fn get_album(&self, album_id: &str) -> Result<AlbumInfo, SyncError>;

    /// Search one page of the media items contained in `album_id`, in album order.
    async fn search_media_page(
        &self,
        album_id: &str,
        page_token: Option<String>,
    ) -> Result<MediaPage, SyncError>;
}

/// Persistence sink for serialized collections.
///
/// Injected into the orchestrator; there is no ambient or global store.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns `Ok(None)` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    async fn set(&self, key: &str, value: String) -> Result<(), SyncError>;
}

fn untitled() -> String {
    UNTITLED.to_string()
}

// Older writers stored empty sequences as JSON null.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
