//! Retrieval stage: container listing, per-item content fetch and album assembly.
//!
//! The functions here sit on top of the [`DriveApi`] / [`PhotosApi`] collaborators and
//! own the policy: paging, sub-container filtering, export-vs-raw selection and the
//! choice of the representative media item. [`DriveClient`] and [`PhotosClient`] are
//! the reqwest-backed collaborators.

pub mod drive;
pub mod photos;

pub use drive::DriveClient;
pub use photos::PhotosClient;

use tracing::{debug, error, info, warn};

use crate::contract::{AlbumInfo, CosplayAlbum, DriveApi, ItemDescriptor, MediaItem, PhotosApi};
use crate::error::{Result, SyncError};
use crate::preprocess::build_album;

/// Hint fragment identifying a proprietary rich document that must be exported.
pub const RICH_DOCUMENT_MARKER: &str = "google-apps.document";

/// Representation requested when exporting a rich document.
pub const EXPORT_MIME: &str = "text/plain";

/// Hint fragment identifying a sub-container, which is not a processable item.
pub const SUB_CONTAINER_MARKER: &str = "folder";

/// Upper bound on pages followed for a single listing.
pub const MAX_PAGES: usize = 100;

/// How the bytes of one item are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Convert the rich document to [`EXPORT_MIME`].
    Export,
    /// Download the stored bytes unchanged.
    Raw,
}

impl FetchStrategy {
    pub fn for_hint(content_type_hint: &str) -> Self {
        if content_type_hint.contains(RICH_DOCUMENT_MARKER) {
            FetchStrategy::Export
        } else {
            FetchStrategy::Raw
        }
    }
}

pub fn is_sub_container(content_type_hint: &str) -> bool {
    content_type_hint.contains(SUB_CONTAINER_MARKER)
}

/// List every leaf item of `container_id`, following pages, in listing order.
///
/// Sub-containers are skipped silently.
pub async fn list_items<D>(api: &D, container_id: &str) -> Result<Vec<ItemDescriptor>>
where
    D: DriveApi + ?Sized,
{
    info!(container_id = %container_id, "[LIST] Listing container");
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;

    for page_number in 0..MAX_PAGES {
        let page = api.list_page(container_id, page_token.take()).await.map_err(|e| {
            error!(container_id = %container_id, page = page_number, error = %e, "[LIST] Listing failed");
            e
        })?;

        for item in page.items {
            if is_sub_container(&item.content_type_hint) {
                debug!(id = %item.id, name = %item.name, "[LIST] Skipping sub-container");
                continue;
            }
            items.push(item);
        }

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => {
                info!(container_id = %container_id, count = items.len(), "[LIST] Listing complete");
                return Ok(items);
            }
        }
    }

    warn!(container_id = %container_id, max_pages = MAX_PAGES, "[LIST] Page limit reached, listing truncated");
    Ok(items)
}

/// Fetch the text of one item, exporting rich documents and downloading everything
/// else raw.
///
/// Bytes are decoded lossily: binary content produces replacement characters rather
/// than an error.
pub async fn fetch_content<D>(api: &D, item_id: &str, content_type_hint: &str) -> Result<String>
where
    D: DriveApi + ?Sized,
{
    let strategy = FetchStrategy::for_hint(content_type_hint);
    debug!(item_id = %item_id, hint = %content_type_hint, ?strategy, "[FETCH] Fetching item content");

    let bytes = match strategy {
        FetchStrategy::Export => api.fetch_export(item_id, EXPORT_MIME).await?,
        FetchStrategy::Raw => api.fetch_raw(item_id).await?,
    };

    debug!(item_id = %item_id, size = bytes.len(), "[FETCH] Fetched item content");
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// List every album visible to the photo credential, following pages.
pub async fn list_albums<P>(api: &P) -> Result<Vec<AlbumInfo>>
where
    P: PhotosApi + ?Sized,
{
    info!("[LIST] Listing albums");
    let mut albums = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let page = api.list_albums_page(page_token.take()).await?;
        albums.extend(page.albums);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => {
                info!(count = albums.len(), "[LIST] Album listing complete");
                return Ok(albums);
            }
        }
    }

    warn!(max_pages = MAX_PAGES, "[LIST] Page limit reached, album listing truncated");
    Ok(albums)
}

/// All media items of one album, in album order.
pub async fn list_media<P>(api: &P, album_id: &str) -> Result<Vec<MediaItem>>
where
    P: PhotosApi + ?Sized,
{
    let mut media = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let page = api.search_media_page(album_id, page_token.take()).await?;
        media.extend(page.media_items);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => return Ok(media),
        }
    }

    warn!(album_id = %album_id, max_pages = MAX_PAGES, "[LIST] Page limit reached, media listing truncated");
    Ok(media)
}

/// Fetch one album and its media and build the [`CosplayAlbum`].
///
/// The first media item in album order supplies the free-text metadata.
pub async fn fetch_album<P>(api: &P, album_id: &str) -> Result<CosplayAlbum>
where
    P: PhotosApi + ?Sized,
{
    let info = api.get_album(album_id).await?;
    let media = list_media(api, album_id).await?;

    let urls: Vec<String> = media.iter().map(|item| item.base_url.clone()).collect();
    let description = media
        .first()
        .map(|item| item.description.as_str())
        .unwrap_or_default();

    debug!(album_id = %album_id, title = %info.title, media = media.len(), "[FETCH] Fetched album");
    Ok(build_album(album_id, &info.title, description, &urls))
}

/// Turn a response into its body bytes, or an upstream error carrying status and body.
pub(crate) async fn read_success(response: reqwest::Response) -> Result<Vec<u8>> {
    let status = response.status();
    // Path only: the query string may carry the API key.
    let path = response.url().path().to_string();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        error!(status = %status, path = %path, "Upstream returned error status. Response body: {body}");
        return Err(SyncError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.bytes().await?.to_vec())
}
