//! High-level pipeline: orchestrates list → fetch → parse → persist for both content streams.
//!
//! A sync run drives two independent streams:
//!   - **blog**: Drive folder listing, per-document fetch, [`parse_blog_post`], stored under
//!     the blog key.
//!   - **albums**: album discovery (configured ids or a listing), per-album fetch,
//!     [`build_album`](crate::preprocess::build_album), stored under the albums key.
//!
//! Each stream moves through `listing → (fetching → parsing)* → aggregated → persisted`,
//! or stops at `listing failed`, `skipped` (credential missing), `credential rejected`
//! (every item refused with 401/403) or `cancelled`.
//!
//! # Error Handling
//! Nothing here returns an error. Item failures become report lines and the item is
//! left out of the collection; listing and persistence failures end only their own
//! stream. A stream that does not reach persistence leaves its stored collection
//! untouched.
//!
//! # Concurrency
//! Items are fetched up to `SyncConfig::concurrency` at a time. Results are collected
//! in listing order regardless of completion order.
//!
//! # Cancellation
//! Once the caller's token is cancelled no further listing or fetch is issued. The
//! stream is reported as cancelled and nothing is persisted for it.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{HttpConfig, SyncConfig};
use crate::contract::{AlbumInfo, DriveApi, ItemDescriptor, KvStore, PhotosApi};
use crate::download::{self, DriveClient, PhotosClient};
use crate::error::{Result, SyncError};
use crate::preprocess::parse_blog_post;

pub const BLOG_STREAM: &str = "blog";
pub const ALBUMS_STREAM: &str = "albums";

/// Secrets for the two streams. Absent or blank means the stream is skipped.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub drive_api_key: Option<String>,
    pub photos_access_token: Option<String>,
}

/// What happened to one item of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded,
    Failed(String),
    /// The sync was cancelled before this item was fetched.
    NotAttempted,
    /// The fetch was in flight when the sync was cancelled and was dropped.
    Aborted,
}

impl ItemOutcome {
    fn is_cancelled(&self) -> bool {
        matches!(self, ItemOutcome::NotAttempted | ItemOutcome::Aborted)
    }
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub item_id: String,
    pub item_name: String,
    pub outcome: ItemOutcome,
}

/// Terminal state of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Persisted { key: String },
    ListingFailed(String),
    PersistFailed(String),
    /// Every item was refused by the upstream for lack of authorization.
    CredentialRejected(String),
    Skipped(String),
    Cancelled,
}

/// A stream's remote collaborator as seen by the orchestrator.
pub enum Collaborator<'a, T: ?Sized + 'a> {
    Available(&'a T),
    /// No credential was supplied.
    Missing,
    /// A credential was supplied but the client could not be built.
    Unavailable(String),
}

impl<'a, T: ?Sized + 'a> From<Option<&'a T>> for Collaborator<'a, T> {
    fn from(value: Option<&'a T>) -> Self {
        match value {
            Some(api) => Collaborator::Available(api),
            None => Collaborator::Missing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamReport {
    pub stream: &'static str,
    /// Folder id, or the album selection for the albums stream.
    pub container: String,
    pub status: StreamStatus,
    /// In source listing order.
    pub items: Vec<ItemReport>,
}

impl StreamReport {
    fn new(stream: &'static str, container: impl Into<String>) -> Self {
        Self {
            stream,
            container: container.into(),
            status: StreamStatus::Cancelled,
            items: Vec::new(),
        }
    }

    pub fn found(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome == ItemOutcome::Succeeded)
            .count()
    }

    /// Failed items in source order.
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ItemOutcome::Failed(_)))
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self.status, StreamStatus::Persisted { .. })
    }
}

/// Outcome of one sync run. Its `Display` form is the operator-facing narrative.
#[derive(Debug, Clone)]
pub struct SynchroniseReport {
    pub run_id: Uuid,
    pub blog: StreamReport,
    pub albums: StreamReport,
}

impl SynchroniseReport {
    pub fn streams(&self) -> [&StreamReport; 2] {
        [&self.blog, &self.albums]
    }
}

impl fmt::Display for SynchroniseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Starting Sync...")?;
        for stream in self.streams() {
            write_stream(f, stream)?;
        }
        let nothing_ran = self
            .streams()
            .iter()
            .all(|s| matches!(s.status, StreamStatus::Skipped(_)));
        if nothing_ran {
            writeln!(f, "Nothing to sync: no stream could run.")?;
        }
        write!(f, "Sync Complete.")
    }
}

fn write_stream(f: &mut fmt::Formatter<'_>, report: &StreamReport) -> fmt::Result {
    let name = report.stream;
    if let StreamStatus::Skipped(reason) = &report.status {
        return writeln!(f, "[{name}] Skipping {name} sync: {reason}.");
    }

    writeln!(f, "[{name}] Fetching {name} from {}...", report.container)?;
    if let StreamStatus::ListingFailed(e) = &report.status {
        return writeln!(f, "[{name}] Error listing {name}: {e}");
    }

    writeln!(f, "[{name}] Found {} items.", report.found())?;
    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Succeeded => {}
            ItemOutcome::Failed(e) => writeln!(
                f,
                "[{name}] Failed item {} ({}): {e}",
                item.item_id, item.item_name
            )?,
            ItemOutcome::NotAttempted => writeln!(
                f,
                "[{name}] Not attempted {} ({}): sync cancelled",
                item.item_id, item.item_name
            )?,
            ItemOutcome::Aborted => writeln!(
                f,
                "[{name}] Aborted {} ({}): sync cancelled while fetching",
                item.item_id, item.item_name
            )?,
        }
    }
    writeln!(
        f,
        "[{name}] Processed {} of {} items.",
        report.succeeded(),
        report.found()
    )?;

    match &report.status {
        StreamStatus::Persisted { key } => writeln!(f, "[{name}] Saved {key} to KV."),
        StreamStatus::PersistFailed(e) => writeln!(f, "[{name}] Error saving to KV: {e}"),
        StreamStatus::CredentialRejected(e) => writeln!(
            f,
            "[{name}] Credential rejected for every item, stored {name} left unchanged: {e}"
        ),
        StreamStatus::Cancelled => writeln!(
            f,
            "[{name}] Sync cancelled, stored {name} left unchanged."
        ),
        StreamStatus::ListingFailed(_) | StreamStatus::Skipped(_) => Ok(()),
    }
}

/// Run both streams against the given collaborators.
///
/// `None` for a collaborator means its credential is absent: that stream is skipped
/// and its stored collection is left as it is.
pub async fn synchronise(
    config: &SyncConfig,
    drive: Option<&dyn DriveApi>,
    photos: Option<&dyn PhotosApi>,
    store: &dyn KvStore,
    cancel: &CancellationToken,
) -> SynchroniseReport {
    run_streams(config, drive.into(), photos.into(), store, cancel).await
}

async fn run_streams(
    config: &SyncConfig,
    drive: Collaborator<'_, dyn DriveApi>,
    photos: Collaborator<'_, dyn PhotosApi>,
    store: &dyn KvStore,
    cancel: &CancellationToken,
) -> SynchroniseReport {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("sync", run_id = %run_id);

    async move {
        info!(
            folder_id = %config.folder_id,
            drive = matches!(drive, Collaborator::Available(_)),
            photos = matches!(photos, Collaborator::Available(_)),
            concurrency = config.concurrency,
            "[SYNC] Starting synchronisation"
        );

        let (blog, albums) = futures::join!(
            sync_blog(config, drive, store, cancel),
            sync_albums(config, photos, store, cancel),
        );

        info!(
            blog_found = blog.found(),
            blog_succeeded = blog.succeeded(),
            blog_persisted = blog.is_persisted(),
            albums_found = albums.found(),
            albums_succeeded = albums.succeeded(),
            albums_persisted = albums.is_persisted(),
            "[SYNC] Synchronisation finished"
        );

        SynchroniseReport {
            run_id,
            blog,
            albums,
        }
    }
    .instrument(span)
    .await
}

/// Build the HTTP collaborators from `credentials` and run both streams.
///
/// A client that cannot be constructed fails its stream without touching the store.
pub async fn run_sync(
    config: &SyncConfig,
    http: &HttpConfig,
    credentials: &Credentials,
    store: &dyn KvStore,
    cancel: &CancellationToken,
) -> SynchroniseReport {
    let drive = present(&credentials.drive_api_key).map(|key| DriveClient::new(key, http));
    let photos =
        present(&credentials.photos_access_token).map(|token| PhotosClient::new(token, http));

    let drive = match &drive {
        Some(Ok(client)) => Collaborator::Available(client as &dyn DriveApi),
        Some(Err(e)) => unavailable(e),
        None => Collaborator::Missing,
    };
    let photos = match &photos {
        Some(Ok(client)) => Collaborator::Available(client as &dyn PhotosApi),
        Some(Err(e)) => unavailable(e),
        None => Collaborator::Missing,
    };

    run_streams(config, drive, photos, store, cancel).await
}

/// Single entry point for outer adapters: sync the folder (and the albums, when an
/// access token is given) into `store` and return the narrative report.
pub async fn sync_content(
    folder_id: &str,
    drive_api_key: &str,
    photos_access_token: Option<&str>,
    store: &dyn KvStore,
    cancel: &CancellationToken,
) -> String {
    let config = SyncConfig::new(folder_id);
    let credentials = Credentials {
        drive_api_key: Some(drive_api_key.to_string()),
        photos_access_token: photos_access_token.map(str::to_string),
    };
    run_sync(&config, &HttpConfig::default(), &credentials, store, cancel)
        .await
        .to_string()
}

async fn sync_blog(
    config: &SyncConfig,
    drive: Collaborator<'_, dyn DriveApi>,
    store: &dyn KvStore,
    cancel: &CancellationToken,
) -> StreamReport {
    let mut report = StreamReport::new(BLOG_STREAM, format!("folder {}", config.folder_id));

    let drive = match drive {
        Collaborator::Available(drive) => drive,
        Collaborator::Missing => {
            info!("[SYNC][BLOG] No Drive API key, skipping blog stream");
            report.status = StreamStatus::Skipped(
                SyncError::CredentialMissing("Drive API key".into()).to_string(),
            );
            return report;
        }
        Collaborator::Unavailable(e) => {
            error!(error = %e, "[SYNC][BLOG][ERROR] Drive client unavailable, stored posts left unchanged");
            report.status = StreamStatus::ListingFailed(e);
            return report;
        }
    };
    if config.folder_id.trim().is_empty() {
        report.status = StreamStatus::Skipped("no folder id configured".into());
        return report;
    }

    info!(folder_id = %config.folder_id, "[SYNC][BLOG] Listing blog documents");
    let items = match cancellable(cancel, download::list_items(drive, &config.folder_id)).await {
        Ok(items) => items,
        Err(SyncError::Cancelled) => {
            warn!("[SYNC][BLOG] Cancelled before listing completed");
            report.status = StreamStatus::Cancelled;
            return report;
        }
        Err(e) => {
            error!(error = %e, "[SYNC][BLOG][ERROR] Listing failed, stored posts left unchanged");
            report.status = StreamStatus::ListingFailed(e.to_string());
            return report;
        }
    };
    info!(found = items.len(), "[SYNC][BLOG] Listing succeeded");

    let processed = process_items(
        items,
        |item: &ItemDescriptor| (item.id.clone(), item.name.clone()),
        |item: ItemDescriptor| async move {
            let text = download::fetch_content(drive, &item.id, &item.content_type_hint).await?;
            Ok::<_, SyncError>(parse_blog_post(&item.id, &text))
        },
        config.concurrency,
        cancel,
    )
    .await;
    report.status = persist(BLOG_STREAM, &processed, &config.keys.blog, store).await;
    report.items = processed.reports;
    report
}

async fn sync_albums(
    config: &SyncConfig,
    photos: Collaborator<'_, dyn PhotosApi>,
    store: &dyn KvStore,
    cancel: &CancellationToken,
) -> StreamReport {
    let selection = if config.album_ids.is_empty() {
        "all albums".to_string()
    } else {
        format!("albums {}", config.album_ids.join(", "))
    };
    let mut report = StreamReport::new(ALBUMS_STREAM, selection);

    let photos = match photos {
        Collaborator::Available(photos) => photos,
        Collaborator::Missing => {
            info!("[SYNC][ALBUMS] No Photos access token, skipping album stream");
            report.status = StreamStatus::Skipped(
                SyncError::CredentialMissing("Photos access token".into()).to_string(),
            );
            return report;
        }
        Collaborator::Unavailable(e) => {
            error!(error = %e, "[SYNC][ALBUMS][ERROR] Photos client unavailable, stored albums left unchanged");
            report.status = StreamStatus::ListingFailed(e);
            return report;
        }
    };

    let albums = if config.album_ids.is_empty() {
        info!("[SYNC][ALBUMS] No album ids configured, listing albums");
        match cancellable(cancel, download::list_albums(photos)).await {
            Ok(albums) => albums,
            Err(SyncError::Cancelled) => {
                warn!("[SYNC][ALBUMS] Cancelled before listing completed");
                report.status = StreamStatus::Cancelled;
                return report;
            }
            Err(e) => {
                error!(error = %e, "[SYNC][ALBUMS][ERROR] Album listing failed, stored albums left unchanged");
                report.status = StreamStatus::ListingFailed(e.to_string());
                return report;
            }
        }
    } else {
        config
            .album_ids
            .iter()
            .map(|id| AlbumInfo {
                id: id.clone(),
                title: String::new(),
            })
            .collect()
    };
    info!(found = albums.len(), "[SYNC][ALBUMS] Albums selected");

    let processed = process_items(
        albums,
        |album: &AlbumInfo| {
            let name = if album.title.is_empty() {
                album.id.clone()
            } else {
                album.title.clone()
            };
            (album.id.clone(), name)
        },
        |album: AlbumInfo| async move { download::fetch_album(photos, &album.id).await },
        config.concurrency,
        cancel,
    )
    .await;
    report.status = persist(ALBUMS_STREAM, &processed, &config.keys.albums, store).await;
    report.items = processed.reports;
    report
}

/// Results of one stream's item fetches, in listing order.
struct Processed<T> {
    values: Vec<T>,
    reports: Vec<ItemReport>,
    /// Failures where the upstream refused the credential.
    auth_failures: usize,
}

/// Run `work` over `items` with bounded concurrency, keeping listing order.
async fn process_items<I, T, K, W, Fut>(
    items: Vec<I>,
    identify: K,
    work: W,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Processed<T>
where
    K: Fn(&I) -> (String, String),
    W: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcomes: Vec<((String, String), ItemResult<T>)> = stream::iter(items)
        .map(|item| {
            let ident = identify(&item);
            let fut = work(item);
            async move {
                if cancel.is_cancelled() {
                    return (ident, ItemResult::NotAttempted);
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => (ident, ItemResult::Aborted),
                    result = fut => (ident, ItemResult::Done(result)),
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut values = Vec::with_capacity(outcomes.len());
    let mut reports = Vec::with_capacity(outcomes.len());
    let mut auth_failures = 0;
    for ((item_id, item_name), outcome) in outcomes {
        let outcome = match outcome {
            ItemResult::Done(Ok(value)) => {
                values.push(value);
                ItemOutcome::Succeeded
            }
            ItemResult::Done(Err(e)) => {
                warn!(item_id = %item_id, item_name = %item_name, error = %e, "[SYNC] Item failed, skipping");
                if e.is_auth_rejection() {
                    auth_failures += 1;
                }
                ItemOutcome::Failed(e.to_string())
            }
            ItemResult::NotAttempted => ItemOutcome::NotAttempted,
            ItemResult::Aborted => {
                warn!(item_id = %item_id, item_name = %item_name, "[SYNC] In-flight fetch dropped on cancel");
                ItemOutcome::Aborted
            }
        };
        reports.push(ItemReport {
            item_id,
            item_name,
            outcome,
        });
    }
    Processed {
        values,
        reports,
        auth_failures,
    }
}

enum ItemResult<T> {
    Done(Result<T>),
    NotAttempted,
    Aborted,
}

/// Serialize and store the collection.
///
/// Nothing is written when the stream was cancelled or when the upstream refused the
/// credential for every item.
async fn persist<T: Serialize>(
    stream: &str,
    processed: &Processed<T>,
    key: &str,
    store: &dyn KvStore,
) -> StreamStatus {
    let items = &processed.reports;
    let values = &processed.values;
    if items.iter().any(|item| item.outcome.is_cancelled()) {
        warn!(stream = %stream, key = %key, "[SYNC] Cancelled mid-stream, not persisting partial collection");
        return StreamStatus::Cancelled;
    }
    if !items.is_empty() && processed.auth_failures == items.len() {
        let reason = items
            .iter()
            .find_map(|item| match &item.outcome {
                ItemOutcome::Failed(e) => Some(e.clone()),
                _ => None,
            })
            .unwrap_or_default();
        error!(stream = %stream, key = %key, "[SYNC][ERROR] Credential rejected for every item, not persisting");
        return StreamStatus::CredentialRejected(reason);
    }

    let json = match serde_json::to_string(values) {
        Ok(json) => json,
        Err(e) => {
            let e = SyncError::from(e);
            error!(stream = %stream, error = %e, "[SYNC][ERROR] Failed to serialize collection");
            return StreamStatus::PersistFailed(e.to_string());
        }
    };

    match store.set(key, json).await {
        Ok(()) => {
            info!(stream = %stream, key = %key, count = values.len(), "[SYNC] Saved collection");
            StreamStatus::Persisted {
                key: key.to_string(),
            }
        }
        Err(e) => {
            error!(stream = %stream, key = %key, error = %e, "[SYNC][ERROR] Failed to persist collection");
            StreamStatus::PersistFailed(e.to_string())
        }
    }
}

/// Await `fut` unless the token fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}

fn present(secret: &Option<String>) -> Option<&str> {
    secret.as_deref().filter(|s| !s.trim().is_empty())
}

fn unavailable<'a, T: ?Sized + 'a>(e: &SyncError) -> Collaborator<'a, T> {
    error!(error = %e, "[SYNC][ERROR] Failed to construct client");
    Collaborator::Unavailable(e.to_string())
}
