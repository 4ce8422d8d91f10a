//! Drive API v3 collaborator authenticated with an API key.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::contract::{DriveApi, ItemDescriptor, ListPage};
use crate::error::{Result, SyncError};

use super::read_success;

/// Maximum results per listing page accepted by the API.
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields requested for a folder listing.
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

/// `files.list` file resource, reduced to what the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

/// `files.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl From<DriveFile> for ItemDescriptor {
    fn from(file: DriveFile) -> Self {
        ItemDescriptor {
            id: file.id,
            name: file.name,
            content_type_hint: file.mime_type,
        }
    }
}

pub struct DriveClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DriveClient {
    /// Build a client whose every request is bounded by `config.request_timeout`.
    pub fn new(api_key: impl Into<String>, config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to build HTTP client: {e}")))?;
        info!(
            base_url = %config.drive_base_url,
            timeout_secs = config.request_timeout.as_secs(),
            "Initialized DriveClient"
        );
        Ok(Self {
            client,
            base_url: config.drive_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn list_request(&self, container_id: &str, page_token: Option<&str>) -> RequestBuilder {
        let query = format!("'{}' in parents", escape_query_literal(container_id));
        let page_size = MAX_PAGE_SIZE.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query.as_str()),
            ("fields", LIST_FIELDS),
            ("pageSize", page_size.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.client
            .get(format!("{}/files", self.base_url))
            .query(&params)
    }

    fn raw_request(&self, item_id: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/files/{}", self.base_url, item_id))
            .query(&[("alt", "media"), ("key", self.api_key.as_str())])
    }

    fn export_request(&self, item_id: &str, target_mime: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/files/{}/export", self.base_url, item_id))
            .query(&[("mimeType", target_mime), ("key", self.api_key.as_str())])
    }
}

/// Escape a value for use inside a single-quoted `q` string literal.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_page(&self, container_id: &str, page_token: Option<String>) -> Result<ListPage> {
        debug!(container_id = %container_id, has_page_token = page_token.is_some(), "Requesting Drive listing page");
        let response = self
            .list_request(container_id, page_token.as_deref())
            .send()
            .await?;
        let body = read_success(response).await?;
        let list: FilesListResponse = serde_json::from_slice(&body).map_err(|e| {
            SyncError::Decode(format!("failed to parse files list response: {e}"))
        })?;

        Ok(ListPage {
            items: list.files.into_iter().map(ItemDescriptor::from).collect(),
            next_page_token: list.next_page_token,
        })
    }

    async fn fetch_raw(&self, item_id: &str) -> Result<Vec<u8>> {
        debug!(item_id = %item_id, "Downloading Drive file");
        let response = self.raw_request(item_id).send().await?;
        read_success(response).await
    }

    async fn fetch_export(&self, item_id: &str, target_mime: &str) -> Result<Vec<u8>> {
        debug!(item_id = %item_id, target_mime = %target_mime, "Exporting Drive document");
        let response = self.export_request(item_id, target_mime).send().await?;
        read_success(response).await
    }
}
