//! Photos Library API collaborator authenticated with an OAuth bearer token.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::contract::{AlbumInfo, AlbumPage, MediaPage, PhotosApi};
use crate::error::{Result, SyncError};

use super::read_success;

/// Media items requested per search page (API maximum).
const MEDIA_PAGE_SIZE: u32 = 100;

/// Albums requested per listing page (API maximum).
const ALBUM_PAGE_SIZE: u32 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    album_id: &'a str,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

pub struct PhotosClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl PhotosClient {
    pub fn new(access_token: impl Into<String>, config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to build HTTP client: {e}")))?;
        info!(
            base_url = %config.photos_base_url,
            timeout_secs = config.request_timeout.as_secs(),
            "Initialized PhotosClient"
        );
        Ok(Self {
            client,
            base_url: config.photos_base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn albums_request(&self, page_token: Option<&str>) -> RequestBuilder {
        let page_size = ALBUM_PAGE_SIZE.to_string();
        let mut params: Vec<(&str, &str)> = vec![("pageSize", page_size.as_str())];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.client
            .get(format!("{}/albums", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&params)
    }

    fn album_request(&self, album_id: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/albums/{}", self.base_url, album_id))
            .bearer_auth(&self.access_token)
    }

    fn search_request(&self, album_id: &str, page_token: Option<&str>) -> RequestBuilder {
        self.client
            .post(format!("{}/mediaItems:search", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&SearchRequest {
                album_id,
                page_size: MEDIA_PAGE_SIZE,
                page_token,
            })
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request.send().await?;
        let body = read_success(response).await?;
        serde_json::from_slice(&body)
            .map_err(|e| SyncError::Decode(format!("failed to parse {what} response: {e}")))
    }
}

#[async_trait]
impl PhotosApi for PhotosClient {
    async fn list_albums_page(&self, page_token: Option<String>) -> Result<AlbumPage> {
        debug!(has_page_token = page_token.is_some(), "Requesting album listing page");
        self.send_json(self.albums_request(page_token.as_deref()), "albums list")
            .await
    }

    async fn get_album(&self, album_id: &str) -> Result<AlbumInfo> {
        debug!(album_id = %album_id, "Requesting album");
        self.send_json(self.album_request(album_id), "album").await
    }

    async fn search_media_page(
        &self,
        album_id: &str,
        page_token: Option<String>,
    ) -> Result<MediaPage> {
        debug!(album_id = %album_id, has_page_token = page_token.is_some(), "Searching album media");
        self.send_json(
            self.search_request(album_id, page_token.as_deref()),
            "media search",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client_at(base_url: &str) -> PhotosClient {
        let config = HttpConfig {
            photos_base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(2),
            ..HttpConfig::default()
        };
        PhotosClient::new("token-abc", &config).unwrap()
    }

    #[test]
    fn test_album_request_carries_bearer_token() {
        let client = client_at("https://photos.example/v1");
        let request = client.album_request("alb1").build().unwrap();
        assert_eq!(request.url().path(), "/v1/albums/alb1");
        let auth = request.headers().get("authorization").unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer token-abc");
    }

    #[test]
    fn test_search_request_body() {
        let client = client_at("https://photos.example/v1");
        let request = client.search_request("alb1", None).build().unwrap();
        assert_eq!(request.url().path(), "/v1/mediaItems:search");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["albumId"], "alb1");
        assert_eq!(json["pageSize"], 100);
        assert!(json.get("pageToken").is_none());

        let request = client.search_request("alb1", Some("p2")).build().unwrap();
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["pageToken"], "p2");
    }

    #[test]
    fn test_albums_request_paging() {
        let client = client_at("https://photos.example/v1");
        let request = client.albums_request(Some("next")).build().unwrap();
        let query = request.url().query().unwrap();
        assert!(query.contains("pageSize=50"));
        assert!(query.contains("pageToken=next"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = client_at("http://127.0.0.1:1");
        let err = client.get_album("alb1").await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)), "got {err:?}");
    }
}
