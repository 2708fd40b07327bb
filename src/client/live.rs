//! Live client for the remote REST API.
//!
//! Authentication is handled outside this crate: an OAuth access token is
//! read from the environment variable named in `remote.token_env`.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, header};
use serde::de::DeserializeOwned;
use url::Url;

use crate::client::wire::{self, ListResponse};
use crate::client::{ClientResult, FeedClient};
use crate::error::{AppError, RemoteError, Result};
use crate::models::{ActivityEntry, Collection, DestinationItem, Feed, Page, RemoteConfig};
use crate::utils::http;

/// HTTP-backed [`FeedClient`].
pub struct LiveClient {
    client: Client,
    base_url: Url,
    token: String,
    page_size: u32,
    critical_statuses: Vec<u16>,
    api_calls: AtomicUsize,
}

impl LiveClient {
    /// Build a client from configuration, reading the access token from the environment.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            AppError::config(format!(
                "Access token not found: set {} (or use --fixtures)",
                config.token_env
            ))
        })?;
        Self::new(config, token)
    }

    /// Build a client with an explicit access token.
    pub fn new(config: &RemoteConfig, token: impl Into<String>) -> Result<Self> {
        // Trailing slash so `join` appends instead of replacing the last segment.
        let base = format!("{}/", config.api_base_url.trim_end_matches('/'));
        Ok(Self {
            client: http::create_async_client(config)?,
            base_url: Url::parse(&base)?,
            token: token.into(),
            page_size: config.page_size,
            critical_statuses: config.critical_statuses.clone(),
            api_calls: AtomicUsize::new(0),
        })
    }

    fn endpoint(&self, operation: &str, resource: &str, params: &[(&str, &str)]) -> ClientResult<Url> {
        let mut url = self
            .base_url
            .join(resource)
            .map_err(|e| RemoteError::critical(operation, None, e))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    fn classify(&self, operation: &str, status: Option<u16>, message: impl std::fmt::Display) -> RemoteError {
        RemoteError::classify(operation, status, message, &self.critical_statuses)
    }

    /// Send a request and decode the JSON body, classifying any failure.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> ClientResult<T> {
        log::debug!("{} {} {}", operation, method, url);

        let mut request = self.client.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify(operation, e.status().map(|s| s.as_u16()), e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.classify(operation, Some(status.as_u16()), e))?;

        if !status.is_success() {
            let err = self.classify(operation, Some(status.as_u16()), wire::error_message(&text));
            log::warn!("{}", err);
            return Err(err);
        }

        self.api_calls.fetch_add(1, Ordering::Relaxed);
        serde_json::from_str(&text).map_err(|e| self.classify(operation, None, e))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        resource: &str,
        params: &[(&str, &str)],
    ) -> ClientResult<T> {
        let url = self.endpoint(operation, resource, params)?;
        self.send(operation, Method::GET, url, None).await
    }

    /// Common list parameters plus an optional page token.
    fn list_params<'a>(
        &self,
        page_size: &'a str,
        page_token: Option<&'a str>,
        extra: &[(&'a str, &'a str)],
    ) -> Vec<(&'a str, &'a str)> {
        let mut params = vec![("maxResults", page_size)];
        params.extend_from_slice(extra);
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        params
    }
}

#[async_trait]
impl FeedClient for LiveClient {
    async fn list_feeds_page(&self, page_token: Option<&str>) -> ClientResult<Page<Feed>> {
        let size = self.page_size.to_string();
        let params = self.list_params(
            &size,
            page_token,
            &[("part", "snippet"), ("mine", "true"), ("order", "alphabetical")],
        );
        let response: ListResponse<wire::Subscription> =
            self.get("list_feeds", "subscriptions", &params).await?;
        Ok(response.into_page(wire::Subscription::into_feed))
    }

    async fn list_activity_page(
        &self,
        feed_id: &str,
        published_after: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ClientResult<Page<ActivityEntry>> {
        let size = self.page_size.to_string();
        let after = published_after.to_rfc3339_opts(SecondsFormat::Secs, true);
        let params = self.list_params(
            &size,
            page_token,
            &[
                ("part", "snippet,contentDetails"),
                ("channelId", feed_id),
                ("publishedAfter", after.as_str()),
            ],
        );
        let response: ListResponse<wire::Activity> =
            self.get("list_activity", "activities", &params).await?;
        Ok(response.into_page(wire::Activity::into_entry))
    }

    async fn list_channels(&self) -> ClientResult<Vec<Feed>> {
        let response: ListResponse<wire::Titled> = self
            .get("list_channels", "channels", &[("part", "snippet"), ("mine", "true")])
            .await?;
        Ok(response.into_page(wire::Titled::into_feed).items)
    }

    async fn list_collections_page(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> ClientResult<Page<Collection>> {
        let size = self.page_size.to_string();
        let params = self.list_params(
            &size,
            page_token,
            &[("part", "snippet"), ("channelId", channel_id)],
        );
        let response: ListResponse<wire::Titled> =
            self.get("list_collections", "playlists", &params).await?;
        Ok(response.into_page(wire::Titled::into_collection))
    }

    async fn list_destination_page(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> ClientResult<Page<DestinationItem>> {
        let size = self.page_size.to_string();
        let params = self.list_params(
            &size,
            page_token,
            &[("part", "snippet"), ("playlistId", collection_id)],
        );
        let response: ListResponse<wire::PlaylistItem> =
            self.get("list_destination", "playlistItems", &params).await?;
        Ok(response.into_page(wire::PlaylistItem::into_destination_item))
    }

    async fn get_item_duration(&self, item_id: &str) -> ClientResult<Option<u64>> {
        let response: ListResponse<wire::Video> = self
            .get(
                "get_item_duration",
                "videos",
                &[("part", "contentDetails"), ("id", item_id)],
            )
            .await?;
        Ok(wire::first_duration(response))
    }

    async fn insert_item(&self, collection_id: &str, item_id: &str) -> ClientResult<Option<u64>> {
        let operation = "insert_item";
        let url = self.endpoint(operation, "playlistItems", &[("part", "snippet")])?;
        let body = serde_json::to_vec(&wire::InsertRequest::new(collection_id, item_id))
            .map_err(|e| RemoteError::critical(operation, None, e))?;
        let inserted: wire::PlaylistItem = self
            .send(operation, Method::POST, url, Some(body))
            .await?;
        Ok(inserted.snippet.position)
    }

    fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::Relaxed)
    }
}
