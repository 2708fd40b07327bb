//! Fixture-backed client serving canned API responses from a directory.
//!
//! ## Directory Layout
//!
//! ```text
//! {dir}/
//! ├── subscriptions_list.json          # list_feeds
//! ├── subscription_activity_list.json  # list_activity (shared by every feed)
//! ├── channels_list.json               # list_channels
//! ├── user_playlists_list.json         # list_collections
//! ├── user_playlist.json               # list_destination
//! ├── videos_list.json                 # get_item_duration (optional)
//! └── add_to_playlist_respons.json     # insert_item (optional)
//! ```
//!
//! Each file is one page in the remote response shape. Inserts are logged
//! and never sent anywhere.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::client::wire::{self, ListResponse};
use crate::client::{ClientResult, FeedClient};
use crate::error::RemoteError;
use crate::models::{ActivityEntry, Collection, DestinationItem, Feed, Page};

const FEEDS_FILE: &str = "subscriptions_list.json";
const ACTIVITY_FILE: &str = "subscription_activity_list.json";
const CHANNELS_FILE: &str = "channels_list.json";
const COLLECTIONS_FILE: &str = "user_playlists_list.json";
const DESTINATION_FILE: &str = "user_playlist.json";
const VIDEOS_FILE: &str = "videos_list.json";
const INSERT_FILE: &str = "add_to_playlist_respons.json";

/// [`FeedClient`] reading JSON fixtures from disk.
pub struct FixtureClient {
    dir: PathBuf,
    api_calls: AtomicUsize,
}

impl FixtureClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            api_calls: AtomicUsize::new(0),
        }
    }

    /// Read and decode a fixture. A missing or malformed file is critical.
    async fn read<T: DeserializeOwned>(&self, operation: &str, file: &str) -> ClientResult<T> {
        self.read_optional(operation, file)
            .await?
            .ok_or_else(|| RemoteError::critical(operation, None, format!("fixture {file} not found")))
    }

    /// Like [`Self::read`], but a missing file yields `None`.
    async fn read_optional<T: DeserializeOwned>(
        &self,
        operation: &str,
        file: &str,
    ) -> ClientResult<Option<T>> {
        let path = self.dir.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RemoteError::critical(operation, None, e)),
        };
        log::debug!("{} served from {:?}", operation, path);
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| RemoteError::critical(operation, None, format!("{file}: {e}")))
    }
}

/// Fixtures are single pages; continuation tokens are ignored.
fn single_page<T>(mut page: Page<T>) -> Page<T> {
    page.next_page_token = None;
    page
}

#[async_trait]
impl FeedClient for FixtureClient {
    async fn list_feeds_page(&self, _page_token: Option<&str>) -> ClientResult<Page<Feed>> {
        let response: ListResponse<wire::Subscription> = self.read("list_feeds", FEEDS_FILE).await?;
        Ok(single_page(response.into_page(wire::Subscription::into_feed)))
    }

    async fn list_activity_page(
        &self,
        _feed_id: &str,
        published_after: DateTime<Utc>,
        _page_token: Option<&str>,
    ) -> ClientResult<Page<ActivityEntry>> {
        let response: ListResponse<wire::Activity> =
            self.read("list_activity", ACTIVITY_FILE).await?;
        let mut page = single_page(response.into_page(wire::Activity::into_entry));
        page.items.retain(|entry| entry.published_at >= published_after);
        Ok(page)
    }

    async fn list_channels(&self) -> ClientResult<Vec<Feed>> {
        let response: ListResponse<wire::Titled> = self.read("list_channels", CHANNELS_FILE).await?;
        Ok(response.into_page(wire::Titled::into_feed).items)
    }

    async fn list_collections_page(
        &self,
        _channel_id: &str,
        _page_token: Option<&str>,
    ) -> ClientResult<Page<Collection>> {
        let response: ListResponse<wire::Titled> =
            self.read("list_collections", COLLECTIONS_FILE).await?;
        Ok(single_page(response.into_page(wire::Titled::into_collection)))
    }

    async fn list_destination_page(
        &self,
        _collection_id: &str,
        _page_token: Option<&str>,
    ) -> ClientResult<Page<DestinationItem>> {
        let response: ListResponse<wire::PlaylistItem> =
            self.read("list_destination", DESTINATION_FILE).await?;
        Ok(single_page(
            response.into_page(wire::PlaylistItem::into_destination_item),
        ))
    }

    async fn get_item_duration(&self, item_id: &str) -> ClientResult<Option<u64>> {
        let response: Option<ListResponse<wire::Video>> =
            self.read_optional("get_item_duration", VIDEOS_FILE).await?;
        Ok(response.and_then(|r| wire::duration_of(r, item_id)))
    }

    async fn insert_item(&self, collection_id: &str, item_id: &str) -> ClientResult<Option<u64>> {
        log::info!("[fixture] insert {} into {} (not sent)", item_id, collection_id);
        let response: Option<wire::PlaylistItem> =
            self.read_optional("insert_item", INSERT_FILE).await?;
        Ok(response.and_then(|item| item.snippet.position))
    }

    fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{list_activity, list_feeds};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, content: &str) {
        std::fs::write(dir.path().join(file), content).unwrap();
    }

    fn fixture_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            FEEDS_FILE,
            r#"{ "nextPageToken": "ignored", "items": [
                { "snippet": { "title": "Alpha", "resourceId": { "channelId": "UC_A" } } },
                { "snippet": { "title": "Beta", "resourceId": { "channelId": "UC_B" } } }
            ] }"#,
        );
        write(
            &dir,
            ACTIVITY_FILE,
            r#"{ "items": [
                { "snippet": { "type": "upload", "title": "Old", "publishedAt": "2024-01-01T00:00:00Z" },
                  "contentDetails": { "upload": { "videoId": "old" } } },
                { "snippet": { "type": "upload", "title": "New", "publishedAt": "2024-06-01T00:00:00Z" },
                  "contentDetails": { "upload": { "videoId": "new" } } }
            ] }"#,
        );
        dir
    }

    #[tokio::test]
    async fn test_feeds_are_single_page() {
        let dir = fixture_dir();
        let client = FixtureClient::new(dir.path());
        let feeds = list_feeds(&client).await.unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[1].id, "UC_B");
        assert_eq!(client.api_calls(), 1);
    }

    #[tokio::test]
    async fn test_activity_respects_published_after() {
        let dir = fixture_dir();
        let client = FixtureClient::new(dir.path());
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let entries = list_activity(&client, "UC_A", after).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_id.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_missing_required_fixture_is_critical() {
        let dir = TempDir::new().unwrap();
        let client = FixtureClient::new(dir.path());
        let err = client.list_channels().await.unwrap_err();
        assert!(err.is_critical());
    }

    #[tokio::test]
    async fn test_optional_fixtures() {
        let dir = fixture_dir();
        let client = FixtureClient::new(dir.path());
        assert_eq!(client.get_item_duration("new").await.unwrap(), None);
        assert_eq!(client.insert_item("PL", "new").await.unwrap(), None);

        write(
            &dir,
            VIDEOS_FILE,
            r#"{ "items": [ { "id": "new", "contentDetails": { "duration": "PT1M30S" } } ] }"#,
        );
        write(
            &dir,
            INSERT_FILE,
            r#"{ "snippet": { "title": "New", "position": 4, "resourceId": { "videoId": "new" } } }"#,
        );
        assert_eq!(client.get_item_duration("new").await.unwrap(), Some(90));
        assert_eq!(client.insert_item("PL", "new").await.unwrap(), Some(4));
    }
}
