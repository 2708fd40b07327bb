//! Scripted in-memory client for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::client::{ClientResult, FeedClient};
use crate::error::RemoteError;
use crate::models::{ActivityEntry, ActivityKind, Collection, DestinationItem, Feed, Page};

/// Upload activity entry.
pub fn upload(item_id: &str, title: &str, published_at: DateTime<Utc>) -> ActivityEntry {
    ActivityEntry {
        kind: ActivityKind::Upload,
        title: title.to_string(),
        item_id: Some(item_id.to_string()),
        published_at,
    }
}

#[derive(Default)]
struct MockState {
    feeds: Vec<Feed>,
    activity: HashMap<String, Vec<ActivityEntry>>,
    durations: HashMap<String, u64>,
    destination: Vec<DestinationItem>,
    /// Keyed by (operation, feed or item id)
    failures: HashMap<(String, String), RemoteError>,
    activity_calls: HashMap<String, usize>,
    duration_calls: usize,
    inserted: Vec<String>,
    api_calls: usize,
}

/// [`FeedClient`] serving scripted feeds, with injectable failures.
pub struct MockClient {
    page_size: usize,
    channels: Vec<Feed>,
    collections: Vec<Collection>,
    state: Mutex<MockState>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            page_size: 2,
            channels: vec![Feed::new("UC_ME", "My Channel")],
            collections: vec![Collection::new("PL_LATER", "Later")],
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_feed(self, feed: Feed, entries: Vec<ActivityEntry>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.activity.insert(feed.id.clone(), entries);
            state.feeds.push(feed);
        }
        self
    }

    pub fn with_duration(self, item_id: &str, seconds: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .durations
            .insert(item_id.to_string(), seconds);
        self
    }

    pub fn with_destination(self, items: Vec<DestinationItem>) -> Self {
        self.state.lock().unwrap().destination = items;
        self
    }

    /// Make `operation` fail for `key` (feed id or item id).
    pub fn fail(&self, operation: &str, key: &str, error: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((operation.to_string(), key.to_string()), error);
    }

    /// Publish a new entry on an existing feed.
    pub fn push_activity(&self, feed_id: &str, entry: ActivityEntry) {
        self.state
            .lock()
            .unwrap()
            .activity
            .entry(feed_id.to_string())
            .or_default()
            .push(entry);
    }

    /// Number of activity page requests made for a feed.
    pub fn activity_calls(&self, feed_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .activity_calls
            .get(feed_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn duration_calls(&self) -> usize {
        self.state.lock().unwrap().duration_calls
    }

    /// Item ids inserted so far, in order.
    pub fn inserted(&self) -> Vec<String> {
        self.state.lock().unwrap().inserted.clone()
    }

    fn check(&self, state: &MockState, operation: &str, key: &str) -> ClientResult<()> {
        match state.failures.get(&(operation.to_string(), key.to_string())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn page_of<T: Clone>(&self, items: &[T], page_token: Option<&str>) -> Page<T> {
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        let next = (end < items.len()).then(|| end.to_string());
        Page {
            items: items[start.min(end)..end].to_vec(),
            next_page_token: next,
            total_results: Some(items.len() as u64),
        }
    }
}

#[async_trait]
impl FeedClient for MockClient {
    async fn list_feeds_page(&self, page_token: Option<&str>) -> ClientResult<Page<Feed>> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, "list_feeds", "")?;
        state.api_calls += 1;
        Ok(self.page_of(&state.feeds, page_token))
    }

    async fn list_activity_page(
        &self,
        feed_id: &str,
        published_after: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ClientResult<Page<ActivityEntry>> {
        let mut state = self.state.lock().unwrap();
        *state.activity_calls.entry(feed_id.to_string()).or_default() += 1;
        self.check(&state, "list_activity", feed_id)?;
        state.api_calls += 1;
        let entries: Vec<ActivityEntry> = state
            .activity
            .get(feed_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.published_at >= published_after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(self.page_of(&entries, page_token))
    }

    async fn list_channels(&self) -> ClientResult<Vec<Feed>> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, "list_channels", "")?;
        state.api_calls += 1;
        Ok(self.channels.clone())
    }

    async fn list_collections_page(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> ClientResult<Page<Collection>> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, "list_collections", channel_id)?;
        state.api_calls += 1;
        Ok(self.page_of(&self.collections, page_token))
    }

    async fn list_destination_page(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> ClientResult<Page<DestinationItem>> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, "list_destination", collection_id)?;
        state.api_calls += 1;
        Ok(self.page_of(&state.destination, page_token))
    }

    async fn get_item_duration(&self, item_id: &str) -> ClientResult<Option<u64>> {
        let mut state = self.state.lock().unwrap();
        state.duration_calls += 1;
        self.check(&state, "get_item_duration", item_id)?;
        state.api_calls += 1;
        Ok(state.durations.get(item_id).copied())
    }

    async fn insert_item(&self, _collection_id: &str, item_id: &str) -> ClientResult<Option<u64>> {
        let mut state = self.state.lock().unwrap();
        self.check(&state, "insert_item", item_id)?;
        state.api_calls += 1;
        let title = state
            .activity
            .values()
            .flatten()
            .find(|e| e.item_id.as_deref() == Some(item_id))
            .map(|e| e.title.clone())
            .unwrap_or_default();
        state.destination.push(DestinationItem {
            title,
            item_id: item_id.to_string(),
        });
        state.inserted.push(item_id.to_string());
        Ok(Some(state.destination.len() as u64 - 1))
    }

    fn api_calls(&self) -> usize {
        self.state.lock().unwrap().api_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::list_activity;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_mock_pages_activity() {
        let t = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap();
        let client = MockClient::new().with_feed(
            Feed::new("UC_A", "A"),
            vec![upload("a1", "one", t(1)), upload("a2", "two", t(2)), upload("a3", "three", t(3))],
        );
        let all = list_activity(&client, "UC_A", t(0)).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(client.activity_calls("UC_A"), 2);

        let recent = list_activity(&client, "UC_A", t(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
