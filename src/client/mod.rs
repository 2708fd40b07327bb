//! Remote feed client abstraction.
//!
//! The sync engine only talks to [`FeedClient`]. Two implementations exist:
//! - [`LiveClient`]: the remote REST API over HTTP
//! - [`FixtureClient`]: canned JSON responses from a local directory
//!
//! Listing operations are exposed page by page; [`paginate`] turns a page
//! fetcher into a lazy stream that follows continuation tokens iteratively.

pub mod fixture;
pub mod live;
#[cfg(test)]
pub mod mock;
mod wire;

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, TryStreamExt};

use crate::error::{AppError, RemoteError, Result};
use crate::models::{ActivityEntry, Collection, DestinationItem, Feed, Page};

pub use fixture::FixtureClient;
pub use live::LiveClient;

/// Result of a single remote call.
pub type ClientResult<T> = std::result::Result<T, RemoteError>;

/// Operations consumed from the remote feed service.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// One page of the user's subscriptions, in stable discovery order.
    async fn list_feeds_page(&self, page_token: Option<&str>) -> ClientResult<Page<Feed>>;

    /// One page of a feed's activity published at or after `published_after`.
    async fn list_activity_page(
        &self,
        feed_id: &str,
        published_after: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ClientResult<Page<ActivityEntry>>;

    /// Channels owned by the authenticated user.
    async fn list_channels(&self) -> ClientResult<Vec<Feed>>;

    /// One page of the collections owned by a channel.
    async fn list_collections_page(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> ClientResult<Page<Collection>>;

    /// One page of the items currently in a collection.
    async fn list_destination_page(
        &self,
        collection_id: &str,
        page_token: Option<&str>,
    ) -> ClientResult<Page<DestinationItem>>;

    /// Item duration in seconds, `None` when the remote does not know the item.
    async fn get_item_duration(&self, item_id: &str) -> ClientResult<Option<u64>>;

    /// Append an item to a collection, returning its position when reported.
    async fn insert_item(&self, collection_id: &str, item_id: &str) -> ClientResult<Option<u64>>;

    /// Number of successful remote calls made so far.
    fn api_calls(&self) -> usize;
}

/// Lazily fetch pages until no continuation token remains.
///
/// Each call starts from the first page again.
pub fn paginate<T, F, Fut>(fetch: F) -> impl Stream<Item = ClientResult<Vec<T>>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ClientResult<Page<T>>>,
{
    stream::try_unfold((fetch, Some(None)), |(mut fetch, cursor)| async move {
        // `None` cursor: the previous page was the last one.
        let Some(token) = cursor else {
            return Ok(None);
        };
        let page = fetch(token).await?;
        let next = page
            .next_page_token
            .filter(|t| !t.is_empty())
            .map(Some);
        Ok::<_, RemoteError>(Some((page.items, (fetch, next))))
    })
}

/// All subscriptions, flattened across pages.
pub async fn list_feeds(client: &dyn FeedClient) -> ClientResult<Vec<Feed>> {
    paginate(move |token| async move { client.list_feeds_page(token.as_deref()).await })
        .try_concat()
        .await
}

/// All activity for a feed since `published_after`, flattened across pages.
pub async fn list_activity(
    client: &dyn FeedClient,
    feed_id: &str,
    published_after: DateTime<Utc>,
) -> ClientResult<Vec<ActivityEntry>> {
    paginate(move |token| async move {
        client
            .list_activity_page(feed_id, published_after, token.as_deref())
            .await
    })
    .try_concat()
    .await
}

/// All collections of a channel.
pub async fn list_collections(
    client: &dyn FeedClient,
    channel_id: &str,
) -> ClientResult<Vec<Collection>> {
    paginate(move |token| async move {
        client
            .list_collections_page(channel_id, token.as_deref())
            .await
    })
    .try_concat()
    .await
}

/// All items currently in the destination collection.
pub async fn list_destination_items(
    client: &dyn FeedClient,
    collection_id: &str,
) -> ClientResult<Vec<DestinationItem>> {
    paginate(move |token| async move {
        client
            .list_destination_page(collection_id, token.as_deref())
            .await
    })
    .try_concat()
    .await
}

/// First entry whose title contains `filter`. An empty filter matches the first entry.
fn first_match<T>(entries: Vec<T>, filter: &str, title: impl Fn(&T) -> &str) -> Option<T> {
    entries.into_iter().find(|e| title(e).contains(filter))
}

/// Select the user's channel by title substring.
pub async fn resolve_channel(client: &dyn FeedClient, filter: &str) -> Result<Feed> {
    let channels = client.list_channels().await?;
    log::info!("Channels available: {}", channels.len());
    first_match(channels, filter, |c| c.title.as_str())
        .ok_or_else(|| AppError::config(format!("No channel title contains {filter:?}")))
}

/// Select a collection of `channel` by title substring.
pub async fn resolve_collection(
    client: &dyn FeedClient,
    channel: &Feed,
    filter: &str,
) -> Result<Collection> {
    let collections = list_collections(client, &channel.id).await?;
    log::info!("Playlists on channel {}: {}", channel, collections.len());
    first_match(collections, filter, |c| c.title.as_str())
        .ok_or_else(|| AppError::config(format!("No playlist title contains {filter:?}")))
}
