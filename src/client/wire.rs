//! JSON shapes of the remote API responses.
//!
//! Shared by the live and fixture clients. Only the fields the sync needs
//! are modelled; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ActivityEntry, ActivityKind, Collection, DestinationItem, Feed, Page};
use crate::utils::duration::parse_iso8601_duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl<T> ListResponse<T> {
    /// Convert into a model page, dropping entries that fail `convert`.
    pub fn into_page<U>(self, convert: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            items: self.items.into_iter().filter_map(convert).collect(),
            next_page_token: self.next_page_token,
            total_results: self.page_info.and_then(|p| p.total_results),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

// --- subscriptions ---

#[derive(Debug, Deserialize)]
pub(crate) struct Subscription {
    pub snippet: SubscriptionSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionSnippet {
    pub title: String,
    pub resource_id: ResourceId,
}

impl Subscription {
    pub fn into_feed(self) -> Option<Feed> {
        let id = self.snippet.resource_id.channel_id?;
        Some(Feed::new(id, self.snippet.title))
    }
}

// --- activities ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Activity {
    pub snippet: ActivitySnippet,
    #[serde(default)]
    pub content_details: ActivityDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivitySnippet {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActivityDetails {
    #[serde(default)]
    pub upload: Option<UploadDetails>,
    #[serde(default)]
    pub playlist_item: Option<PlaylistItemDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadDetails {
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemDetails {
    #[serde(default)]
    pub resource_id: ResourceId,
}

impl Activity {
    pub fn into_entry(self) -> Option<ActivityEntry> {
        let kind = ActivityKind::parse(&self.snippet.kind);
        let details = self.content_details;
        let item_id = match kind {
            ActivityKind::Upload => details.upload.map(|u| u.video_id),
            ActivityKind::PlaylistItem => details.playlist_item.and_then(|p| p.resource_id.video_id),
            ActivityKind::Other(_) => None,
        };
        Some(ActivityEntry {
            kind,
            title: self.snippet.title,
            item_id,
            published_at: self.snippet.published_at,
        })
    }
}

// --- channels & playlists ---

#[derive(Debug, Deserialize)]
pub(crate) struct Titled {
    pub id: String,
    pub snippet: TitleSnippet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TitleSnippet {
    #[serde(default)]
    pub title: String,
}

impl Titled {
    pub fn into_feed(self) -> Option<Feed> {
        Some(Feed::new(self.id, self.snippet.title))
    }

    pub fn into_collection(self) -> Option<Collection> {
        Some(Collection::new(self.id, self.snippet.title))
    }
}

// --- playlist items ---

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub resource_id: ResourceId,
    #[serde(default)]
    pub position: Option<u64>,
}

impl PlaylistItem {
    pub fn into_destination_item(self) -> Option<DestinationItem> {
        let item_id = self.snippet.resource_id.video_id?;
        Some(DestinationItem {
            title: self.snippet.title,
            item_id,
        })
    }
}

/// Body of a playlist insert request.
#[derive(Debug, Serialize)]
pub(crate) struct InsertRequest<'a> {
    pub snippet: InsertSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InsertSnippet<'a> {
    pub playlist_id: &'a str,
    pub resource_id: ResourceId,
}

impl<'a> InsertRequest<'a> {
    pub fn new(collection_id: &'a str, item_id: &str) -> Self {
        Self {
            snippet: InsertSnippet {
                playlist_id: collection_id,
                resource_id: ResourceId {
                    kind: Some("youtube#video".into()),
                    channel_id: None,
                    video_id: Some(item_id.to_string()),
                },
            },
        }
    }
}

// --- videos ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Video {
    #[serde(default)]
    pub id: Option<String>,
    pub content_details: VideoDetails,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoDetails {
    pub duration: String,
}

/// Duration of the first video in a `videos` listing.
pub(crate) fn first_duration(response: ListResponse<Video>) -> Option<u64> {
    response
        .items
        .into_iter()
        .next()
        .and_then(|v| parse_iso8601_duration(&v.content_details.duration))
}

/// Duration of the video with the given id, for listings that hold several.
pub(crate) fn duration_of(response: ListResponse<Video>, item_id: &str) -> Option<u64> {
    response
        .items
        .into_iter()
        .find(|v| v.id.as_deref() == Some(item_id))
        .and_then(|v| parse_iso8601_duration(&v.content_details.duration))
}

/// Extract the human readable message from an API error body.
pub(crate) fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ErrorBody,
    }
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    serde_json::from_str::<Envelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_upload_and_playlist_item() {
        let json = r#"{
            "nextPageToken": "CAUQAA",
            "pageInfo": { "totalResults": 3 },
            "items": [
                { "snippet": { "type": "upload", "title": "New video", "publishedAt": "2024-05-01T10:00:00Z" },
                  "contentDetails": { "upload": { "videoId": "vid1" } } },
                { "snippet": { "type": "playlistItem", "title": "Saved", "publishedAt": "2024-05-02T10:00:00Z" },
                  "contentDetails": { "playlistItem": { "resourceId": { "kind": "youtube#video", "videoId": "vid2" } } } },
                { "snippet": { "type": "like", "title": "Liked", "publishedAt": "2024-05-03T10:00:00Z" } }
            ]
        }"#;
        let response: ListResponse<Activity> = serde_json::from_str(json).unwrap();
        let page = response.into_page(Activity::into_entry);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.next_page_token.as_deref(), Some("CAUQAA"));
        assert_eq!(page.total_results, Some(3));
        assert_eq!(page.items[0].item_id.as_deref(), Some("vid1"));
        assert_eq!(page.items[1].item_id.as_deref(), Some("vid2"));
        assert_eq!(page.items[2].item_id, None);
    }

    #[test]
    fn test_subscription_to_feed() {
        let json = r#"{ "items": [
            { "snippet": { "title": "Some Channel", "resourceId": { "kind": "youtube#channel", "channelId": "UC123" } } }
        ] }"#;
        let response: ListResponse<Subscription> = serde_json::from_str(json).unwrap();
        let page = response.into_page(Subscription::into_feed);
        assert_eq!(page.items, vec![Feed::new("UC123", "Some Channel")]);
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_insert_request_shape() {
        let body = serde_json::to_value(InsertRequest::new("PL1", "vid9")).unwrap();
        assert_eq!(body["snippet"]["playlistId"], "PL1");
        assert_eq!(body["snippet"]["resourceId"]["videoId"], "vid9");
        assert_eq!(body["snippet"]["resourceId"]["kind"], "youtube#video");
        assert!(body["snippet"]["resourceId"].get("channelId").is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{ "error": { "code": 403, "message": "quotaExceeded" } }"#;
        assert_eq!(error_message(body), "quotaExceeded");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[test]
    fn test_first_duration() {
        let json = r#"{ "items": [ { "contentDetails": { "duration": "PT4M13S" } } ] }"#;
        let response: ListResponse<Video> = serde_json::from_str(json).unwrap();
        assert_eq!(first_duration(response), Some(253));
    }

    #[test]
    fn test_duration_of_matches_id() {
        let json = r#"{ "items": [
            { "id": "a", "contentDetails": { "duration": "PT45S" } },
            { "id": "b", "contentDetails": { "duration": "PT2M" } }
        ] }"#;
        let response: ListResponse<Video> = serde_json::from_str(json).unwrap();
        assert_eq!(duration_of(response, "b"), Some(120));
    }
}
