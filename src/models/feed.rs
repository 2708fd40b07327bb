//! Feed, destination and activity data structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked subscription, or the user's own channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    /// Stable unique identifier
    pub id: String,

    /// Display title (informational)
    pub title: String,
}

impl Feed {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.title, self.id)
    }
}

/// The destination collection (playlist) items are appended to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub title: String,
}

impl Collection {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.title, self.id)
    }
}

/// Type of a feed activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    /// The feed published a new item
    Upload,
    /// The feed added an item to one of its own collections
    PlaylistItem,
    /// Anything else (likes, comments, recommendations, ...)
    Other(String),
}

impl ActivityKind {
    /// Parse the remote activity type string.
    pub fn parse(kind: &str) -> Self {
        match kind {
            "upload" => ActivityKind::Upload,
            "playlistItem" => ActivityKind::PlaylistItem,
            other => ActivityKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActivityKind::Upload => "upload",
            ActivityKind::PlaylistItem => "playlistItem",
            ActivityKind::Other(kind) => kind,
        }
    }
}

/// One raw entry of a feed's activity listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub title: String,
    /// Missing for activity kinds that do not reference an item
    pub item_id: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// An item fetched during this run that is not yet accepted or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub item_id: String,
    pub published_at: DateTime<Utc>,
    pub kind: ActivityKind,
}

impl Candidate {
    /// Build a candidate from an activity entry.
    ///
    /// Returns `None` for kinds that are not accepted or entries without an item id.
    pub fn from_activity(entry: ActivityEntry, include_playlist_adds: bool) -> Option<Self> {
        let accepted = match entry.kind {
            ActivityKind::Upload => true,
            ActivityKind::PlaylistItem => include_playlist_adds,
            ActivityKind::Other(_) => false,
        };
        if !accepted {
            return None;
        }
        let item_id = entry.item_id.filter(|id| !id.trim().is_empty())?;
        Some(Self {
            title: entry.title,
            item_id,
            published_at: entry.published_at,
            kind: entry.kind,
        })
    }
}

/// Normalize raw activity into candidates, newest first.
pub fn to_candidates(entries: Vec<ActivityEntry>, include_playlist_adds: bool) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = entries
        .into_iter()
        .filter_map(|entry| Candidate::from_activity(entry, include_playlist_adds))
        .collect();
    candidates.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    candidates
}

/// An item currently present in the destination collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationItem {
    pub title: String,
    pub item_id: String,
}
