//! Durable state records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An item that was appended to the destination. Primary key is `item_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommittedItem {
    pub item_id: String,
    pub committed_at: DateTime<Utc>,
    pub title: String,
    pub feed_id: String,
}

/// Per-feed "already processed up to" marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Watermark {
    pub feed_id: String,
    pub feed_title: String,
    pub last_processed: DateTime<Utc>,
}
