//! Durable sync state.
//!
//! ## Tables
//!
//! ```text
//! items       # Ledger: every item ever added, keyed by item id
//! feeds       # Per-feed watermark, keyed by feed id
//! last_run    # Single row: last fully successful run
//! channel     # Single row: cached destination channel
//! collection  # Single row: cached destination playlist
//! ```

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Collection, CommittedItem, Feed, Watermark};

pub use sqlite::SqliteStore;

/// Trait for sync state backends.
///
/// Every operation is atomic on its own; there is no multi-statement transaction.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Stored watermark of a feed, `None` if the feed was never seen.
    async fn get_watermark(&self, feed_id: &str) -> Result<Option<Watermark>>;

    /// Create or advance a feed's watermark. An earlier `ts` than the stored one is ignored.
    async fn set_watermark(&self, feed: &Feed, ts: DateTime<Utc>) -> Result<()>;

    async fn get_last_run(&self) -> Result<Option<DateTime<Utc>>>;

    async fn set_last_run(&self, ts: DateTime<Utc>) -> Result<()>;

    /// Whether `item_id` is in the ledger, optionally only counting rows from one feed.
    async fn is_committed(&self, item_id: &str, feed_scope: Option<&str>) -> Result<bool>;

    /// Record that `item.feed_id` committed `item.item_id`.
    ///
    /// Rows are keyed by item and feed, so one item can have several owning
    /// feeds. Re-committing the same pair overwrites that row.
    async fn commit_item(&self, item: &CommittedItem) -> Result<()>;

    /// Titles of every committed item, for near-duplicate scanning.
    async fn committed_titles(&self) -> Result<Vec<String>>;

    /// Number of distinct committed items.
    async fn committed_count(&self) -> Result<u64>;

    async fn get_channel(&self) -> Result<Option<Feed>>;

    async fn set_channel(&self, channel: &Feed) -> Result<()>;

    async fn get_collection(&self) -> Result<Option<Collection>>;

    async fn set_collection(&self, collection: &Collection) -> Result<()>;
}
