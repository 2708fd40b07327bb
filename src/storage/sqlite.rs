//! SQLite state store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::Result;
use crate::models::{Collection, CommittedItem, Feed, Watermark};
use crate::storage::StateStore;
use crate::utils::time::{format_timestamp, parse_timestamp};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS items (
        item_id      TEXT NOT NULL,
        feed_id      TEXT NOT NULL,
        committed_at TEXT NOT NULL,
        title        TEXT NOT NULL,
        PRIMARY KEY (item_id, feed_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS feeds (
        feed_id        TEXT PRIMARY KEY,
        title          TEXT NOT NULL,
        last_processed TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS last_run (
        id        INTEGER PRIMARY KEY CHECK (id = 1),
        timestamp TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS channel (
        id         INTEGER PRIMARY KEY CHECK (id = 1),
        channel_id TEXT NOT NULL,
        title      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collection (
        id            INTEGER PRIMARY KEY CHECK (id = 1),
        collection_id TEXT NOT NULL,
        title         TEXT NOT NULL
    )
    "#,
];

/// [`StateStore`] backed by a SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        log::debug!("State store opened at {:?}", path.as_ref());
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get_watermark(&self, feed_id: &str) -> Result<Option<Watermark>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT title, last_processed FROM feeds WHERE feed_id = ?")
                .bind(feed_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(feed_title, ts)| {
            Ok(Watermark {
                feed_id: feed_id.to_string(),
                feed_title,
                last_processed: parse_timestamp(&ts)?,
            })
        })
        .transpose()
    }

    async fn set_watermark(&self, feed: &Feed, ts: DateTime<Utc>) -> Result<()> {
        // Stored timestamps share one fixed format, so MAX() compares them chronologically.
        sqlx::query(
            r#"
            INSERT INTO feeds (feed_id, title, last_processed) VALUES (?, ?, ?)
            ON CONFLICT(feed_id) DO UPDATE SET
                title = excluded.title,
                last_processed = MAX(feeds.last_processed, excluded.last_processed)
            "#,
        )
        .bind(&feed.id)
        .bind(&feed.title)
        .bind(format_timestamp(&ts))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_last_run(&self) -> Result<Option<DateTime<Utc>>> {
        let ts: Option<String> = sqlx::query_scalar("SELECT timestamp FROM last_run WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        ts.as_deref().map(parse_timestamp).transpose()
    }

    async fn set_last_run(&self, ts: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO last_run (id, timestamp) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET timestamp = excluded.timestamp
            "#,
        )
        .bind(format_timestamp(&ts))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_committed(&self, item_id: &str, feed_scope: Option<&str>) -> Result<bool> {
        let exists: bool = match feed_scope {
            Some(feed_id) => {
                sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM items WHERE item_id = ? AND feed_id = ?)",
                )
                .bind(item_id)
                .bind(feed_id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE item_id = ?)")
                    .bind(item_id)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(exists)
    }

    async fn commit_item(&self, item: &CommittedItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (item_id, feed_id, committed_at, title) VALUES (?, ?, ?, ?)
            ON CONFLICT(item_id, feed_id) DO UPDATE SET
                committed_at = excluded.committed_at,
                title = excluded.title
            "#,
        )
        .bind(&item.item_id)
        .bind(&item.feed_id)
        .bind(format_timestamp(&item.committed_at))
        .bind(&item.title)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn committed_titles(&self) -> Result<Vec<String>> {
        let titles: Vec<String> = sqlx::query_scalar(
            "SELECT title FROM items GROUP BY item_id ORDER BY MIN(committed_at), item_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(titles)
    }

    async fn committed_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT item_id) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn get_channel(&self) -> Result<Option<Feed>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT channel_id, title FROM channel WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, title)| Feed::new(id, title)))
    }

    async fn set_channel(&self, channel: &Feed) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channel (id, channel_id, title) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET channel_id = excluded.channel_id, title = excluded.title
            "#,
        )
        .bind(&channel.id)
        .bind(&channel.title)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_collection(&self) -> Result<Option<Collection>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT collection_id, title FROM collection WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, title)| Collection::new(id, title)))
    }

    async fn set_collection(&self, collection: &Collection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collection (id, collection_id, title) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                collection_id = excluded.collection_id,
                title = excluded.title
            "#,
        )
        .bind(&collection.id)
        .bind(&collection.title)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("state.db")).await.unwrap();
        (dir, store)
    }

    fn item(id: &str, title: &str, feed: &str) -> CommittedItem {
        CommittedItem {
            item_id: id.to_string(),
            committed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            title: title.to_string(),
            feed_id: feed.to_string(),
        }
    }

    #[tokio::test]
    async fn test_watermark_never_moves_backward() {
        let (_dir, store) = store().await;
        let feed = Feed::new("UC_A", "Alpha");
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        assert!(store.get_watermark("UC_A").await.unwrap().is_none());
        store.set_watermark(&feed, late).await.unwrap();
        store.set_watermark(&feed, early).await.unwrap();

        let wm = store.get_watermark("UC_A").await.unwrap().unwrap();
        assert_eq!(wm.last_processed, late);
        assert_eq!(wm.feed_title, "Alpha");
    }

    #[tokio::test]
    async fn test_commit_is_idempotent_upsert() {
        let (_dir, store) = store().await;
        store.commit_item(&item("v1", "First", "UC_A")).await.unwrap();
        store.commit_item(&item("v1", "First (again)", "UC_A")).await.unwrap();
        store.commit_item(&item("v2", "Second", "UC_B")).await.unwrap();

        assert_eq!(store.committed_count().await.unwrap(), 2);
        let titles = store.committed_titles().await.unwrap();
        assert!(titles.contains(&"First (again)".to_string()));
    }

    #[tokio::test]
    async fn test_item_keeps_every_owning_feed() {
        let (_dir, store) = store().await;
        store.commit_item(&item("shared", "Collab", "UC_A")).await.unwrap();
        store.commit_item(&item("shared", "Collab", "UC_B")).await.unwrap();

        assert!(store.is_committed("shared", Some("UC_A")).await.unwrap());
        assert!(store.is_committed("shared", Some("UC_B")).await.unwrap());
        assert!(!store.is_committed("shared", Some("UC_C")).await.unwrap());
        assert_eq!(store.committed_count().await.unwrap(), 1);
        assert_eq!(store.committed_titles().await.unwrap(), vec!["Collab"]);
    }

    #[tokio::test]
    async fn test_is_committed_scoped() {
        let (_dir, store) = store().await;
        store.commit_item(&item("v1", "First", "UC_A")).await.unwrap();

        assert!(store.is_committed("v1", None).await.unwrap());
        assert!(store.is_committed("v1", Some("UC_A")).await.unwrap());
        assert!(!store.is_committed("v1", Some("UC_B")).await.unwrap());
        assert!(!store.is_committed("v9", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_last_run_and_destination_cache() {
        let (_dir, store) = store().await;
        assert!(store.get_last_run().await.unwrap().is_none());
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        store.set_last_run(ts).await.unwrap();
        assert_eq!(store.get_last_run().await.unwrap(), Some(ts));

        store.set_channel(&Feed::new("UC_ME", "Me")).await.unwrap();
        store
            .set_collection(&Collection::new("PL_1", "Later"))
            .await
            .unwrap();
        assert_eq!(store.get_channel().await.unwrap().unwrap().id, "UC_ME");
        assert_eq!(store.get_collection().await.unwrap().unwrap().title, "Later");
    }

    #[tokio::test]
    async fn test_reopen_keeps_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.commit_item(&item("v1", "First", "UC_A")).await.unwrap();
            store.close().await;
        }
        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(store.committed_count().await.unwrap(), 1);
    }
}
