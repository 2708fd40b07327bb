//! Shared fixtures for pipeline tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use crate::models::SyncConfig;
use crate::storage::SqliteStore;

/// Fixed "run start" instant.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - Duration::hours(hours)
}

/// Default sync settings without pacing delays.
pub fn sync_config() -> SyncConfig {
    SyncConfig {
        insert_delay_secs: 0,
        feed_delay_secs: 0,
        ..SyncConfig::default()
    }
}

pub async fn temp_store() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("state.db")).await.unwrap();
    (dir, store)
}
