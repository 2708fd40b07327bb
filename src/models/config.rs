//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote API access settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Persistent state settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Incremental sync behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Candidate filtering rules
    #[serde(default)]
    pub filter: FilterConfig,

    /// Destination channel and playlist selection
    #[serde(default)]
    pub destination: DestinationConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Fixture responses are never sent anywhere, so nothing may be recorded
    /// either: a fixture directory forces dry-run. Returns whether it did.
    pub fn apply_fixture_mode(&mut self) -> bool {
        if self.remote.fixture_dir.is_none() || self.sync.dry_run {
            return false;
        }
        self.sync.dry_run = true;
        true
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.remote.api_base_url.trim().is_empty() {
            return Err(AppError::validation("remote.api_base_url is empty"));
        }
        if self.remote.user_agent.trim().is_empty() {
            return Err(AppError::validation("remote.user_agent is empty"));
        }
        if self.remote.timeout_secs == 0 {
            return Err(AppError::validation("remote.timeout_secs must be > 0"));
        }
        if self.remote.page_size == 0 || self.remote.page_size > 50 {
            return Err(AppError::validation("remote.page_size must be in 1..=50"));
        }
        if self.storage.database_path.trim().is_empty() {
            return Err(AppError::validation("storage.database_path is empty"));
        }
        if self.sync.lookback_days <= 0 {
            return Err(AppError::validation("sync.lookback_days must be > 0"));
        }
        let filter = &self.filter;
        if filter.max_duration_secs != 0 && filter.max_duration_secs < filter.min_duration_secs {
            return Err(AppError::validation(
                "filter.max_duration_secs must be 0 or >= filter.min_duration_secs",
            ));
        }
        let threshold = filter.similarity.effective_threshold();
        match filter.similarity.policy {
            SimilarityPolicy::Ratio if !(0.0..=100.0).contains(&threshold) => {
                return Err(AppError::validation(
                    "filter.similarity.threshold must be within 0..=100 for the ratio policy",
                ));
            }
            SimilarityPolicy::EditDistance if threshold < 0.0 => {
                return Err(AppError::validation(
                    "filter.similarity.threshold must be >= 0 for the edit_distance policy",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Remote API access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote REST API
    #[serde(default = "defaults::api_base_url")]
    pub api_base_url: String,

    /// Environment variable holding the OAuth access token
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Results requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Status codes that abort the whole run
    #[serde(default = "defaults::critical_statuses")]
    pub critical_statuses: Vec<u16>,

    /// Serve remote calls from JSON fixtures in this directory instead
    #[serde(default)]
    pub fixture_dir: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: defaults::api_base_url(),
            token_env: defaults::token_env(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            critical_statuses: defaults::critical_statuses(),
            fixture_dir: None,
        }
    }
}

/// Persistent state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file, created if missing
    #[serde(default = "defaults::database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: defaults::database_path(),
        }
    }
}

/// Which committed items count as "already seen" for a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerScope {
    /// Any committed item with the same id
    #[default]
    Global,
    /// Only items committed from the same feed
    Feed,
}

/// Incremental sync behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// History depth for a feed seen for the first time
    #[serde(default = "defaults::lookback_days")]
    pub lookback_days: i64,

    /// Minimum age of a feed's watermark before it is fetched again
    #[serde(default = "defaults::reprocess_days")]
    pub reprocess_days: i64,

    /// Candidates processed per feed (0 = unbounded)
    #[serde(default)]
    pub item_limit: usize,

    /// Feeds processed per run (0 = unbounded)
    #[serde(default)]
    pub feed_limit: usize,

    /// Pause after each destination insert, in seconds
    #[serde(default = "defaults::insert_delay")]
    pub insert_delay_secs: u64,

    /// Pause after each feed that had activity, in seconds
    #[serde(default = "defaults::feed_delay")]
    pub feed_delay_secs: u64,

    /// Advance the watermark of feeds that produced no candidates
    #[serde(default)]
    pub advance_idle_watermarks: bool,

    /// Also accept items a feed added to its own playlists
    #[serde(default)]
    pub include_playlist_adds: bool,

    /// Scope of the exact-identity ledger check
    #[serde(default)]
    pub ledger_scope: LedgerScope,

    /// List the destination once per run and skip items already in it
    #[serde(default)]
    pub reconcile_destination: bool,

    /// Start unseen feeds at the last successful run when that is more recent
    #[serde(default = "defaults::enabled")]
    pub seed_from_last_run: bool,

    /// Only advance the global last run when something was added
    #[serde(default)]
    pub require_additions_for_last_run: bool,

    /// Use this instant for every feed instead of stored watermarks
    #[serde(default)]
    pub published_after: Option<DateTime<Utc>>,

    /// Run the full decision logic without any write
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncConfig {
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.lookback_days)
    }

    pub fn reprocess_interval(&self) -> chrono::Duration {
        chrono::Duration::days(self.reprocess_days)
    }

    pub fn insert_delay(&self) -> Duration {
        Duration::from_secs(self.insert_delay_secs)
    }

    pub fn feed_delay(&self) -> Duration {
        Duration::from_secs(self.feed_delay_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback_days: defaults::lookback_days(),
            reprocess_days: defaults::reprocess_days(),
            item_limit: 0,
            feed_limit: 0,
            insert_delay_secs: defaults::insert_delay(),
            feed_delay_secs: defaults::feed_delay(),
            advance_idle_watermarks: false,
            include_playlist_adds: false,
            ledger_scope: LedgerScope::default(),
            reconcile_destination: false,
            seed_from_last_run: defaults::enabled(),
            require_additions_for_last_run: false,
            published_after: None,
            dry_run: false,
        }
    }
}

/// Near-duplicate title strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityPolicy {
    /// Similarity ratio on a 0-100 scale, reject when it exceeds the threshold
    #[default]
    Ratio,
    /// Raw edit distance, reject when it is below the threshold
    EditDistance,
}

impl SimilarityPolicy {
    pub fn default_threshold(self) -> f64 {
        match self {
            SimilarityPolicy::Ratio => 90.0,
            SimilarityPolicy::EditDistance => 3.0,
        }
    }
}

/// Near-duplicate title detection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimilarityConfig {
    #[serde(default)]
    pub policy: SimilarityPolicy,

    /// Falls back to the policy's default when unset
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Skip the near-duplicate check entirely
    #[serde(default)]
    pub disabled: bool,
}

impl SimilarityConfig {
    pub fn effective_threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.policy.default_threshold())
    }
}

/// Candidate filtering rules.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterConfig {
    /// Shortest accepted item, in seconds (0 = unbounded)
    #[serde(default)]
    pub min_duration_secs: u64,

    /// Longest accepted item, in seconds (0 = unbounded)
    #[serde(default)]
    pub max_duration_secs: u64,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    /// Line-delimited feed titles or ids to skip
    #[serde(default)]
    pub feed_ignore_file: Option<PathBuf>,

    /// Line-delimited words that reject a title
    #[serde(default)]
    pub word_ignore_file: Option<PathBuf>,

    /// Line-delimited item ids to skip
    #[serde(default)]
    pub item_ignore_file: Option<PathBuf>,
}

/// Destination channel and playlist selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DestinationConfig {
    /// Substring of the owning channel's title (empty = first channel)
    #[serde(default)]
    pub channel: String,

    /// Substring of the playlist title (empty = first playlist)
    #[serde(default)]
    pub playlist: String,
}

mod defaults {
    // Remote defaults
    pub fn api_base_url() -> String {
        "https://www.googleapis.com/youtube/v3".into()
    }
    pub fn token_env() -> String {
        "SUBSYNC_ACCESS_TOKEN".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; subsync/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> u32 {
        50
    }
    pub fn critical_statuses() -> Vec<u16> {
        vec![
            400, 401, 402, 403, 404, 405, 409, 410, 412, 413, 416, 417, 428, 501,
        ]
    }

    // Storage defaults
    pub fn database_path() -> String {
        "subsync.db".into()
    }

    // Sync defaults
    pub fn lookback_days() -> i64 {
        364
    }
    pub fn reprocess_days() -> i64 {
        2
    }
    pub fn insert_delay() -> u64 {
        10
    }
    pub fn feed_delay() -> u64 {
        30
    }
    pub fn enabled() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_duration_bounds() {
        let mut config = Config::default();
        config.filter.min_duration_secs = 600;
        config.filter.max_duration_secs = 60;
        assert!(config.validate().is_err());

        config.filter.max_duration_secs = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_ratio_threshold_out_of_range() {
        let mut config = Config::default();
        config.filter.similarity.threshold = Some(120.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_page() {
        let mut config = Config::default();
        config.remote.page_size = 51;
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_defaults_follow_policy() {
        let mut similarity = SimilarityConfig::default();
        assert_eq!(similarity.effective_threshold(), 90.0);
        similarity.policy = SimilarityPolicy::EditDistance;
        assert_eq!(similarity.effective_threshold(), 3.0);
        similarity.threshold = Some(5.0);
        assert_eq!(similarity.effective_threshold(), 5.0);
    }

    #[test]
    fn parses_partial_toml() {
        let toml = r#"
            [sync]
            reprocess_days = 1
            ledger_scope = "feed"
            published_after = "2024-01-01T00:00:00Z"

            [filter]
            min_duration_secs = 60

            [filter.similarity]
            policy = "edit_distance"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sync.reprocess_days, 1);
        assert_eq!(config.sync.ledger_scope, LedgerScope::Feed);
        assert!(config.sync.published_after.is_some());
        assert_eq!(config.sync.lookback_days, 364);
        assert_eq!(config.filter.min_duration_secs, 60);
        assert_eq!(
            config.filter.similarity.policy,
            SimilarityPolicy::EditDistance
        );
        assert_eq!(config.remote.page_size, 50);
        assert!(config.sync.seed_from_last_run);
    }

    #[test]
    fn load_or_default_falls_back_on_bad_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("subsync.toml");
        std::fs::write(&path, "[sync]\nreprocess_days = \"soon\"\n").unwrap();

        let config = Config::load_or_default(&path);
        assert_eq!(config.sync.reprocess_days, 2);

        std::fs::write(&path, "[sync]\nreprocess_days = 5\n").unwrap();
        assert_eq!(Config::load_or_default(&path).sync.reprocess_days, 5);
    }

    #[test]
    fn fixture_dir_forces_dry_run() {
        let mut config = Config::default();
        assert!(!config.apply_fixture_mode());
        assert!(!config.sync.dry_run);

        config.remote.fixture_dir = Some(PathBuf::from("debug"));
        assert!(config.apply_fixture_mode());
        assert!(config.sync.dry_run);
        assert!(!config.apply_fixture_mode());
    }

    #[test]
    fn load_reads_file_and_reports_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("subsync.toml");
        std::fs::write(&path, "[storage]\ndatabase_path = \"state.db\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.storage.database_path, "state.db");

        std::fs::write(&path, "[storage\n").unwrap();
        assert!(matches!(Config::load(&path), Err(AppError::Toml(_))));
        assert!(matches!(
            Config::load(dir.path().join("missing.toml")),
            Err(AppError::Io(_))
        ));
    }
}
