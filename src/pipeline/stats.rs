//! Per-feed outcomes and run-wide counters.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::Feed;

/// Why a feed was not fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Listed in the feed ignore list
    Ignored,
    /// Watermark younger than the reprocess interval
    RecentlyProcessed,
    /// Per-run feed cap reached
    FeedCap,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Ignored => "ignored",
            SkipReason::RecentlyProcessed => "recently processed",
            SkipReason::FeedCap => "feed limit reached",
        };
        f.write_str(reason)
    }
}

/// Terminal state of one feed in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Pending,
    Skipped(SkipReason),
    /// Candidate list exhausted or capped
    Completed,
    /// Activity could not be fetched; retried next run
    Failed,
    /// A critical error stopped the run on this feed
    Aborted,
}

/// What happened to one feed.
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub feed: Feed,
    pub status: FeedStatus,
    /// Effective "published after" used for the fetch
    pub watermark: Option<DateTime<Utc>>,
    pub candidates: usize,
    pub processed: usize,
    pub added: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Stopped early on the per-feed item cap
    pub capped: bool,
    pub watermark_advanced: bool,
}

impl FeedOutcome {
    pub fn new(feed: Feed) -> Self {
        Self {
            feed,
            status: FeedStatus::Pending,
            watermark: None,
            candidates: 0,
            processed: 0,
            added: 0,
            skipped: 0,
            errors: 0,
            capped: false,
            watermark_advanced: false,
        }
    }

    pub fn skipped(feed: Feed, reason: SkipReason) -> Self {
        Self {
            status: FeedStatus::Skipped(reason),
            ..Self::new(feed)
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, FeedStatus::Skipped(_))
    }
}

/// Run-scoped aggregate counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub feeds_processed: usize,
    pub feeds_skipped: usize,
    pub items_processed: usize,
    pub items_added: usize,
    pub items_skipped: usize,
    pub api_calls: usize,
    pub errors: usize,
}

impl RunStats {
    /// Fold one feed's outcome into the totals.
    pub fn record(&mut self, outcome: &FeedOutcome) {
        if outcome.is_skipped() {
            self.feeds_skipped += 1;
        } else {
            self.feeds_processed += 1;
        }
        self.items_processed += outcome.processed;
        self.items_added += outcome.added;
        self.items_skipped += outcome.skipped;
        self.errors += outcome.errors;
    }

    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Feeds processed", self.feeds_processed.to_string()),
            ("Feeds skipped", self.feeds_skipped.to_string()),
            ("Items processed", self.items_processed.to_string()),
            ("Items added", self.items_added.to_string()),
            ("Items skipped", self.items_skipped.to_string()),
            ("API calls", self.api_calls.to_string()),
            ("Errors", self.errors.to_string()),
        ]
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Instant captured at run start; watermarks advance to it
    pub started_at: DateTime<Utc>,
    pub stats: RunStats,
    pub outcomes: Vec<FeedOutcome>,
    pub last_run_advanced: bool,
    pub dry_run: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.stats.errors == 0
    }
}
