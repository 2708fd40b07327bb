//! Per-feed incremental sync.
//!
//! One feed goes through: watermark resolution, reprocess gate, activity
//! fetch, candidate filtering, commit, watermark advance. Feeds are handled
//! strictly one after another; pacing is done with plain sleeps.

use chrono::{DateTime, Utc};

use crate::client::{self, FeedClient};
use crate::error::{AppError, RemoteError, Result};
use crate::filter::{FilterPolicy, Rejection};
use crate::models::{Candidate, Collection, CommittedItem, Feed, SyncConfig, to_candidates};
use crate::pipeline::ledger::LedgerView;
use crate::pipeline::stats::{FeedOutcome, FeedStatus, SkipReason};
use crate::storage::StateStore;

/// Drives the sync of individual feeds for one run.
pub struct SyncEngine<'a> {
    client: &'a dyn FeedClient,
    store: &'a dyn StateStore,
    config: &'a SyncConfig,
    policy: &'a FilterPolicy,
    collection: &'a Collection,
    ledger: LedgerView,
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        client: &'a dyn FeedClient,
        store: &'a dyn StateStore,
        config: &'a SyncConfig,
        policy: &'a FilterPolicy,
        collection: &'a Collection,
        ledger: LedgerView,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            store,
            config,
            policy,
            collection,
            ledger,
            now,
            last_run: None,
        }
    }

    /// Global last successful run, used to seed unseen feeds.
    pub fn with_last_run(mut self, last_run: Option<DateTime<Utc>>) -> Self {
        self.last_run = last_run;
        self
    }

    /// Sync one feed, filling `outcome` as it goes.
    ///
    /// Transient remote failures are counted in `outcome.errors`. An `Err`
    /// means the run must stop: a critical remote error or a ledger failure.
    pub async fn process_feed(&mut self, feed: &Feed, outcome: &mut FeedOutcome) -> Result<()> {
        let watermark = self.effective_watermark(feed).await;
        outcome.watermark = Some(watermark);

        if self.now - watermark < self.config.reprocess_interval() {
            log::info!(
                "Skipping {}: processed at {}, within {} days",
                feed,
                watermark,
                self.config.reprocess_days
            );
            outcome.status = FeedStatus::Skipped(SkipReason::RecentlyProcessed);
            return Ok(());
        }

        log::info!("Processing {} (published after {})", feed, watermark);
        let entries = match client::list_activity(self.client, &feed.id, watermark).await {
            Ok(entries) => entries,
            Err(err) => {
                self.remote_failure(feed, err, outcome)?;
                outcome.status = FeedStatus::Failed;
                return Ok(());
            }
        };

        let candidates = to_candidates(entries, self.config.include_playlist_adds);
        outcome.candidates = candidates.len();
        log::info!("{}: {} candidates", feed, candidates.len());

        for candidate in &candidates {
            if self.config.item_limit > 0 && outcome.processed >= self.config.item_limit {
                log::info!(
                    "{}: item limit {} reached, {} candidates left",
                    feed,
                    self.config.item_limit,
                    candidates.len() - outcome.processed
                );
                outcome.capped = true;
                break;
            }
            outcome.processed += 1;
            self.process_candidate(feed, candidate, outcome).await?;
        }

        outcome.status = FeedStatus::Completed;
        self.advance_watermark(feed, outcome).await;

        if outcome.candidates > 0 {
            pause(self.config.feed_delay()).await;
        }
        Ok(())
    }

    /// Explicit override, then the stored watermark, then the default.
    async fn effective_watermark(&self, feed: &Feed) -> DateTime<Utc> {
        if let Some(ts) = self.config.published_after {
            return ts;
        }

        let default = self.default_watermark();
        match self.store.get_watermark(&feed.id).await {
            Ok(Some(wm)) => wm.last_processed,
            Ok(None) => {
                log::info!("{} seen for the first time, starting at {}", feed, default);
                if !self.config.dry_run {
                    if let Err(e) = self.store.set_watermark(feed, default).await {
                        log::warn!("Could not create watermark for {}: {}", feed, e);
                    }
                }
                default
            }
            Err(e) => {
                log::warn!("Watermark lookup for {} failed, treating as unseen: {}", feed, e);
                default
            }
        }
    }

    fn default_watermark(&self) -> DateTime<Utc> {
        let lookback = self.now - self.config.lookback();
        match self.last_run {
            Some(last_run) if self.config.seed_from_last_run && last_run > lookback => last_run,
            _ => lookback,
        }
    }

    async fn process_candidate(
        &mut self,
        feed: &Feed,
        candidate: &Candidate,
        outcome: &mut FeedOutcome,
    ) -> Result<()> {
        if let Some(rejection) = self.screen(feed, candidate).await? {
            reject(candidate, &rejection, outcome);
            return Ok(());
        }

        if self.policy.checks_duration() {
            let duration = match self.client.get_item_duration(&candidate.item_id).await {
                Ok(duration) => duration,
                Err(err) => return self.remote_failure(feed, err, outcome),
            };
            if let Some(rejection) = self.policy.check_duration(duration) {
                reject(candidate, &rejection, outcome);
                return Ok(());
            }
        }

        self.commit(feed, candidate, outcome).await
    }

    /// Word and item blocklists, ledger identity, destination membership, near-duplicates.
    async fn screen(&mut self, feed: &Feed, candidate: &Candidate) -> Result<Option<Rejection>> {
        if let Some(rejection) = self.policy.evaluate_static(candidate) {
            return Ok(Some(rejection));
        }

        if self
            .ledger
            .is_committed(self.store, &candidate.item_id, &feed.id)
            .await?
        {
            return Ok(Some(Rejection::AlreadyCommitted));
        }

        if self.ledger.in_destination(&candidate.item_id) {
            // Added outside this tool: adopt it into the ledger.
            self.record(feed, candidate).await?;
            return Ok(Some(Rejection::InDestination));
        }

        Ok(self.policy.check_title(candidate, self.ledger.titles()))
    }

    async fn commit(
        &mut self,
        feed: &Feed,
        candidate: &Candidate,
        outcome: &mut FeedOutcome,
    ) -> Result<()> {
        if self.config.dry_run {
            log::info!(
                "[dry-run] Would add {:?} ({}) to {}",
                candidate.title,
                candidate.item_id,
                self.collection
            );
            let item = self.committed_item(feed, candidate);
            self.ledger.record(&item);
            outcome.added += 1;
            return Ok(());
        }

        let inserted = self
            .client
            .insert_item(&self.collection.id, &candidate.item_id)
            .await;
        let result = match inserted {
            Ok(position) => {
                self.record(feed, candidate).await?;
                outcome.added += 1;
                log::info!(
                    "Added {:?} ({}) at position {}",
                    candidate.title,
                    candidate.item_id,
                    position.map_or_else(|| "?".to_string(), |p| p.to_string())
                );
                Ok(())
            }
            Err(err) => self.remote_failure(feed, err, outcome),
        };

        pause(self.config.insert_delay()).await;
        result
    }

    /// Write the ledger row (unless dry-run) and track it for this run.
    async fn record(&mut self, feed: &Feed, candidate: &Candidate) -> Result<()> {
        let item = self.committed_item(feed, candidate);
        if !self.config.dry_run {
            self.store.commit_item(&item).await?;
        }
        self.ledger.record(&item);
        Ok(())
    }

    fn committed_item(&self, feed: &Feed, candidate: &Candidate) -> CommittedItem {
        CommittedItem {
            item_id: candidate.item_id.clone(),
            committed_at: self.now,
            title: candidate.title.clone(),
            feed_id: feed.id.clone(),
        }
    }

    /// Move the watermark to the run start if the feed finished cleanly.
    async fn advance_watermark(&self, feed: &Feed, outcome: &mut FeedOutcome) {
        if outcome.errors > 0 {
            log::warn!("{}: {} errors, watermark kept", feed, outcome.errors);
            return;
        }
        if outcome.candidates == 0 && !self.config.advance_idle_watermarks {
            log::debug!("{}: no candidates, watermark kept", feed);
            return;
        }
        if self.config.dry_run {
            log::info!("[dry-run] Would advance watermark of {} to {}", feed, self.now);
            return;
        }
        match self.store.set_watermark(feed, self.now).await {
            Ok(()) => outcome.watermark_advanced = true,
            Err(e) => {
                log::error!("Could not advance watermark of {}: {}", feed, e);
                outcome.errors += 1;
            }
        }
    }

    /// Count a transient failure, or turn a critical one into an abort.
    fn remote_failure(
        &self,
        feed: &Feed,
        err: RemoteError,
        outcome: &mut FeedOutcome,
    ) -> Result<()> {
        if err.is_critical() {
            log::error!("{}: {}", feed, err);
            return Err(AppError::Aborted(err));
        }
        log::warn!("{}: {}", feed, err);
        outcome.errors += 1;
        Ok(())
    }
}

fn reject(candidate: &Candidate, rejection: &Rejection, outcome: &mut FeedOutcome) {
    log::info!(
        "Skipping {:?} ({}): {}",
        candidate.title,
        candidate.item_id,
        rejection
    );
    outcome.skipped += 1;
}

async fn pause(delay: std::time::Duration) {
    if delay.as_millis() > 0 {
        tokio::time::sleep(delay).await;
    }
}
