//! Run controller: one full sync over every feed.

use chrono::{DateTime, SubsecRound, Utc};

use crate::client::{self, FeedClient};
use crate::error::{AppError, RemoteError, Result};
use crate::filter::FilterPolicy;
use crate::models::{Collection, Config, Feed};
use crate::pipeline::ledger::LedgerView;
use crate::pipeline::stats::{FeedOutcome, FeedStatus, RunReport, RunStats, SkipReason};
use crate::pipeline::sync::SyncEngine;
use crate::storage::StateStore;
use crate::utils::time::format_timestamp;

/// Runs the sync across all feeds and decides on the global last-run marker.
pub struct RunController<'a> {
    config: &'a Config,
    client: &'a dyn FeedClient,
    store: &'a dyn StateStore,
}

impl<'a> RunController<'a> {
    pub fn new(config: &'a Config, client: &'a dyn FeedClient, store: &'a dyn StateStore) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Run one sync starting now.
    pub async fn run(&self) -> Result<RunReport> {
        // Stored timestamps keep microseconds; match them so comparisons round-trip.
        self.run_at(Utc::now().trunc_subsecs(6)).await
    }

    /// Run one sync with `now` as the run start instant.
    ///
    /// Returns `AppError::Aborted` when a critical remote error stopped the
    /// run. The summary is logged either way.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let sync = &self.config.sync;
        crate::utils::log::header(if sync.dry_run {
            "subsync run (dry-run, nothing is written)"
        } else {
            "subsync run"
        });

        let policy = FilterPolicy::load(&self.config.filter)?;
        let (channel, collection) = self.resolve_destination().await?;
        log::info!("Destination: {} on {}", collection, channel);

        let mut report = RunReport {
            started_at: now,
            stats: RunStats::default(),
            outcomes: Vec::new(),
            last_run_advanced: false,
            dry_run: sync.dry_run,
        };

        let result = self
            .sync_feeds(&policy, &collection, now, &mut report)
            .await;

        if result.is_ok() {
            self.finish(&mut report).await;
        }
        report.stats.api_calls = self.client.api_calls();
        self.log_summary(&report);

        result.map(|()| report)
    }

    async fn sync_feeds(
        &self,
        policy: &FilterPolicy,
        collection: &Collection,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Result<()> {
        let sync = &self.config.sync;

        let last_run = self.store.get_last_run().await.unwrap_or_else(|e| {
            log::warn!("Last run lookup failed, treating as never run: {}", e);
            None
        });
        match last_run {
            Some(ts) => log::info!("Last successful run: {}", format_timestamp(&ts)),
            None => log::info!("No previous successful run"),
        }

        let mut ledger = LedgerView::load(self.store, sync.ledger_scope).await?;
        if sync.reconcile_destination {
            match client::list_destination_items(self.client, &collection.id).await {
                Ok(items) => {
                    log::info!("{} holds {} items", collection, items.len());
                    ledger = ledger.with_destination(items);
                }
                Err(err) => self.remote_failure(err, &mut report.stats)?,
            }
        }

        let feeds = match client::list_feeds(self.client).await {
            Ok(feeds) => feeds,
            Err(err) => {
                self.remote_failure(err, &mut report.stats)?;
                Vec::new()
            }
        };
        log::info!("Tracking {} feeds", feeds.len());

        let mut engine = SyncEngine::new(
            self.client,
            self.store,
            sync,
            policy,
            collection,
            ledger,
            now,
        )
        .with_last_run(last_run);

        let mut feeds = feeds.into_iter();
        while let Some(feed) = feeds.next() {
            if sync.feed_limit > 0 && report.stats.feeds_processed >= sync.feed_limit {
                log::info!("Feed limit {} reached", sync.feed_limit);
                for rest in std::iter::once(feed).chain(feeds.by_ref()) {
                    self.push(report, FeedOutcome::skipped(rest, SkipReason::FeedCap));
                }
                break;
            }

            if policy.lists().is_feed_ignored(&feed) {
                log::info!("Skipping {}: ignored", feed);
                self.push(report, FeedOutcome::skipped(feed, SkipReason::Ignored));
                continue;
            }

            let mut outcome = FeedOutcome::new(feed.clone());
            let result = engine.process_feed(&feed, &mut outcome).await;
            if let Err(err) = result {
                log::error!("Run aborted on {}: {}", feed, err);
                outcome.status = FeedStatus::Aborted;
                outcome.errors += 1;
                self.push(report, outcome);
                return Err(err);
            }
            self.push(report, outcome);
        }

        Ok(())
    }

    fn push(&self, report: &mut RunReport, outcome: FeedOutcome) {
        report.stats.record(&outcome);
        report.outcomes.push(outcome);
    }

    /// Advance the global last-run marker if the run fully succeeded.
    async fn finish(&self, report: &mut RunReport) {
        let sync = &self.config.sync;
        if report.stats.errors > 0 {
            log::warn!(
                "{} errors, last run stays unchanged",
                report.stats.errors
            );
            return;
        }
        if sync.require_additions_for_last_run && report.stats.items_added == 0 {
            log::info!("Nothing added, last run stays unchanged");
            return;
        }
        if sync.dry_run {
            log::info!(
                "[dry-run] Would set last run to {}",
                format_timestamp(&report.started_at)
            );
            return;
        }
        match self.store.set_last_run(report.started_at).await {
            Ok(()) => {
                report.last_run_advanced = true;
                log::info!("Last run set to {}", format_timestamp(&report.started_at));
            }
            Err(e) => {
                log::error!("Could not store last run: {}", e);
                report.stats.errors += 1;
            }
        }
    }

    /// Cached channel and collection, resolved remotely on first use.
    async fn resolve_destination(&self) -> Result<(Feed, Collection)> {
        let dest = &self.config.destination;
        let write = !self.config.sync.dry_run;

        let channel = match self.store.get_channel().await {
            Ok(Some(channel)) => channel,
            cached => {
                if let Err(e) = cached {
                    log::warn!("Channel cache unreadable: {}", e);
                }
                let channel = client::resolve_channel(self.client, &dest.channel)
                    .await
                    .map_err(abort_if_critical)?;
                if write {
                    if let Err(e) = self.store.set_channel(&channel).await {
                        log::warn!("Could not cache channel: {}", e);
                    }
                }
                channel
            }
        };

        let collection = match self.store.get_collection().await {
            Ok(Some(collection)) => collection,
            cached => {
                if let Err(e) = cached {
                    log::warn!("Playlist cache unreadable: {}", e);
                }
                let collection = client::resolve_collection(self.client, &channel, &dest.playlist)
                    .await
                    .map_err(abort_if_critical)?;
                if write {
                    if let Err(e) = self.store.set_collection(&collection).await {
                        log::warn!("Could not cache playlist: {}", e);
                    }
                }
                collection
            }
        };

        Ok((channel, collection))
    }

    fn remote_failure(&self, err: RemoteError, stats: &mut RunStats) -> Result<()> {
        if err.is_critical() {
            log::error!("{}", err);
            return Err(AppError::Aborted(err));
        }
        log::warn!("{}", err);
        stats.errors += 1;
        Ok(())
    }

    fn log_summary(&self, report: &RunReport) {
        let mut items = report.stats.summary_items();
        items.push(("Last run advanced", report.last_run_advanced.to_string()));
        crate::utils::log::summary(
            if report.dry_run {
                "Run complete (dry-run)"
            } else {
                "Run complete"
            },
            &items,
        );
    }
}

fn abort_if_critical(err: AppError) -> AppError {
    match err {
        AppError::Remote(remote) if remote.is_critical() => AppError::Aborted(remote),
        other => other,
    }
}
