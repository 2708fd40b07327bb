//! Run-local view of the committed-item ledger.
//!
//! The store stays authoritative for identity checks. Items committed during
//! this run (or only pretend-committed in dry-run mode) are tracked here too,
//! so later decisions in the same run see them.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::filter::TitleIndex;
use crate::models::{CommittedItem, DestinationItem, LedgerScope};
use crate::storage::StateStore;

pub struct LedgerView {
    scope: LedgerScope,
    titles: TitleIndex,
    /// item id -> owning feed ids, for items recorded during this run
    recorded: HashMap<String, HashSet<String>>,
    destination: HashSet<String>,
}

impl LedgerView {
    /// Load committed titles from the store.
    pub async fn load(store: &dyn StateStore, scope: LedgerScope) -> Result<Self> {
        let titles = store.committed_titles().await?;
        log::info!("Ledger holds {} committed items", titles.len());
        Ok(Self::new(scope, titles))
    }

    pub fn new(scope: LedgerScope, titles: Vec<String>) -> Self {
        Self {
            scope,
            titles: TitleIndex::new(titles),
            recorded: HashMap::new(),
            destination: HashSet::new(),
        }
    }

    /// Remember what the destination currently holds.
    pub fn with_destination(mut self, items: Vec<DestinationItem>) -> Self {
        self.destination = items.into_iter().map(|i| i.item_id).collect();
        self
    }

    /// Exact-identity check, honoring the configured scope.
    pub async fn is_committed(
        &self,
        store: &dyn StateStore,
        item_id: &str,
        feed_id: &str,
    ) -> Result<bool> {
        let feed_scope = match self.scope {
            LedgerScope::Global => None,
            LedgerScope::Feed => Some(feed_id),
        };
        let recorded = match (self.recorded.get(item_id), feed_scope) {
            (Some(owners), Some(feed)) => owners.contains(feed),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if recorded {
            return Ok(true);
        }
        store.is_committed(item_id, feed_scope).await
    }

    pub fn in_destination(&self, item_id: &str) -> bool {
        self.destination.contains(item_id)
    }

    /// Track an item committed (or pretend-committed) during this run.
    pub fn record(&mut self, item: &CommittedItem) {
        self.recorded
            .entry(item.item_id.clone())
            .or_default()
            .insert(item.feed_id.clone());
        self.titles.push(item.title.clone());
    }

    pub fn titles(&self) -> &TitleIndex {
        &self.titles
    }
}
