//! Sync pipeline.
//!
//! - `RunController`: one run over every feed, fail-fast, last-run decision
//! - `SyncEngine`: one feed, watermark to watermark

pub mod ledger;
pub mod run;
pub mod stats;
pub mod sync;
#[cfg(test)]
pub(crate) mod testing;

pub use ledger::LedgerView;
pub use run::RunController;
pub use stats::{FeedOutcome, FeedStatus, RunReport, RunStats, SkipReason};
pub use sync::SyncEngine;
