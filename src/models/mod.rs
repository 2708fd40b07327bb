// src/models/mod.rs

//! Domain models for the sync application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod feed;
mod ledger;

// Re-export all public types
pub use config::{
    Config, DestinationConfig, FilterConfig, LedgerScope, RemoteConfig, SimilarityConfig,
    SimilarityPolicy, StorageConfig, SyncConfig,
};
pub use feed::{
    ActivityEntry, ActivityKind, Candidate, Collection, DestinationItem, Feed, to_candidates,
};
pub use ledger::{CommittedItem, Watermark};

/// One page of a paginated remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
    /// Total reported by the remote, when it reports one
    pub total_results: Option<u64>,
}
