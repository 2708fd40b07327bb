//! Candidate filtering.
//!
//! Checks run in a fixed order and stop at the first rejection:
//!
//! 1. word blocklist
//! 2. item id blocklist
//! 3. ledger identity (engine)
//! 4. near-duplicate title
//! 5. duration bounds
//!
//! Rejections are expected outcomes, never errors.

pub mod lists;
pub mod title;

use std::fmt;

use crate::error::Result;
use crate::models::{Candidate, FilterConfig, SimilarityConfig};

pub use lists::{IgnoreLists, WordBlocklist, read_list};
pub use title::{TitleIndex, is_duplicate_title, normalize_title, similarity};

/// Whether `seconds` lies within `[min, max]`. A bound of 0 is unbounded.
pub fn is_within_duration(seconds: u64, min: u64, max: u64) -> bool {
    (min == 0 || seconds >= min) && (max == 0 || seconds <= max)
}

/// Why a candidate was not committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    BlockedWord(String),
    IgnoredItem,
    AlreadyCommitted,
    InDestination,
    NearDuplicate { title: String, score: f64 },
    TooShort(u64),
    TooLong(u64),
    DurationUnknown,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::BlockedWord(word) => write!(f, "blocked word {word:?}"),
            Rejection::IgnoredItem => write!(f, "item ignored"),
            Rejection::AlreadyCommitted => write!(f, "already added"),
            Rejection::InDestination => write!(f, "already in playlist"),
            Rejection::NearDuplicate { title, score } => {
                write!(f, "too similar to {title:?} (score {score:.1})")
            }
            Rejection::TooShort(secs) => write!(f, "too short ({secs}s)"),
            Rejection::TooLong(secs) => write!(f, "too long ({secs}s)"),
            Rejection::DurationUnknown => write!(f, "duration unknown"),
        }
    }
}

/// Immutable filter rules for one run.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    lists: IgnoreLists,
    similarity: SimilarityConfig,
    min_duration_secs: u64,
    max_duration_secs: u64,
}

impl FilterPolicy {
    pub fn new(config: &FilterConfig, lists: IgnoreLists) -> Self {
        Self {
            lists,
            similarity: config.similarity.clone(),
            min_duration_secs: config.min_duration_secs,
            max_duration_secs: config.max_duration_secs,
        }
    }

    /// Load the configured ignore lists and build the policy.
    pub fn load(config: &FilterConfig) -> Result<Self> {
        Ok(Self::new(config, IgnoreLists::load(config)?))
    }

    pub fn lists(&self) -> &IgnoreLists {
        &self.lists
    }

    /// Checks that need neither the ledger nor the remote.
    pub fn evaluate_static(&self, candidate: &Candidate) -> Option<Rejection> {
        if let Some(word) = self.lists.words.find(&candidate.title) {
            return Some(Rejection::BlockedWord(word));
        }
        if self.lists.is_item_ignored(&candidate.item_id) {
            return Some(Rejection::IgnoredItem);
        }
        None
    }

    /// Near-duplicate check against every committed title.
    pub fn check_title(&self, candidate: &Candidate, committed: &TitleIndex) -> Option<Rejection> {
        if self.similarity.disabled {
            return None;
        }
        committed
            .find_duplicate(
                &candidate.title,
                self.similarity.effective_threshold(),
                self.similarity.policy,
            )
            .map(|(title, score)| Rejection::NearDuplicate {
                title: title.to_string(),
                score,
            })
    }

    /// Whether a duration lookup is needed at all.
    pub fn checks_duration(&self) -> bool {
        self.min_duration_secs > 0 || self.max_duration_secs > 0
    }

    pub fn check_duration(&self, seconds: Option<u64>) -> Option<Rejection> {
        if !self.checks_duration() {
            return None;
        }
        let Some(secs) = seconds else {
            return Some(Rejection::DurationUnknown);
        };
        if is_within_duration(secs, self.min_duration_secs, self.max_duration_secs) {
            None
        } else if secs < self.min_duration_secs {
            Some(Rejection::TooShort(secs))
        } else {
            Some(Rejection::TooLong(secs))
        }
    }
}
