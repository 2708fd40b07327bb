//! Title normalization and near-duplicate scoring.

use unicode_segmentation::UnicodeSegmentation;

use crate::models::SimilarityPolicy;

/// Canonical form of a title for similarity comparisons.
///
/// Lower-cases, treats underscores and parentheses as separators, then keeps
/// only Unicode words (punctuation, emoji and symbols are dropped) joined by
/// single spaces. `normalize_title(normalize_title(x)) == normalize_title(x)`.
pub fn normalize_title(title: &str) -> String {
    let spaced: String = title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '_' | '(' | ')' => ' ',
            other => other,
        })
        .collect();
    spaced.unicode_words().collect::<Vec<_>>().join(" ")
}

/// Score two titles under `policy`.
///
/// Ratio scores are 0-100 (100 = identical), edit distance is a raw
/// character count (0 = identical). `None` when either title normalizes to
/// nothing.
pub fn similarity(a: &str, b: &str, policy: SimilarityPolicy) -> Option<f64> {
    score_normalized(&normalize_title(a), &normalize_title(b), policy)
}

fn score_normalized(a: &str, b: &str, policy: SimilarityPolicy) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(match policy {
        SimilarityPolicy::Ratio => strsim::normalized_levenshtein(a, b) * 100.0,
        SimilarityPolicy::EditDistance => strsim::levenshtein(a, b) as f64,
    })
}

/// Whether `score` means "too alike" under `policy` and `threshold`.
pub fn is_too_similar(score: f64, threshold: f64, policy: SimilarityPolicy) -> bool {
    match policy {
        SimilarityPolicy::Ratio => score > threshold,
        SimilarityPolicy::EditDistance => score < threshold,
    }
}

/// Whether `candidate` is a near-duplicate of any of `committed`.
pub fn is_duplicate_title(
    candidate: &str,
    committed: &[String],
    threshold: f64,
    policy: SimilarityPolicy,
) -> bool {
    let index = TitleIndex::new(committed.iter().cloned());
    index.find_duplicate(candidate, threshold, policy).is_some()
}

/// Committed titles kept alongside their normalized form.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    entries: Vec<(String, String)>,
}

impl TitleIndex {
    pub fn new(titles: impl IntoIterator<Item = String>) -> Self {
        let mut index = Self::default();
        for title in titles {
            index.push(title);
        }
        index
    }

    pub fn push(&mut self, title: String) {
        let normalized = normalize_title(&title);
        self.entries.push((title, normalized));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First committed title that `candidate` is too similar to, with its score.
    pub fn find_duplicate(
        &self,
        candidate: &str,
        threshold: f64,
        policy: SimilarityPolicy,
    ) -> Option<(&str, f64)> {
        let normalized = normalize_title(candidate);
        if normalized.is_empty() {
            return None;
        }
        self.entries.iter().find_map(|(title, committed)| {
            score_normalized(&normalized, committed, policy)
                .filter(|score| is_too_similar(*score, threshold, policy))
                .map(|score| (title.as_str(), score))
        })
    }
}
