//! Ignore lists loaded from line-delimited files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::models::{Feed, FilterConfig};

/// Read a line-delimited list. Blank lines and `#` comments are skipped.
///
/// A missing or unreadable file is logged and yields an empty list.
pub fn read_list(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => parse_list(&content),
        Err(e) => {
            log::error!("Ignore list {:?} unavailable: {}", path, e);
            Vec::new()
        }
    }
}

fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Whole-word, case-insensitive word matcher.
///
/// Entries may start or end with symbols (`#shorts`, `c++`, `[live]`); a word
/// boundary is only required on a side that ends in a word character.
#[derive(Debug, Clone, Default)]
pub struct WordBlocklist {
    pattern: Option<Regex>,
    len: usize,
}

impl WordBlocklist {
    pub fn new(words: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(word_pattern)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self::default());
        }
        let pattern = Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
            len: alternatives.len(),
        })
    }

    /// The first blocked word found in `title`, as written in the title.
    pub fn find(&self, title: &str) -> Option<String> {
        self.pattern
            .as_ref()?
            .find(title)
            .map(|m| m.as_str().to_string())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn word_pattern(word: &str) -> String {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    let edge = |c: Option<char>| if c.is_some_and(is_word_char) { r"\b" } else { "" };
    format!(
        "{}{}{}",
        edge(word.chars().next()),
        regex::escape(word),
        edge(word.chars().last())
    )
}

/// Pre-filter exclusions.
#[derive(Debug, Clone, Default)]
pub struct IgnoreLists {
    /// Feed titles or ids
    pub feeds: HashSet<String>,
    pub words: WordBlocklist,
    pub items: HashSet<String>,
}

impl IgnoreLists {
    /// Load every list configured in `config`. Unset paths give empty lists.
    pub fn load(config: &FilterConfig) -> Result<Self> {
        let load = |path: &Option<std::path::PathBuf>| {
            path.as_deref().map(read_list).unwrap_or_default()
        };
        let lists = Self {
            feeds: load(&config.feed_ignore_file).into_iter().collect(),
            words: WordBlocklist::new(&load(&config.word_ignore_file))?,
            items: load(&config.item_ignore_file).into_iter().collect(),
        };
        log::info!(
            "Ignore lists: {} feeds, {} words, {} items",
            lists.feeds.len(),
            lists.words.len(),
            lists.items.len()
        );
        Ok(lists)
    }

    pub fn is_feed_ignored(&self, feed: &Feed) -> bool {
        self.feeds.contains(&feed.id) || self.feeds.contains(&feed.title)
    }

    pub fn is_item_ignored(&self, item_id: &str) -> bool {
        self.items.contains(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_list_skips_comments() {
        let list = parse_list("# header\n  alpha \n\nbeta\n#gamma\n");
        assert_eq!(list, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_list(&dir.path().join("nope.txt")).is_empty());
    }

    #[test]
    fn test_word_blocklist_whole_word_case_insensitive() {
        let words = WordBlocklist::new(&["live".to_string(), "shorts".to_string()]).unwrap();
        assert_eq!(words.find("LIVE stream tonight").as_deref(), Some("LIVE"));
        assert!(words.find("Delivered").is_none());
        assert!(words.find("Oliver").is_none());
        assert!(words.find("ordinary title").is_none());
    }

    #[test]
    fn test_word_blocklist_entries_with_symbols() {
        let words = WordBlocklist::new(&[
            "#shorts".to_string(),
            "c++".to_string(),
            "[live]".to_string(),
        ])
        .unwrap();
        assert_eq!(words.find("Funny cat #shorts").as_deref(), Some("#shorts"));
        assert_eq!(words.find("Learn C++ today").as_deref(), Some("C++"));
        assert_eq!(words.find("[LIVE] Election night").as_deref(), Some("[LIVE]"));
        assert!(words.find("shorts without the tag").is_none());
        assert!(words.find("Abc++ is not C").is_none());
    }

    #[test]
    fn test_empty_blocklist_matches_nothing() {
        let words = WordBlocklist::new(&[" ".to_string()]).unwrap();
        assert!(words.is_empty());
        assert!(words.find("anything").is_none());
    }

    #[test]
    fn test_load_from_config() {
        let dir = TempDir::new().unwrap();
        let feeds = dir.path().join("feeds.txt");
        let items = dir.path().join("items.txt");
        std::fs::write(&feeds, "Noisy Channel\nUC_X\n").unwrap();
        std::fs::write(&items, "vid1\n").unwrap();

        let config = FilterConfig {
            feed_ignore_file: Some(feeds),
            item_ignore_file: Some(items),
            word_ignore_file: Some(dir.path().join("missing.txt")),
            ..FilterConfig::default()
        };
        let lists = IgnoreLists::load(&config).unwrap();
        assert!(lists.is_feed_ignored(&Feed::new("UC_1", "Noisy Channel")));
        assert!(lists.is_feed_ignored(&Feed::new("UC_X", "Renamed")));
        assert!(!lists.is_feed_ignored(&Feed::new("UC_2", "Quiet")));
        assert!(lists.is_item_ignored("vid1"));
        assert!(lists.words.is_empty());
    }
}
