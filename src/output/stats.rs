//! Statistics generation from the state stores
//!
//! This module provides functionality for extracting and displaying
//! per-store progress for the `stats` command and end-of-run summaries.

use crate::state::EntryStatus;
use crate::storage::StateStorage;
use crate::FerryError;
use std::collections::{BTreeMap, HashMap};

/// Statistics for one state store
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Label shown in reports, e.g. "pages"
    pub name: String,

    /// Total number of tracked URLs, aliases included
    pub total: u64,

    /// Count of URLs by status
    pub by_status: BTreeMap<EntryStatus, u64>,

    /// Number of alias keys
    pub aliases: u64,

    /// Error messages and how often each occurred
    pub error_summary: HashMap<String, u64>,
}

impl CrawlStatistics {
    pub fn count(&self, status: EntryStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of URLs that reached a terminal status, in percent
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let done: u64 = EntryStatus::all_states()
            .iter()
            .filter(|s| s.is_terminal())
            .map(|s| self.count(*s))
            .sum();
        (done as f64 / self.total as f64) * 100.0
    }
}

/// Loads statistics from a state store
///
/// # Arguments
///
/// * `name` - Label for the store
/// * `storage` - The store to query
pub fn load_statistics(name: &str, storage: &dyn StateStorage) -> Result<CrawlStatistics, FerryError> {
    let by_status = storage.counts()?;
    let aliases = storage.aliases()?.len() as u64;

    let mut error_summary = HashMap::new();
    for (_, entry) in storage.query(&|entry| entry.status == EntryStatus::Error)? {
        let message = entry
            .error_message
            .unwrap_or_else(|| "unknown error".to_string());
        *error_summary.entry(message).or_insert(0) += 1;
    }

    Ok(CrawlStatistics {
        name: name.to_string(),
        total: storage.len()? as u64,
        by_status,
        aliases,
        error_summary,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== {} ===\n", stats.name);

    println!("Overview:");
    println!("  Tracked URLs: {}", stats.total);
    println!("  Redirect aliases: {}", stats.aliases);
    println!();

    println!("By Status:");
    for status in EntryStatus::all_states() {
        let count = stats.count(status);
        let percentage = if stats.total > 0 {
            (count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (message, count) in error_counts.into_iter().take(10) {
            println!("  {}x {}", count, message);
        }
        println!();
    }

    println!(
        "Completion: {:.1}% ({} pending)\n",
        stats.completion_rate(),
        stats.count(EntryStatus::Pending)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CrawlEntry;
    use crate::storage::CsvStateStore;
    use tempfile::TempDir;

    #[test]
    fn test_load_statistics() {
        let dir = TempDir::new().unwrap();
        let store = CsvStateStore::open(&dir.path().join("map.site.csv")).unwrap();
        store.register("https://example.com/", CrawlEntry::pending()).unwrap();
        store
            .upsert("https://example.com/a", CrawlEntry::downloaded("h", "h.html", ""))
            .unwrap();
        store
            .upsert("https://example.com/b", CrawlEntry::error("HTTP 404"))
            .unwrap();
        store
            .upsert("https://example.com/c", CrawlEntry::error("HTTP 404"))
            .unwrap();
        store.alias("https://example.com/old", "https://example.com/a").unwrap();

        let stats = load_statistics("pages", &store).unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.aliases, 1);
        assert_eq!(stats.count(EntryStatus::Downloaded), 2);
        assert_eq!(stats.count(EntryStatus::Pending), 1);
        assert_eq!(stats.error_summary.get("HTTP 404"), Some(&2));
        assert!((stats.completion_rate() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_store_statistics() {
        let dir = TempDir::new().unwrap();
        let store = CsvStateStore::open(&dir.path().join("map.assets.csv")).unwrap();
        let stats = load_statistics("assets", &store).unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate(), 0.0);
    }
}
