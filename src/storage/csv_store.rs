//! CSV-backed state store
//!
//! The whole map is rewritten after every mutation. Writes go to a sibling
//! temporary file that is then renamed over the state file, so a reader never
//! sees a half-written table.

use crate::state::{CrawlEntry, EntryStatus, STATUS_FORMAT_VERSION};
use crate::storage::traits::{StateStorage, StorageError, StorageResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const STATE_HEADER: [&str; 6] = ["url", "status", "hash", "path", "mimetype", "error"];
const ALIAS_HEADER: [&str; 2] = ["alias", "canonical"];

/// Leading comment line of a state file, followed by the format version
const FORMAT_MARKER: &str = "#status-format=";

/// Column layout of the state file
#[derive(Debug, Serialize, Deserialize)]
struct StateRow {
    url: String,
    status: String,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    mimetype: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Column layout of the alias sidecar file
#[derive(Debug, Serialize, Deserialize)]
struct AliasRow {
    alias: String,
    canonical: String,
}

/// What a key maps to: its own entry, or the canonical key it aliases
#[derive(Debug, Clone)]
enum Slot {
    Entry(CrawlEntry),
    Alias(String),
}

#[derive(Debug, Default)]
struct StoreInner {
    slots: IndexMap<String, Slot>,
}

impl StoreInner {
    /// Follows an alias to the key that owns the entry
    fn canonical_key<'a>(&'a self, url: &'a str) -> Option<&'a str> {
        match self.slots.get(url)? {
            Slot::Entry(_) => Some(url),
            Slot::Alias(target) => match self.slots.get(target.as_str()) {
                Some(Slot::Entry(_)) => Some(target.as_str()),
                _ => None,
            },
        }
    }

    fn resolve(&self, url: &str) -> Option<&CrawlEntry> {
        let key = self.canonical_key(url)?;
        match self.slots.get(key)? {
            Slot::Entry(entry) => Some(entry),
            Slot::Alias(_) => None,
        }
    }

    fn alias_pairs(&self) -> Vec<(String, String)> {
        self.slots
            .iter()
            .filter_map(|(url, slot)| match slot {
                Slot::Alias(target) => Some((url.clone(), target.clone())),
                Slot::Entry(_) => None,
            })
            .collect()
    }

    fn persist(&self, path: &Path, alias_path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut rows = Vec::with_capacity(self.slots.len());
        for url in self.slots.keys() {
            // An alias whose target vanished has nothing to materialise
            if let Some(entry) = self.resolve(url) {
                rows.push(to_row(url, entry));
            }
        }
        let marker = format!("{}{}", FORMAT_MARKER, STATUS_FORMAT_VERSION);
        write_atomic(path, Some(&marker), &STATE_HEADER, &rows)?;

        let aliases: Vec<AliasRow> = self
            .alias_pairs()
            .into_iter()
            .map(|(alias, canonical)| AliasRow { alias, canonical })
            .collect();
        if !aliases.is_empty() || alias_path.exists() {
            write_atomic(alias_path, None, &ALIAS_HEADER, &aliases)?;
        }

        Ok(())
    }
}

/// State store persisted as a CSV file with header
/// `url,status,hash,path,mimetype,error`
///
/// The header is preceded by a `#status-format=N` comment line. Files
/// without it predate the marker and are read as version 1.
///
/// Aliases are materialised in the main file (each alias row repeats its
/// canonical entry) and recorded in a sibling `<stem>.aliases.csv` file so
/// the indirection survives a reload.
pub struct CsvStateStore {
    path: PathBuf,
    alias_path: PathBuf,
    inner: Mutex<StoreInner>,
}

impl CsvStateStore {
    /// Opens a store and loads the backing file if it exists
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV state file
    ///
    /// # Returns
    ///
    /// * `Ok(CsvStateStore)` - Store with the file content loaded
    /// * `Err(StorageError)` - The file exists but could not be read
    pub fn open(path: &Path) -> StorageResult<Self> {
        let store = Self {
            path: path.to_path_buf(),
            alias_path: alias_path_for(path),
            inner: Mutex::new(StoreInner::default()),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn read_entries(&self) -> StorageResult<IndexMap<String, Slot>> {
        let mut slots = IndexMap::new();
        if !self.path.exists() {
            return Ok(slots);
        }

        let content = fs::read_to_string(&self.path)?;
        let version = format_version(&content);
        if version > STATUS_FORMAT_VERSION {
            return Err(StorageError::UnsupportedFormat {
                file: self.path.display().to_string(),
                version,
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .from_reader(content.as_bytes());
        for (index, row) in reader.deserialize::<StateRow>().enumerate() {
            let row = row?;
            let entry = from_row(&row).ok_or_else(|| StorageError::UnknownStatus {
                file: self.path.display().to_string(),
                row: index as u64 + 1,
                value: row.status.clone(),
            })?;
            slots.insert(row.url, Slot::Entry(entry));
        }

        if self.alias_path.exists() {
            let mut reader = csv::Reader::from_path(&self.alias_path)?;
            for row in reader.deserialize::<AliasRow>() {
                let row = row?;
                let target_owns_entry = matches!(slots.get(&row.canonical), Some(Slot::Entry(_)));
                if target_owns_entry && row.alias != row.canonical {
                    slots.insert(row.alias, Slot::Alias(row.canonical));
                } else {
                    tracing::warn!(
                        "Dropping alias {} -> {}: canonical entry missing",
                        row.alias,
                        row.canonical
                    );
                }
            }
        }

        Ok(slots)
    }
}

impl StateStorage for CsvStateStore {
    /// Disk wins: the in-memory map is replaced only after the whole file
    /// parsed, so a bad row leaves the current state untouched.
    fn load(&self) -> StorageResult<()> {
        let mut inner = self.lock()?;
        inner.slots = self.read_entries()?;
        tracing::debug!(
            "Loaded {} entries from {}",
            inner.slots.len(),
            self.path.display()
        );
        Ok(())
    }

    fn get(&self, url: &str) -> StorageResult<Option<CrawlEntry>> {
        let inner = self.lock()?;
        Ok(inner.resolve(url).cloned())
    }

    fn query(
        &self,
        predicate: &dyn Fn(&CrawlEntry) -> bool,
    ) -> StorageResult<Vec<(String, CrawlEntry)>> {
        let inner = self.lock()?;
        Ok(inner
            .slots
            .iter()
            .filter_map(|(url, slot)| match slot {
                Slot::Entry(entry) if predicate(entry) => Some((url.clone(), entry.clone())),
                _ => None,
            })
            .collect())
    }

    fn aliases(&self) -> StorageResult<Vec<(String, String)>> {
        Ok(self.lock()?.alias_pairs())
    }

    fn counts(&self) -> StorageResult<BTreeMap<EntryStatus, u64>> {
        let inner = self.lock()?;
        let mut counts = BTreeMap::new();
        for url in inner.slots.keys() {
            if let Some(entry) = inner.resolve(url) {
                *counts.entry(entry.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.lock()?.slots.len())
    }

    fn upsert(&self, url: &str, entry: CrawlEntry) -> StorageResult<bool> {
        let mut inner = self.lock()?;

        if let Some(existing) = inner.resolve(url) {
            if existing.is_terminal() {
                if *existing != entry {
                    tracing::debug!(
                        "Keeping terminal entry for {} ({}), discarding {}",
                        url,
                        existing.status,
                        entry.status
                    );
                }
                return Ok(false);
            }
        }

        inner.slots.insert(url.to_string(), Slot::Entry(entry));
        inner.persist(&self.path, &self.alias_path)?;
        Ok(true)
    }

    fn register(&self, url: &str, entry: CrawlEntry) -> StorageResult<bool> {
        let mut inner = self.lock()?;
        if inner.slots.contains_key(url) {
            return Ok(false);
        }
        inner.slots.insert(url.to_string(), Slot::Entry(entry));
        inner.persist(&self.path, &self.alias_path)?;
        Ok(true)
    }

    fn register_many(&self, entries: Vec<(String, CrawlEntry)>) -> StorageResult<usize> {
        let mut inner = self.lock()?;
        let mut inserted = 0;
        for (url, entry) in entries {
            if !inner.slots.contains_key(&url) {
                inner.slots.insert(url, Slot::Entry(entry));
                inserted += 1;
            }
        }
        if inserted > 0 {
            inner.persist(&self.path, &self.alias_path)?;
        }
        Ok(inserted)
    }

    fn alias(&self, from: &str, to: &str) -> StorageResult<()> {
        let mut inner = self.lock()?;

        let canonical = inner
            .canonical_key(to)
            .ok_or_else(|| StorageError::UnknownUrl(to.to_string()))?
            .to_string();

        if canonical == from {
            return Err(StorageError::AliasCycle {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        // Keys that pointed at `from` now point straight at the new target,
        // so alias chains never grow beyond one hop.
        for slot in inner.slots.values_mut() {
            if matches!(slot, Slot::Alias(target) if *target == from) {
                *slot = Slot::Alias(canonical.clone());
            }
        }

        inner
            .slots
            .insert(from.to_string(), Slot::Alias(canonical));
        inner.persist(&self.path, &self.alias_path)?;
        Ok(())
    }
}

/// `map.site.csv` -> `map.site.aliases.csv`
fn alias_path_for(path: &Path) -> PathBuf {
    path.with_extension("aliases.csv")
}

/// Reads the version from the marker line; unmarked files are version 1
fn format_version(content: &str) -> u32 {
    content
        .lines()
        .next()
        .and_then(|line| line.trim().strip_prefix(FORMAT_MARKER))
        .and_then(|version| version.parse().ok())
        .unwrap_or(1)
}

fn to_row(url: &str, entry: &CrawlEntry) -> StateRow {
    StateRow {
        url: url.to_string(),
        status: entry.status.to_csv_str().to_string(),
        hash: entry.content_hash.clone(),
        path: entry.stored_path.clone(),
        mimetype: entry.mime_type.clone(),
        error: entry.error_message.clone(),
    }
}

fn from_row(row: &StateRow) -> Option<CrawlEntry> {
    let status = EntryStatus::from_csv_str(row.status.trim())?;
    Some(CrawlEntry {
        status,
        content_hash: non_empty(&row.hash),
        stored_path: non_empty(&row.path),
        mime_type: non_empty(&row.mimetype),
        error_message: non_empty(&row.error),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Serialises rows to `<path>.tmp` and renames it over `path`
///
/// The header is written explicitly so that an empty table still has one.
fn write_atomic<T: Serialize>(
    path: &Path,
    marker: Option<&str>,
    header: &[&str],
    rows: &[T],
) -> StorageResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut file = fs::File::create(&tmp)?;
        if let Some(marker) = marker {
            writeln!(file, "{}", marker)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(header)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    fs::rename(&tmp, path)?;
    Ok(())
}
