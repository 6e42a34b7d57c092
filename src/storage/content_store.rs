//! Content-addressed file storage
//!
//! Files are named `{sha256 hex}{extension}` inside a flat directory. A file
//! is written once; storing the same bytes again finds it already present.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Distinguishes temporary files of concurrent writers
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Computes the hex SHA-256 digest used to name stored files
///
/// # Example
///
/// ```
/// use site_ferry::storage::content_hash;
///
/// assert_eq!(
///     content_hash(b"hello"),
///     "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
/// );
/// ```
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A file written to (or already present in) the content store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    pub hash: String,
    pub file_name: String,
    /// False when identical content was stored earlier
    pub newly_written: bool,
}

/// Flat directory of content-addressed files
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Opens the store, creating its directory if needed
    pub fn open(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Hashes `bytes` and stores them as `{hash}{extension}`
    pub fn put(&self, bytes: &[u8], extension: &str) -> io::Result<StoredContent> {
        self.put_hashed(content_hash(bytes), bytes, extension)
    }

    /// Stores bytes whose digest the caller already computed
    pub fn put_hashed(
        &self,
        hash: String,
        bytes: &[u8],
        extension: &str,
    ) -> io::Result<StoredContent> {
        let file_name = format!("{}{}", hash, extension);
        let path = self.path_of(&file_name);

        if path.exists() {
            return Ok(StoredContent {
                hash,
                file_name,
                newly_written: false,
            });
        }

        let tmp = self.root.join(format!(
            ".{}.{}-{}.tmp",
            file_name,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;

        Ok(StoredContent {
            hash,
            file_name,
            newly_written: true,
        })
    }

    pub fn read(&self, file_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(file_name))
    }

    pub fn read_to_string(&self, file_name: &str) -> io::Result<String> {
        fs::read_to_string(self.path_of(file_name))
    }
}
