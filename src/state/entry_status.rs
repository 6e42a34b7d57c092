/// Entry status definitions for tracking crawl progress
///
/// This module defines every state a tracked URL can be in and the string
/// mapping used in the state files.
use std::fmt;

/// Version of the status string mapping, recorded at the top of every
/// state file
pub const STATUS_FORMAT_VERSION: u32 = 1;

/// Represents the current state of a tracked URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryStatus {
    // ===== Active State =====
    /// URL is known and waits for its stage to process it
    Pending,

    // ===== Terminal States =====
    /// Content was fetched and written to the content store
    Downloaded,

    /// URL matched an ignore pattern and is never fetched
    Ignored,

    /// Fetching or storing failed; not retried automatically
    Error,
}

impl EntryStatus {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Converts the status to its state-file representation
    pub fn to_csv_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloaded => "downloaded",
            Self::Ignored => "ignored",
            Self::Error => "error",
        }
    }

    /// Parses a status from its state-file representation
    ///
    /// `new` and `registered` are older spellings of `pending` and are still
    /// accepted. Returns None for anything else.
    pub fn from_csv_str(s: &str) -> Option<Self> {
        match s {
            "pending" | "new" | "registered" => Some(Self::Pending),
            "downloaded" => Some(Self::Downloaded),
            "ignored" => Some(Self::Ignored),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_states() -> [Self; 4] {
        [Self::Pending, Self::Downloaded, Self::Ignored, Self::Error]
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_csv_str())
    }
}
