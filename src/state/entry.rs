use crate::state::EntryStatus;

/// One tracked URL and what is known about it
///
/// The constructors keep the optional fields consistent with the status: a
/// hash and stored path only on `Downloaded`, a message only on `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlEntry {
    pub status: EntryStatus,
    pub content_hash: Option<String>,
    pub stored_path: Option<String>,
    pub mime_type: Option<String>,
    pub error_message: Option<String>,
}

impl CrawlEntry {
    pub fn pending() -> Self {
        Self::bare(EntryStatus::Pending)
    }

    pub fn ignored() -> Self {
        Self::bare(EntryStatus::Ignored)
    }

    pub fn downloaded(
        content_hash: impl Into<String>,
        stored_path: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let mime_type = mime_type.into();
        Self {
            status: EntryStatus::Downloaded,
            content_hash: Some(content_hash.into()),
            stored_path: Some(stored_path.into()),
            mime_type: (!mime_type.is_empty()).then_some(mime_type),
            error_message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::bare(EntryStatus::Error)
        }
    }

    fn bare(status: EntryStatus) -> Self {
        Self {
            status,
            content_hash: None,
            stored_path: None,
            mime_type: None,
            error_message: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Stored file name, only for downloaded entries that have one
    pub fn downloaded_path(&self) -> Option<&str> {
        match self.status {
            EntryStatus::Downloaded => self.stored_path.as_deref().filter(|p| !p.is_empty()),
            _ => None,
        }
    }
}
