//! Entry feed consumed from the external entry store
//!
//! The engine never fetches or persists entries. It is handed an ordered
//! collection plus an optional "newest" marker and reacts when the collection
//! is replaced.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::io::{IoResult, read_document};

/// Stable identifier of an entry
pub type EntryId = u64;

/// A short text entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(alias = "username", alias = "name")]
    pub author: String,
    #[serde(alias = "comment", alias = "message")]
    pub text: String,
}

impl Entry {
    pub fn new(id: EntryId, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            author: author.into(),
            text: text.into(),
        }
    }
}

/// A snapshot of the entry store.
///
/// `entries` is shared: the layout engine treats a new `Arc` as a new
/// collection and the same `Arc` as "nothing changed".
#[derive(Debug, Clone)]
pub struct EntryFeed {
    pub entries: Arc<[Entry]>,
    pub newest: Option<EntryId>,
}

/// On-disk feed: either a bare list or an object with a newest marker
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    List(Vec<Entry>),
    Feed {
        entries: Vec<Entry>,
        #[serde(default)]
        newest: Option<EntryId>,
    },
}

impl EntryFeed {
    pub fn new(entries: Vec<Entry>, newest: Option<EntryId>) -> Self {
        Self {
            entries: entries.into(),
            newest,
        }
    }

    /// Load a feed from a YAML or JSON file
    pub fn load(path: &Path) -> IoResult<Self> {
        let feed = match read_document(path)? {
            FeedDocument::List(entries) => Self::new(entries, None),
            FeedDocument::Feed { entries, newest } => Self::new(entries, newest),
        };
        tracing::debug!(
            path = %path.display(),
            entries = feed.entries.len(),
            newest = ?feed.newest,
            "loaded entry feed"
        );
        Ok(feed)
    }

    /// Replace the newest marker, keeping the same collection
    pub fn with_newest(&self, newest: Option<EntryId>) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            newest,
        }
    }

    /// A new collection with `entry` prepended and marked newest, the way the
    /// store reports a fresh submission
    pub fn prepend(&self, entry: Entry) -> Self {
        let newest = entry.id;
        let entries: Vec<Entry> = std::iter::once(entry)
            .chain(self.entries.iter().cloned())
            .collect();
        Self::new(entries, Some(newest))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
