//! Directory entries synthesized from a flat key listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an entry is a stored object or an inferred grouping.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One row of a directory listing.
///
/// Entries are derived, ephemeral view objects: recomputed on every listing
/// call, never cached, never written back to the store. Folders are inferred
/// from common key prefixes and carry no stored metadata, only a path. The
/// `path` field is the stable identity callers use to correlate entries
/// across repeated listings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Final path segment.
    pub name: String,

    /// Full object key; folders carry no trailing slash.
    pub path: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Payload size in bytes. Always 0 for folders.
    pub size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    /// Derived from the filename extension, never sniffed from content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileEntry {
    /// An inferred folder entry. Folders have no size, timestamp, or type.
    pub fn folder(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::Folder,
            size: 0,
            last_modified: None,
            mime_type: None,
        }
    }

    pub fn file(
        name: &str,
        path: &str,
        size: u64,
        last_modified: Option<DateTime<Utc>>,
        mime_type: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::File,
            size,
            last_modified,
            mime_type: Some(mime_type.to_string()),
        }
    }
}
