//! Folder/file synthesis over a flat key namespace.
//!
//! Object stores have no native directory concept; one delimiter-grouped
//! listing per level is the standard way to fake one without maintaining a
//! separate directory index. The transform from a listing to entries is a
//! pure function so it can be exercised without a live store.

use crate::models::entry::FileEntry;
use crate::services::mime::guess_mime_type;
use crate::store::Listing;

/// Coerce a caller-supplied path into a store query prefix.
///
/// Empty means root. Anything else ends with exactly one `/`, so `docs` and
/// `docs/` address the same directory.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// Turn one delimiter-grouped listing into directory entries.
///
/// `prefix` must already be normalized. Common prefixes become folders with
/// the query prefix and trailing delimiter stripped; a grouping that reduces
/// to the empty name (the query prefix itself) is dropped. Direct objects
/// become files; the prefix marker object (empty name) and legacy
/// folder-marker objects (name ending in `/`) are dropped. Order is not
/// guaranteed; callers sort.
pub fn entries_from_listing(prefix: &str, listing: Listing) -> Vec<FileEntry> {
    let mut entries = Vec::new();

    for group in listing.common_prefixes {
        let name = group
            .strip_prefix(prefix)
            .unwrap_or(&group)
            .trim_end_matches('/');
        if name.is_empty() {
            continue;
        }
        entries.push(FileEntry::folder(name, group.trim_end_matches('/')));
    }

    for object in listing.objects {
        let name = object.key.strip_prefix(prefix).unwrap_or(&object.key);
        if name.is_empty() || name.ends_with('/') {
            continue;
        }
        entries.push(FileEntry::file(
            name,
            &object.key,
            object.size,
            object.last_modified,
            guess_mime_type(name),
        ));
    }

    entries
}
