//! Trash key construction and recovery.
//!
//! A soft-deleted object lands in the trash bucket under
//! `<originalKey>_<deletionTimestampMillis>`. The suffix keeps repeated
//! deletions of the same key from colliding, and the original key is always
//! recoverable as the prefix before the final `_<digits>` run.

/// Trash-bucket key for an object deleted at `trashed_at` (epoch millis).
pub fn trash_key_for(key: &str, trashed_at: i64) -> String {
    format!("{key}_{trashed_at}")
}

/// Recover the original key from a trash key, or `None` when the key does
/// not carry a `_<digits>` deletion suffix.
pub fn original_key_of(trash_key: &str) -> Option<String> {
    let (stem, suffix) = trash_key.rsplit_once('_')?;
    if stem.is_empty() || suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(stem.to_string())
}
