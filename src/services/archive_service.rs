//! src/services/archive_service.rs
//!
//! ArchiveService: the virtual-filesystem façade over the backing object
//! store. Listing maps the flat key namespace into folders and files, deletes
//! go through the copy-then-delete trash protocol, and reads/writes stream
//! through without buffering whole payloads.
//!
//! Every operation is stateless and independent: no cross-request locking, no
//! per-key serialization, no caches. Consistency is delegated entirely to the
//! backing store, and callers observe their own mutations by re-listing.

use crate::models::entry::FileEntry;
use crate::services::{
    mime::guess_mime_type,
    namespace::{entries_from_listing, normalize_prefix},
    trash::{original_key_of, trash_key_for},
};
use crate::store::{ObjectBody, ObjectStore, StoreError, StoreResult};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Outcome of a single soft delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFile {
    pub path: String,
    /// Epoch millis embedded in the trash key.
    pub trashed_at: i64,
}

/// Outcome of a restore from trash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredFile {
    pub trash_key: String,
    pub path: String,
}

/// Per-key result of a batch deletion. Batches are best-effort and not
/// atomic: earlier successes are never rolled back by a later failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteOutcome {
    pub path: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ArchiveService {
    store: Arc<dyn ObjectStore>,
    archive_bucket: String,
    trash_bucket: String,
}

impl ArchiveService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        archive_bucket: impl Into<String>,
        trash_bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            archive_bucket: archive_bucket.into(),
            trash_bucket: trash_bucket.into(),
        }
    }

    /// List one directory level.
    ///
    /// Issues a single prefix+delimiter listing against the live bucket and
    /// synthesizes entries from it. No retries; store errors propagate.
    pub async fn list_directory(&self, prefix: &str) -> StoreResult<Vec<FileEntry>> {
        let normalized = normalize_prefix(prefix);
        let listing = self
            .store
            .list(&self.archive_bucket, &normalized, Some("/"))
            .await?;
        Ok(entries_from_listing(&normalized, listing))
    }

    /// Open a live object for streaming reads.
    pub async fn read_file(&self, key: &str) -> StoreResult<ObjectBody> {
        ensure_key_safe(key)?;
        self.store.get(&self.archive_bucket, key).await
    }

    /// Store a whole-buffer payload, deriving the content type from the key
    /// when none is supplied.
    pub async fn write_file(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> StoreResult<()> {
        ensure_key_safe(key)?;
        let content_type = content_type.unwrap_or_else(|| guess_mime_type(key));
        tolerate_transient(
            self.store
                .put(&self.archive_bucket, key, bytes, content_type)
                .await,
        )
    }

    /// Store a streamed payload without buffering it whole. This is the
    /// default path for client uploads.
    pub async fn write_file_stream(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        content_type: Option<&str>,
    ) -> StoreResult<()> {
        ensure_key_safe(key)?;
        let content_type = content_type.unwrap_or_else(|| guess_mime_type(key));
        tolerate_transient(
            self.store
                .put_stream(&self.archive_bucket, key, reader, content_type)
                .await,
        )
    }

    /// Replace a text object's content, always as `text/plain`.
    pub async fn update_text(&self, key: &str, content: String) -> StoreResult<()> {
        self.write_file(key, Bytes::from(content), Some("text/plain"))
            .await
    }

    /// Move an object into the trash bucket.
    ///
    /// Copies `key` to `<key>_<epochMillis>` in the trash bucket, then
    /// deletes the original, strictly in that order. Either step's transient
    /// replication error is logged and treated as success; any other copy
    /// failure aborts before the delete runs, leaving the source untouched. A
    /// terminal delete failure after a successful copy leaves the object
    /// present in both buckets; that state is recoverable and no rollback of
    /// the copy is attempted.
    pub async fn soft_delete(&self, key: &str) -> StoreResult<DeletedFile> {
        ensure_key_safe(key)?;
        let trashed_at = Utc::now().timestamp_millis();
        let trash_key = trash_key_for(key, trashed_at);

        tolerate_transient(
            self.store
                .copy(&self.archive_bucket, key, &self.trash_bucket, &trash_key)
                .await,
        )?;
        tolerate_transient(self.store.delete(&self.archive_bucket, key).await)?;

        debug!(key, %trash_key, "moved object to trash");
        Ok(DeletedFile {
            path: key.to_string(),
            trashed_at,
        })
    }

    /// Best-effort soft delete of several keys, reporting per-key outcomes.
    pub async fn soft_delete_many(&self, keys: &[String]) -> Vec<BatchDeleteOutcome> {
        let mut outcomes = Vec::with_capacity(keys.len());
        for key in keys {
            match self.soft_delete(key).await {
                Ok(deleted) => outcomes.push(BatchDeleteOutcome {
                    path: deleted.path,
                    ok: true,
                    trashed_at: Some(deleted.trashed_at),
                    error: None,
                }),
                Err(err) => outcomes.push(BatchDeleteOutcome {
                    path: key.clone(),
                    ok: false,
                    trashed_at: None,
                    error: Some(err.to_string()),
                }),
            }
        }
        outcomes
    }

    /// Copy a trashed object back to its original live key.
    ///
    /// The original key is reconstructed from the `_<digits>` deletion
    /// suffix. The trash copy is left in place; purging it is the retention
    /// process's job, not ours.
    pub async fn restore(&self, trash_key: &str) -> StoreResult<RestoredFile> {
        ensure_key_safe(trash_key)?;
        let original = original_key_of(trash_key).ok_or_else(|| {
            StoreError::Validation(format!(
                "`{trash_key}` carries no deletion-timestamp suffix"
            ))
        })?;

        tolerate_transient(
            self.store
                .copy(&self.trash_bucket, trash_key, &self.archive_bucket, &original)
                .await,
        )?;

        debug!(trash_key, %original, "restored object from trash");
        Ok(RestoredFile {
            trash_key: trash_key.to_string(),
            path: original,
        })
    }

    /// Cheap store reachability probe for the readiness endpoint.
    pub async fn probe(&self) -> StoreResult<()> {
        self.store
            .list(&self.archive_bucket, ".readyz-probe", Some("/"))
            .await
            .map(|_| ())
    }
}

/// Treat the store's transient-replication class as success.
///
/// The store only reports this class once the mutation has met its
/// durability quorum; surfacing it would make routine operations flaky on a
/// partially-degraded cluster.
fn tolerate_transient(result: StoreResult<()>) -> StoreResult<()> {
    match result {
        Err(StoreError::Transient { op, key, reason }) => {
            warn!(op, %key, %reason, "replicas not yet caught up; treating as success");
            Ok(())
        }
        other => other,
    }
}

/// Basic key validation to avoid trivial path traversal vectors.
fn ensure_key_safe(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::Validation("object key is empty".into()));
    }
    if key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StoreError::Validation("object key is too long".into()));
    }
    if key.starts_with('/') || key.contains("..") {
        return Err(StoreError::Validation(format!(
            "object key `{key}` is not a valid path"
        )));
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(StoreError::Validation(format!(
            "object key `{key}` contains forbidden characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ByteStream, Listing, ObjectBody, StoreResult, StoredObject};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;

    const ARCHIVE: &str = "archive";
    const TRASH: &str = "archive-trash";

    #[derive(Clone)]
    struct FakeObject {
        bytes: Vec<u8>,
        content_type: String,
    }

    /// In-memory store with scriptable per-operation failures.
    #[derive(Default)]
    struct FakeStore {
        buckets: Mutex<HashMap<String, BTreeMap<String, FakeObject>>>,
        transient_ops: Mutex<HashSet<&'static str>>,
        failing_ops: Mutex<HashSet<&'static str>>,
    }

    impl FakeStore {
        fn seed(&self, bucket: &str, key: &str, bytes: &[u8]) {
            self.buckets
                .lock()
                .unwrap()
                .entry(bucket.to_string())
                .or_default()
                .insert(
                    key.to_string(),
                    FakeObject {
                        bytes: bytes.to_vec(),
                        content_type: guess_mime_type(key).to_string(),
                    },
                );
        }

        fn make_transient(&self, op: &'static str) {
            self.transient_ops.lock().unwrap().insert(op);
        }

        fn make_failing(&self, op: &'static str) {
            self.failing_ops.lock().unwrap().insert(op);
        }

        fn keys(&self, bucket: &str) -> Vec<String> {
            self.buckets
                .lock()
                .unwrap()
                .get(bucket)
                .map(|tree| tree.keys().cloned().collect())
                .unwrap_or_default()
        }

        fn object(&self, bucket: &str, key: &str) -> Option<FakeObject> {
            self.buckets
                .lock()
                .unwrap()
                .get(bucket)
                .and_then(|tree| tree.get(key).cloned())
        }

        fn guard(&self, op: &'static str, key: &str) -> StoreResult<()> {
            if self.transient_ops.lock().unwrap().contains(op) {
                return Err(StoreError::Transient {
                    op,
                    key: key.to_string(),
                    reason: "HTTP 503: ServiceUnavailable".into(),
                });
            }
            if self.failing_ops.lock().unwrap().contains(op) {
                return Err(StoreError::Failed {
                    op,
                    key: key.to_string(),
                    reason: "injected failure".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn list(
            &self,
            bucket: &str,
            prefix: &str,
            delimiter: Option<&str>,
        ) -> StoreResult<Listing> {
            self.guard("list", prefix)?;
            let buckets = self.buckets.lock().unwrap();
            let tree = buckets.get(bucket).cloned().unwrap_or_default();
            drop(buckets);

            let mut listing = Listing::default();
            let mut groups = std::collections::BTreeSet::new();
            for (key, object) in tree {
                let Some(rest) = key.strip_prefix(prefix) else {
                    continue;
                };
                match delimiter.and_then(|d| rest.find(d).map(|pos| pos + d.len())) {
                    Some(end) => {
                        groups.insert(format!("{prefix}{}", &rest[..end]));
                    }
                    None => listing.objects.push(StoredObject {
                        key,
                        size: object.bytes.len() as u64,
                        last_modified: None,
                    }),
                }
            }
            listing.common_prefixes = groups.into_iter().collect();
            Ok(listing)
        }

        async fn get(&self, bucket: &str, key: &str) -> StoreResult<ObjectBody> {
            self.guard("get", key)?;
            let object = self.object(bucket, key).ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
            let size = object.bytes.len() as u64;
            let bytes: ByteStream =
                Box::pin(futures::stream::iter(vec![Ok(Bytes::from(object.bytes))]));
            Ok(ObjectBody {
                content_type: object.content_type,
                size,
                bytes,
            })
        }

        async fn put(
            &self,
            bucket: &str,
            key: &str,
            bytes: Bytes,
            content_type: &str,
        ) -> StoreResult<()> {
            self.guard("put", key)?;
            self.buckets
                .lock()
                .unwrap()
                .entry(bucket.to_string())
                .or_default()
                .insert(
                    key.to_string(),
                    FakeObject {
                        bytes: bytes.to_vec(),
                        content_type: content_type.to_string(),
                    },
                );
            Ok(())
        }

        async fn put_stream(
            &self,
            bucket: &str,
            key: &str,
            reader: &mut (dyn AsyncRead + Send + Unpin),
            content_type: &str,
        ) -> StoreResult<()> {
            self.guard("put", key)?;
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .await
                .map_err(|err| StoreError::Failed {
                    op: "put",
                    key: key.to_string(),
                    reason: err.to_string(),
                })?;
            self.put(bucket, key, Bytes::from(bytes), content_type).await
        }

        async fn copy(
            &self,
            src_bucket: &str,
            src_key: &str,
            dst_bucket: &str,
            dst_key: &str,
        ) -> StoreResult<()> {
            self.guard("copy", src_key)?;
            let object = self
                .object(src_bucket, src_key)
                .ok_or_else(|| StoreError::NotFound {
                    bucket: src_bucket.to_string(),
                    key: src_key.to_string(),
                })?;
            self.buckets
                .lock()
                .unwrap()
                .entry(dst_bucket.to_string())
                .or_default()
                .insert(dst_key.to_string(), object);
            Ok(())
        }

        async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
            self.guard("delete", key)?;
            if let Some(tree) = self.buckets.lock().unwrap().get_mut(bucket) {
                tree.remove(key);
            }
            Ok(())
        }
    }

    fn service() -> (Arc<FakeStore>, ArchiveService) {
        let store = Arc::new(FakeStore::default());
        let service = ArchiveService::new(store.clone(), ARCHIVE, TRASH);
        (store, service)
    }

    fn path_set(entries: &[FileEntry]) -> HashSet<String> {
        entries.iter().map(|e| e.path.clone()).collect()
    }

    #[tokio::test]
    async fn soft_delete_round_trip() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "x/y.txt", b"hello");

        let deleted = svc.soft_delete("x/y.txt").await.unwrap();
        assert_eq!(deleted.path, "x/y.txt");

        let entries = svc.list_directory("x").await.unwrap();
        assert!(!entries.iter().any(|e| e.name == "y.txt"));

        let trash_key = trash_key_for("x/y.txt", deleted.trashed_at);
        let trashed = store.object(TRASH, &trash_key).unwrap();
        assert_eq!(trashed.bytes, b"hello");
    }

    #[tokio::test]
    async fn transient_copy_error_still_reports_success() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "a/b.txt", b"data");
        store.make_transient("copy");

        let deleted = svc.soft_delete("a/b.txt").await.unwrap();
        assert_eq!(deleted.path, "a/b.txt");
        // The live object was still deleted.
        assert!(store.object(ARCHIVE, "a/b.txt").is_none());
    }

    #[tokio::test]
    async fn transient_delete_error_still_reports_success() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "a/b.txt", b"data");
        store.make_transient("delete");

        let deleted = svc.soft_delete("a/b.txt").await.unwrap();
        let trash_key = trash_key_for("a/b.txt", deleted.trashed_at);
        assert!(store.object(TRASH, &trash_key).is_some());
    }

    #[tokio::test]
    async fn terminal_copy_failure_leaves_the_source_untouched() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "a/b.txt", b"data");
        store.make_failing("copy");

        let err = svc.soft_delete("a/b.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::Failed { op: "copy", .. }));
        // The delete step never ran.
        assert!(store.object(ARCHIVE, "a/b.txt").is_some());
        assert!(store.keys(TRASH).is_empty());
    }

    #[tokio::test]
    async fn terminal_delete_failure_leaves_an_accepted_duplicate() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "a/b.txt", b"data");
        store.make_failing("delete");

        let err = svc.soft_delete("a/b.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::Failed { op: "delete", .. }));
        // Present in both buckets; no rollback of the trash copy.
        assert!(store.object(ARCHIVE, "a/b.txt").is_some());
        assert_eq!(store.keys(TRASH).len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_missing_key_reports_not_found() {
        let (_, svc) = service();
        let err = svc.soft_delete("nope.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn batch_delete_reports_per_key_outcomes() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "keep/a.txt", b"a");
        store.seed(ARCHIVE, "keep/b.txt", b"b");

        let keys = vec![
            "keep/a.txt".to_string(),
            "missing.txt".to_string(),
            "keep/b.txt".to_string(),
        ];
        let outcomes = svc.soft_delete_many(&keys).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].ok && outcomes[2].ok);
        assert!(!outcomes[1].ok);
        assert!(outcomes[1].error.as_deref().unwrap().contains("not found"));
        // A mid-batch failure does not roll back earlier deletions.
        assert!(store.object(ARCHIVE, "keep/a.txt").is_none());
    }

    #[tokio::test]
    async fn write_defaults_content_type_from_extension() {
        let (store, svc) = service();
        svc.write_file("photo.JPG", Bytes::from_static(b"\xff\xd8"), None)
            .await
            .unwrap();
        svc.write_file("notes", Bytes::from_static(b"text"), None)
            .await
            .unwrap();

        assert_eq!(store.object(ARCHIVE, "photo.JPG").unwrap().content_type, "image/jpeg");
        assert_eq!(
            store.object(ARCHIVE, "notes").unwrap().content_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn explicit_content_type_wins_over_the_extension() {
        let (store, svc) = service();
        svc.write_file("data.bin", Bytes::from_static(b"{}"), Some("application/json"))
            .await
            .unwrap();
        assert_eq!(
            store.object(ARCHIVE, "data.bin").unwrap().content_type,
            "application/json"
        );
    }

    #[tokio::test]
    async fn transient_write_error_is_absorbed() {
        let (store, svc) = service();
        store.make_transient("put");
        svc.write_file("a.txt", Bytes::from_static(b"x"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn text_update_writes_plain_text() {
        let (store, svc) = service();
        svc.update_text("notes.md", "hello".to_string()).await.unwrap();
        let object = store.object(ARCHIVE, "notes.md").unwrap();
        assert_eq!(object.content_type, "text/plain");
        assert_eq!(object.bytes, b"hello");
    }

    #[tokio::test]
    async fn streamed_writes_take_the_same_path() {
        let (store, svc) = service();
        let mut reader = std::io::Cursor::new(b"streamed payload".to_vec());
        svc.write_file_stream("docs/u.txt", &mut reader, None)
            .await
            .unwrap();
        let object = store.object(ARCHIVE, "docs/u.txt").unwrap();
        assert_eq!(object.bytes, b"streamed payload");
        assert_eq!(object.content_type, "text/plain");
    }

    #[tokio::test]
    async fn read_of_missing_key_is_not_found() {
        let (_, svc) = service();
        let err = svc.read_file("ghost.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn invalid_keys_are_rejected_before_any_store_call() {
        let (store, svc) = service();
        store.make_failing("get");
        for key in ["", "/abs.txt", "a/../b.txt"] {
            let err = svc.read_file(key).await.unwrap_err();
            // Validation, not the injected store failure: no call was made.
            assert!(matches!(err, StoreError::Validation(_)), "key: {key:?}");
        }
    }

    #[tokio::test]
    async fn bare_and_slashed_prefixes_list_the_same_directory() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "docs/a.txt", b"a");
        store.seed(ARCHIVE, "docs/img/b.png", b"b");

        let bare = svc.list_directory("docs").await.unwrap();
        let slashed = svc.list_directory("docs/").await.unwrap();
        assert_eq!(path_set(&bare), path_set(&slashed));
        assert_eq!(
            path_set(&bare),
            HashSet::from(["docs/a.txt".to_string(), "docs/img".to_string()])
        );
    }

    #[tokio::test]
    async fn repeated_listings_of_an_unchanged_namespace_compare_equal() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "p/one.txt", b"1");
        store.seed(ARCHIVE, "p/two/three.txt", b"3");

        let first = svc.list_directory("p").await.unwrap();
        let second = svc.list_directory("p").await.unwrap();
        assert_eq!(path_set(&first), path_set(&second));
    }

    #[tokio::test]
    async fn restore_copies_the_object_back_to_its_original_key() {
        let (store, svc) = service();
        store.seed(ARCHIVE, "x/y.txt", b"payload");
        let deleted = svc.soft_delete("x/y.txt").await.unwrap();
        assert!(store.object(ARCHIVE, "x/y.txt").is_none());

        let trash_key = trash_key_for("x/y.txt", deleted.trashed_at);
        let restored = svc.restore(&trash_key).await.unwrap();
        assert_eq!(restored.path, "x/y.txt");
        assert_eq!(store.object(ARCHIVE, "x/y.txt").unwrap().bytes, b"payload");
        // The trash copy stays; purging belongs to the retention process.
        assert!(store.object(TRASH, &trash_key).is_some());
    }

    #[tokio::test]
    async fn restore_rejects_keys_without_a_deletion_suffix() {
        let (_, svc) = service();
        let err = svc.restore("x/y.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
