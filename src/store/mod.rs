//! Typed capability over the backing object store.
//!
//! The dashboard never talks to the store vendor directly: everything goes
//! through the [`ObjectStore`] trait, which exposes exactly the operations the
//! services need (prefix+delimiter listing, streaming get/put, copy, delete)
//! and a tagged error taxonomy. The services decide policy (what is fatal,
//! what is tolerated) purely from the [`StoreError`] variant, so swapping the
//! vendor means writing one new impl of this trait.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::{io, pin::Pin};
use thiserror::Error;
use tokio::io::AsyncRead;

pub mod s3;

/// Streamed object payload. Items are produced as the body arrives; dropping
/// the stream early releases the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key does not exist in the given bucket.
    #[error("object `{key}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, key: String },

    /// The store answered with its "replicas not yet reachable" class of
    /// error. The mutation has met its durability quorum; callers may treat
    /// this as success.
    #[error("store temporarily unavailable during {op} of `{key}`: {reason}")]
    Transient {
        op: &'static str,
        key: String,
        reason: String,
    },

    /// Caller-supplied input violated a contract. Raised by the service layer
    /// before any store call is attempted; store impls never produce it.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Any other store-reported failure (auth, malformed request, store down).
    #[error("store {op} of `{key}` failed: {reason}")]
    Failed {
        op: &'static str,
        key: String,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One object as reported by a listing call.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of a prefix+delimiter listing, following the ListObjectsV2 shape:
/// direct objects plus the synthesized groupings beyond the delimiter.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub objects: Vec<StoredObject>,
    pub common_prefixes: Vec<String>,
}

/// An object opened for reading: metadata up front, bytes as a stream.
pub struct ObjectBody {
    pub content_type: String,
    pub size: u64,
    pub bytes: ByteStream,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Minimal object-store capability consumed by the services.
///
/// Implementations must map vendor errors onto the [`StoreError`] taxonomy:
/// absent keys become `NotFound`, the vendor's "service unavailable while
/// replication catches up" class becomes `Transient`, everything else becomes
/// `Failed`. No retries happen at this layer or above it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List keys under `prefix`, grouping everything beyond `delimiter` into
    /// common prefixes.
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> StoreResult<Listing>;

    /// Open an object for streaming reads.
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<ObjectBody>;

    /// Store a whole-buffer payload under `key`, overwriting any existing
    /// object.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> StoreResult<()>;

    /// Store a streamed payload under `key` without buffering it whole.
    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        content_type: &str,
    ) -> StoreResult<()>;

    /// Copy an object across buckets, preserving its content type.
    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()>;

    /// Delete a single object. Deleting an absent key is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()>;
}
