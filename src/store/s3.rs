//! S3-backed implementation of the [`ObjectStore`] capability.
//!
//! Talks to a Garage cluster (or any S3-compatible endpoint) with path-style
//! addressing. Buckets are constructed per call from shared credentials; the
//! client holds no per-request state, so one `S3Store` can serve any number
//! of in-flight operations.

use crate::store::{
    ByteStream, Listing, ObjectBody, ObjectStore, StoreError, StoreResult, StoredObject,
};
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use s3::{Bucket, Region, creds::Credentials, error::S3Error};
use std::io;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::debug;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct S3Store {
    region: Region,
    credentials: Credentials,
}

impl S3Store {
    /// Build a store client for a custom endpoint (path-style, as Garage
    /// requires).
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> anyhow::Result<Self> {
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .context("building store credentials")?;
        Ok(Self {
            region: Region::Custom {
                region: region.to_string(),
                endpoint: endpoint.to_string(),
            },
            credentials,
        })
    }

    fn bucket(&self, name: &str) -> StoreResult<Bucket> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|err| StoreError::Failed {
                op: "configure",
                key: name.to_string(),
                reason: err.to_string(),
            })?
            .with_path_style();
        Ok(bucket)
    }

    /// Content type and length for `key`, erroring with `NotFound` when the
    /// store reports no object there.
    async fn head(
        &self,
        bucket: &Bucket,
        bucket_name: &str,
        key: &str,
    ) -> StoreResult<(String, u64)> {
        let (head, code) = bucket
            .head_object(key)
            .await
            .map_err(|err| classify("head", bucket_name, key, err))?;
        if let Some(err) = status_error("head", bucket_name, key, code) {
            return Err(err);
        }
        let content_type = head
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let size = head.content_length.unwrap_or(0).max(0) as u64;
        Ok((content_type, size))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> StoreResult<Listing> {
        let handle = self.bucket(bucket)?;
        let pages = handle
            .list(prefix.to_string(), delimiter.map(str::to_string))
            .await
            .map_err(|err| classify("list", bucket, prefix, err))?;

        let mut listing = Listing::default();
        for page in pages {
            for group in page.common_prefixes.into_iter().flatten() {
                listing.common_prefixes.push(group.prefix);
            }
            for object in page.contents {
                listing.objects.push(StoredObject {
                    last_modified: DateTime::parse_from_rfc3339(&object.last_modified)
                        .ok()
                        .map(|ts| ts.with_timezone(&Utc)),
                    key: object.key,
                    size: object.size,
                });
            }
        }
        debug!(
            bucket,
            prefix,
            objects = listing.objects.len(),
            prefixes = listing.common_prefixes.len(),
            "listed objects"
        );
        Ok(listing)
    }

    async fn get(&self, bucket: &str, key: &str) -> StoreResult<ObjectBody> {
        let handle = self.bucket(bucket)?;
        let (content_type, size) = self.head(&handle, bucket, key).await?;

        let response = handle
            .get_object_stream(key)
            .await
            .map_err(|err| classify("get", bucket, key, err))?;
        if let Some(err) = status_error("get", bucket, key, response.status_code) {
            return Err(err);
        }

        let bytes: ByteStream =
            Box::pin(response.bytes.map(|chunk| chunk.map_err(io::Error::other)));
        Ok(ObjectBody {
            content_type,
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
        let handle = self.bucket(bucket)?;
        let response = handle
            .put_object_with_content_type(key, &bytes, content_type)
            .await
            .map_err(|err| classify("put", bucket, key, err))?;
        match status_error("put", bucket, key, response.status_code()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        content_type: &str,
    ) -> StoreResult<()> {
        let handle = self.bucket(bucket)?;
        let mut reader = reader;
        let response = handle
            .put_object_stream_with_content_type(&mut reader, key, content_type)
            .await
            .map_err(|err| classify("put", bucket, key, err))?;
        match status_error("put", bucket, key, response.status_code()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<()> {
        let src = self.bucket(src_bucket)?;
        let dst = self.bucket(dst_bucket)?;

        // rust-s3 has no cross-bucket server-side copy, so the copy is
        // mediated through this process: stream the source body straight into
        // a streamed upload of the destination.
        let (content_type, _) = self.head(&src, src_bucket, src_key).await?;
        let response = src
            .get_object_stream(src_key)
            .await
            .map_err(|err| classify("copy", src_bucket, src_key, err))?;
        if let Some(err) = status_error("copy", src_bucket, src_key, response.status_code) {
            return Err(err);
        }

        let mut reader =
            StreamReader::new(response.bytes.map(|chunk| chunk.map_err(io::Error::other)));
        let uploaded = dst
            .put_object_stream_with_content_type(&mut reader, dst_key, &content_type)
            .await
            .map_err(|err| classify("copy", dst_bucket, dst_key, err))?;
        match status_error("copy", dst_bucket, dst_key, uploaded.status_code()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let handle = self.bucket(bucket)?;
        let response = handle
            .delete_object(key)
            .await
            .map_err(|err| classify("delete", bucket, key, err))?;
        match status_error("delete", bucket, key, response.status_code()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Map a vendor error onto the capability taxonomy.
///
/// Garage reports its "background replication has not caught up" condition as
/// HTTP 503 with a `ServiceUnavailable` code in the body; that class becomes
/// `Transient`. A 404 becomes `NotFound`. Everything else is terminal.
fn classify(op: &'static str, bucket: &str, key: &str, err: S3Error) -> StoreError {
    match err {
        S3Error::HttpFailWithBody(code, body) => {
            if code == 404 {
                StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else if code == 503 || body.contains("ServiceUnavailable") {
                StoreError::Transient {
                    op,
                    key: key.to_string(),
                    reason: format!("HTTP {code}: {}", body.trim()),
                }
            } else {
                StoreError::Failed {
                    op,
                    key: key.to_string(),
                    reason: format!("HTTP {code}: {}", body.trim()),
                }
            }
        }
        other => StoreError::Failed {
            op,
            key: key.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Status-code guard for calls that report failure through the returned code
/// rather than an `Err`.
fn status_error(op: &'static str, bucket: &str, key: &str, code: u16) -> Option<StoreError> {
    match code {
        200..=299 => None,
        404 => Some(StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }),
        503 => Some(StoreError::Transient {
            op,
            key: key.to_string(),
            reason: format!("HTTP {code}"),
        }),
        _ => Some(StoreError::Failed {
            op,
            key: key.to_string(),
            reason: format!("HTTP {code}"),
        }),
    }
}
