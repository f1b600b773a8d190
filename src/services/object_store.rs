//! ObjectStoreService — a local stand-in for the bucket uploads land in.
//!
//! Payloads live on disk sharded beneath `base_path/{shard}/{shard}/{key}`,
//! bookkeeping rows live in SQLite. Writes are only accepted through a
//! pre-signed URL and each key can be written exactly once.
//!
//! A write claims its key with an uncommitted row before the payload is moved
//! into place and only flips `committed` once the rename succeeded. Readers
//! and [`ObjectStoreService::exists`] see committed rows only.

use crate::{
    models::object::StoredObject,
    services::{
        layout::VIDEO_PREFIX,
        signer::{SignatureError, UrlSigner},
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("object `{0}` was already uploaded; request a new grant")]
    AlreadyExists(String),
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("missing Content-Type header")]
    MissingContentType,
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Query parameters of a pre-signed PUT.
#[derive(Clone, Debug)]
pub struct SignedPut {
    pub expires_at: i64,
    pub signature: String,
}

#[derive(Clone)]
pub struct ObjectStoreService {
    /// Shared SQLite connection pool used for bookkeeping rows.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where payloads are stored.
    pub base_path: PathBuf,

    signer: UrlSigner,
}

const MAX_OBJECT_KEY_LEN: usize = 1024;

impl ObjectStoreService {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            signer,
        }
    }

    /// Reject keys outside `videos/` and trivial path traversal vectors.
    fn ensure_key_safe(&self, key: &str) -> ObjectStoreResult<()> {
        if key.len() <= VIDEO_PREFIX.len() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(ObjectStoreError::InvalidObjectKey);
        }
        if !key.starts_with(VIDEO_PREFIX) || key.contains("..") || key.contains("//") {
            return Err(ObjectStoreError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(ObjectStoreError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Two-level shard directories from MD5(key), keeping directories small.
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    async fn fetch_object(&self, key: &str) -> ObjectStoreResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(
            "SELECT id, key, content_type, size_bytes, etag, created_at
             FROM objects WHERE key = ? AND committed = 1",
        )
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => ObjectStoreError::ObjectNotFound(key.to_string()),
            other => ObjectStoreError::Sqlx(other),
        })
    }

    /// Accept a pre-signed PUT and stream its body to disk.
    ///
    /// - Verifies expiry and signature against key and content type.
    /// - Streams into a temp file while computing size and MD5, then fsyncs.
    /// - Claims the key with an uncommitted INSERT; a second write of the
    ///   same key fails on the unique constraint without touching the payload.
    /// - Renames the temp file into place, then marks the row committed.
    ///
    /// Temp files are removed on every error path.
    pub async fn put_signed_object<S>(
        &self,
        key: &str,
        content_type: Option<&str>,
        signed: &SignedPut,
        stream: S,
    ) -> ObjectStoreResult<StoredObject>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        self.ensure_key_safe(key)?;
        let content_type = content_type
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
            .ok_or(ObjectStoreError::MissingContentType)?;
        self.signer.verify_put(
            key,
            &content_type,
            signed.expires_at,
            &signed.signature,
            Utc::now().timestamp(),
        )?;

        if self.is_claimed(key).await? {
            return Err(ObjectStoreError::AlreadyExists(key.to_string()));
        }

        let file_path = self.object_path(key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ObjectStoreError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(ObjectStoreError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ObjectStoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ObjectStoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ObjectStoreError::Io(err));
        }
        drop(file);

        let etag = format!("{:x}", digest.compute());
        let insert_result = sqlx::query_as::<_, StoredObject>(
            r#"
            INSERT INTO objects (id, key, content_type, size_bytes, etag, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, key, content_type, size_bytes, etag, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key)
        .bind(&content_type)
        .bind(size_bytes)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        let object = match insert_result {
            Ok(obj) => obj,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                if is_unique_violation(&err) {
                    return Err(ObjectStoreError::AlreadyExists(key.to_string()));
                }
                return Err(ObjectStoreError::Sqlx(err));
            }
        };

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            self.release_claim(key).await;
            return Err(ObjectStoreError::Io(err));
        }

        if let Err(err) = sqlx::query("UPDATE objects SET committed = 1 WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await
        {
            let _ = fs::remove_file(&file_path).await;
            self.release_claim(key).await;
            return Err(ObjectStoreError::Sqlx(err));
        }

        info!(key, size_bytes, etag = %object.etag, "stored object");
        Ok(object)
    }

    /// Fetch an object for reading.
    ///
    /// Returns ObjectNotFound if the row exists but the payload is missing.
    pub async fn get_object_reader(&self, key: &str) -> ObjectStoreResult<(StoredObject, File)> {
        self.ensure_key_safe(key)?;
        let object = self.fetch_object(key).await?;

        let file_path = self.object_path(key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                debug!("payload for {} missing at {}", key, file_path.display());
                ObjectStoreError::ObjectNotFound(key.to_string())
            } else {
                ObjectStoreError::Io(err)
            }
        })?;

        Ok((object, file))
    }

    pub async fn get_object_metadata(&self, key: &str) -> ObjectStoreResult<StoredObject> {
        self.ensure_key_safe(key)?;
        self.fetch_object(key).await
    }

    /// Whether a binary has been fully written under `key`.
    pub async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(1) FROM objects WHERE key = ? AND committed = 1",
        )
        .bind(key)
        .fetch_one(&*self.db)
        .await?;
        Ok(found > 0)
    }

    /// Whether any write, finished or in progress, holds `key`.
    async fn is_claimed(&self, key: &str) -> ObjectStoreResult<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM objects WHERE key = ?")
            .bind(key)
            .fetch_one(&*self.db)
            .await?;
        Ok(found > 0)
    }

    async fn release_claim(&self, key: &str) {
        if let Err(err) = sqlx::query("DELETE FROM objects WHERE key = ? AND committed = 0")
            .bind(key)
            .execute(&*self.db)
            .await
        {
            warn!(key, error = %err, "could not release object claim");
        }
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
