//! Represents an uploaded binary held by the local object store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Bookkeeping row for a stored binary.
///
/// The struct stores metadata, not the content bytes.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct StoredObject {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Object key, e.g. `videos/{videoId}.mp4`.
    pub key: String,

    /// Content type the grant was signed for.
    pub content_type: String,

    pub size_bytes: i64,

    /// MD5 of the payload, lowercase hex.
    pub etag: String,

    pub created_at: DateTime<Utc>,
}
