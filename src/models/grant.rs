//! Upload grants: a minted video id plus a pre-signed PUT URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters accepted by `/generatePreSignedURL`, as query or JSON body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GrantRequest {
    pub file_name: String,
    pub content_type: String,
}

/// A time-limited, single-use authorization to write one object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    pub video_id: String,

    /// Pre-signed URL; only a PUT with the granted content type is accepted.
    pub upload_url: String,

    /// Where the binary will be publicly readable once written.
    pub video_url: String,

    /// Storage key, `videos/{videoId}.{ext}`.
    pub object_key: String,

    pub expires_in_seconds: u64,

    pub expires_at: DateTime<Utc>,
}
