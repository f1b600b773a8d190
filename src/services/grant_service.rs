//! UploadGrantService — mints a video id and a pre-signed PUT URL for it.
//!
//! Minting is a pure credential operation: nothing is written and no storage
//! is reserved until the returned URL is used.

use crate::{
    config::MAX_GRANT_TTL_SECS,
    models::grant::UploadGrant,
    services::{
        layout::{StorageLayout, is_valid_extension},
        signer::{SignatureError, UrlSigner},
    },
};
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Extension used when neither the file name nor the content type tells us better.
const DEFAULT_EXTENSION: &str = "mp4";

#[derive(Debug, Error)]
pub enum GrantError {
    #[error("content type `{0}` is not an accepted video MIME type")]
    InvalidContentType(String),
    #[error("could not sign upload URL: {0}")]
    Signing(#[from] SignatureError),
}

#[derive(Clone, Debug)]
pub struct UploadGrantService {
    signer: UrlSigner,
    layout: StorageLayout,
    ttl_secs: u64,
}

impl UploadGrantService {
    /// `ttl_secs` is clamped to `1..=MAX_GRANT_TTL_SECS`.
    pub fn new(signer: UrlSigner, layout: StorageLayout, ttl_secs: u64) -> Self {
        Self {
            signer,
            layout,
            ttl_secs: ttl_secs.clamp(1, MAX_GRANT_TTL_SECS),
        }
    }

    /// Issue a fresh grant. Every call mints a new id, so retrying is always safe.
    ///
    /// `file_name` only informs the extension; it never becomes part of the key.
    pub fn request_upload_grant(
        &self,
        file_name: &str,
        content_type: &str,
    ) -> Result<UploadGrant, GrantError> {
        let content_type = normalize_content_type(content_type)?;
        let ext = infer_extension(file_name, &content_type);

        let video_id = Uuid::new_v4().to_string();
        let object_key = self.layout.object_key(&video_id, &ext);
        let expires_at = Utc::now() + Duration::seconds(self.ttl_secs as i64);
        let signature = self
            .signer
            .sign_put(&object_key, &content_type, expires_at.timestamp())?;

        let video_url = self.layout.object_url(&object_key);
        let upload_url = format!(
            "{}?exp={}&sig={}",
            video_url,
            expires_at.timestamp(),
            signature
        );

        info!(
            video_id = %video_id,
            key = %object_key,
            content_type = %content_type,
            ttl_secs = self.ttl_secs,
            "issued upload grant"
        );

        Ok(UploadGrant {
            video_id,
            upload_url,
            video_url,
            object_key,
            expires_in_seconds: self.ttl_secs,
            expires_at,
        })
    }
}

/// Lowercase and validate a `video/*` MIME type. Parameters are not allowed.
pub fn normalize_content_type(raw: &str) -> Result<String, GrantError> {
    let value = raw.trim().to_ascii_lowercase();
    let invalid = || GrantError::InvalidContentType(raw.to_string());

    let (top, sub) = value.split_once('/').ok_or_else(invalid)?;
    if top != "video" || sub.is_empty() || !sub.bytes().all(is_mime_token_byte) {
        return Err(invalid());
    }
    Ok(value)
}

fn is_mime_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'!' | b'#' | b'$' | b'&' | b'-' | b'^' | b'_' | b'.' | b'+')
}

/// Pick the key extension from the file name, falling back to the content type.
pub fn infer_extension(file_name: &str, content_type: &str) -> String {
    let from_name = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| is_valid_extension(ext));
    if let Some(ext) = from_name {
        return ext;
    }

    let from_type = match content_type {
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/x-msvideo" => "avi",
        "video/3gpp" => "3gp",
        _ => DEFAULT_EXTENSION,
    };
    from_type.to_string()
}
