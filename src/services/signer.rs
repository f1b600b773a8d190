//! HMAC-SHA256 signing of pre-signed object URLs.
//!
//! A signature binds the HTTP method, object key, content type and expiry, so a
//! grant for `videos/a.mp4` as `video/mp4` cannot be replayed against another
//! key or with another content type.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing secret is not configured")]
    MissingSecret,
    #[error("signing key rejected: {0}")]
    InvalidKey(String),
    #[error("upload URL expired")]
    Expired,
    #[error("upload URL signature does not match")]
    Mismatch,
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign a PUT of `key` with `content_type`, valid until unix time `expires_at`.
    pub fn sign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_at: i64,
    ) -> Result<String, SignatureError> {
        let mac = self.mac_for(key, content_type, expires_at)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a signature produced by [`UrlSigner::sign_put`].
    ///
    /// Expiry is checked first; the signature comparison is constant time.
    pub fn verify_put(
        &self,
        key: &str,
        content_type: &str,
        expires_at: i64,
        signature: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        if now > expires_at {
            return Err(SignatureError::Expired);
        }
        let provided = hex::decode(signature).map_err(|_| SignatureError::Mismatch)?;
        self.mac_for(key, content_type, expires_at)?
            .verify_slice(&provided)
            .map_err(|_| SignatureError::Mismatch)
    }

    fn mac_for(
        &self,
        key: &str,
        content_type: &str,
        expires_at: i64,
    ) -> Result<HmacSha256, SignatureError> {
        if self.secret.is_empty() {
            return Err(SignatureError::MissingSecret);
        }
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        mac.update(canonical_put(key, content_type, expires_at).as_bytes());
        Ok(mac)
    }
}

fn canonical_put(key: &str, content_type: &str, expires_at: i64) -> String {
    format!(
        "PUT\n{}\n{}\n{}",
        key,
        content_type.trim().to_ascii_lowercase(),
        expires_at
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXP: i64 = 1_900_000_000;

    fn signer() -> UrlSigner {
        UrlSigner::new("test-secret-key")
    }

    #[test]
    fn valid_signature_verifies() {
        let sig = signer().sign_put("videos/a.mp4", "video/mp4", EXP).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(
            signer()
                .verify_put("videos/a.mp4", "video/mp4", EXP, &sig, EXP - 10)
                .is_ok()
        );
    }

    #[test]
    fn expired_signature_is_rejected_before_comparison() {
        let sig = signer().sign_put("videos/a.mp4", "video/mp4", EXP).unwrap();
        assert_eq!(
            signer().verify_put("videos/a.mp4", "video/mp4", EXP, &sig, EXP + 1),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn signature_is_bound_to_key_and_content_type() {
        let sig = signer().sign_put("videos/a.mp4", "video/mp4", EXP).unwrap();
        assert_eq!(
            signer().verify_put("videos/b.mp4", "video/mp4", EXP, &sig, EXP),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            signer().verify_put("videos/a.mp4", "text/html", EXP, &sig, EXP),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            signer().verify_put("videos/a.mp4", "video/mp4", EXP + 1, &sig, EXP),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn content_type_case_does_not_matter() {
        let sig = signer().sign_put("videos/a.mp4", "Video/MP4", EXP).unwrap();
        assert!(
            signer()
                .verify_put("videos/a.mp4", "video/mp4", EXP, &sig, EXP)
                .is_ok()
        );
    }

    #[test]
    fn different_secrets_disagree() {
        let sig = UrlSigner::new("key1")
            .sign_put("videos/a.mp4", "video/mp4", EXP)
            .unwrap();
        assert_eq!(
            UrlSigner::new("key2").verify_put("videos/a.mp4", "video/mp4", EXP, &sig, EXP),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn empty_secret_cannot_sign() {
        assert_eq!(
            UrlSigner::new("").sign_put("videos/a.mp4", "video/mp4", EXP),
            Err(SignatureError::MissingSecret)
        );
    }

    #[test]
    fn garbage_signature_is_a_mismatch() {
        assert_eq!(
            signer().verify_put("videos/a.mp4", "video/mp4", EXP, "zz-not-hex", EXP),
            Err(SignatureError::Mismatch)
        );
    }
}
