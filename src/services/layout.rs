//! Addressing rules shared by the grant service and the metadata store.
//!
//! Keys look like `videos/{videoId}.{ext}` and are publicly readable at
//! `{public_base_url}/objects/{key}`.

/// Key prefix every uploaded video lives under.
pub const VIDEO_PREFIX: &str = "videos/";

/// Route prefix of the object store on the public base URL.
pub const OBJECTS_ROUTE: &str = "/objects/";

#[derive(Clone, Debug)]
pub struct StorageLayout {
    public_base_url: String,
}

impl StorageLayout {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub fn object_key(&self, video_id: &str, ext: &str) -> String {
        format!("{}{}.{}", VIDEO_PREFIX, video_id, ext)
    }

    /// Public, unsigned locator of `key`.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}{}{}", self.public_base_url, OBJECTS_ROUTE, key)
    }

    /// Recover the object key from a URL built by [`StorageLayout::object_url`].
    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base_url.as_str())?
            .strip_prefix(OBJECTS_ROUTE)
            .filter(|key| !key.is_empty() && !key.contains('?'))
    }

    /// Whether `url` is the canonical locator of the binary for `video_id`.
    ///
    /// Returns the object key on success.
    pub fn canonical_key_for<'a>(&self, video_id: &str, url: &'a str) -> Option<&'a str> {
        let key = self.key_from_url(url)?;
        let (stem, ext) = key.strip_prefix(VIDEO_PREFIX)?.rsplit_once('.')?;
        if stem == video_id && is_valid_extension(ext) {
            Some(key)
        } else {
            None
        }
    }
}

/// Extensions are 1 to 8 ASCII alphanumerics.
pub fn is_valid_extension(ext: &str) -> bool {
    (1..=8).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> StorageLayout {
        StorageLayout::new("http://127.0.0.1:3000/")
    }

    #[test]
    fn object_urls_round_trip_to_keys() {
        let key = layout().object_key("abc", "mp4");
        let url = layout().object_url(&key);
        assert_eq!(url, "http://127.0.0.1:3000/objects/videos/abc.mp4");
        assert_eq!(layout().key_from_url(&url), Some("videos/abc.mp4"));
    }

    #[test]
    fn canonical_key_requires_matching_video_id() {
        let url = "http://127.0.0.1:3000/objects/videos/abc.mp4";
        assert_eq!(layout().canonical_key_for("abc", url), Some("videos/abc.mp4"));
        assert_eq!(layout().canonical_key_for("abd", url), None);
    }

    #[test]
    fn foreign_hosts_and_signed_urls_are_not_canonical() {
        assert_eq!(
            layout().canonical_key_for("abc", "https://evil.example/objects/videos/abc.mp4"),
            None
        );
        assert_eq!(
            layout().canonical_key_for(
                "abc",
                "http://127.0.0.1:3000/objects/videos/abc.mp4?exp=1&sig=00"
            ),
            None
        );
    }
}
