//! The binary selected for upload.

use bytes::Bytes;
use std::{
    io,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug)]
pub enum FileSource {
    /// Streamed from disk at transfer time.
    Path(PathBuf),
    Memory(Bytes),
}

#[derive(Clone, Debug)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub source: FileSource,
}

impl UploadFile {
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size_bytes: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    /// Stat a file on disk. The content type is guessed from the extension
    /// when not given.
    pub async fn open(path: impl AsRef<Path>, content_type: Option<String>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type.unwrap_or_else(|| guess_content_type(&file_name).into());

        Ok(Self {
            file_name,
            content_type,
            size_bytes: meta.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }
}

/// Video MIME type for a file name, `video/mp4` when unknown.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "3gp" => "video/3gpp",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type("clip.MOV"), "video/quicktime");
        assert_eq!(guess_content_type("clip.webm"), "video/webm");
        assert_eq!(guess_content_type("clip"), "video/mp4");
    }

    #[tokio::test]
    async fn open_reads_size_and_name_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beach.mkv");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let file = UploadFile::open(&path, None).await.unwrap();
        assert_eq!(file.file_name, "beach.mkv");
        assert_eq!(file.content_type, "video/x-matroska");
        assert_eq!(file.size_bytes, 10);
    }

    #[tokio::test]
    async fn open_refuses_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(UploadFile::open(dir.path(), None).await.is_err());
    }
}
