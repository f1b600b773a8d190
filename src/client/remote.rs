//! The three remote collaborators of an upload, as traits so the coordinator
//! can run against HTTP or in-memory fakes.

use crate::{
    client::file::UploadFile,
    models::{
        grant::{GrantRequest, UploadGrant},
        video::{NewVideoRecord, VideoQuery, VideoRecord},
    },
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
pub trait GrantClient: Send + Sync {
    async fn request_grant(&self, req: &GrantRequest) -> Result<UploadGrant, RemoteError>;
}

#[async_trait]
pub trait TransferClient: Send + Sync {
    /// PUT the file to `grant.upload_url`. Only a 2xx answer is success.
    async fn put_object(&self, grant: &UploadGrant, file: &UploadFile) -> Result<(), RemoteError>;
}

#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn create_record(&self, new: &NewVideoRecord) -> Result<VideoRecord, RemoteError>;

    async fn list_records(&self, query: &VideoQuery) -> Result<Vec<VideoRecord>, RemoteError>;

    /// Categories a record may be filed under.
    async fn list_categories(&self) -> Result<Vec<String>, RemoteError>;
}
