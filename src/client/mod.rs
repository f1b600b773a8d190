//! Client side of the pipeline: the upload coordinator and its collaborators.

pub mod coordinator;
pub mod file;
pub mod http;
pub mod identity;
pub mod remote;
pub mod sort;

pub use coordinator::{
    CoordinatorSettings, PendingCommit, UploadCoordinator, UploadError, UploadForm, UploadPhase,
    UploadState,
};
pub use file::UploadFile;
pub use http::HttpApi;
pub use identity::{AuthToken, IdentityProvider, StaticTokenProvider};
