//! UploadCoordinator — validate, grant, transfer, commit.
//!
//! An attempt is an explicit [`UploadState`] value advanced by
//! [`UploadCoordinator::step`], one side effect per transition. The order is
//! fixed: the id is minted before any byte moves and metadata is committed
//! only after the transfer succeeded, so a committed record always names a
//! binary that was written at its address.

use crate::{
    client::{
        file::UploadFile,
        remote::{GrantClient, MetadataClient, RemoteError, TransferClient},
    },
    models::{
        grant::{GrantRequest, UploadGrant},
        video::{NewVideoRecord, VideoRecord},
    },
    validation::{ValidationErrors, validate_video_fields},
};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What the user filled in on the upload form.
#[derive(Clone, Debug, Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub file: Option<UploadFile>,
}

/// A form that passed validation.
#[derive(Clone, Debug)]
pub struct ValidatedUpload {
    pub title: String,
    pub description: String,
    pub category: String,
    pub file: UploadFile,
}

/// Everything needed to commit metadata for a binary that is already stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingCommit {
    pub video_id: String,
    pub video_url: String,
    pub title: String,
    pub description: String,
    pub category: String,
}

impl PendingCommit {
    fn new(grant: &UploadGrant, upload: &ValidatedUpload) -> Self {
        Self {
            video_id: grant.video_id.clone(),
            video_url: grant.video_url.clone(),
            title: upload.title.clone(),
            description: upload.description.clone(),
            category: upload.category.clone(),
        }
    }

    pub fn to_record(&self) -> NewVideoRecord {
        NewVideoRecord {
            video_id: self.video_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            video_url: self.video_url.clone(),
            upload_date: Some(chrono::Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("please fix the form: {0}")]
    Validation(ValidationErrors),
    #[error("could not get upload permission, nothing was uploaded: {0}")]
    Grant(RemoteError),
    #[error("video transfer failed, submit again to re-upload: {0}")]
    Transfer(RemoteError),
    #[error("video uploaded but saving its details failed, retry saving only: {source}")]
    Metadata {
        pending: PendingCommit,
        source: RemoteError,
    },
    #[error("video `{0}` already has a record; start a new upload")]
    DuplicateId(String),
    #[error("upload cancelled")]
    Cancelled,
    #[error("an upload is already in progress")]
    Busy,
}

impl UploadError {
    /// The commit can be retried alone, without re-uploading the binary.
    pub fn pending_commit(&self) -> Option<&PendingCommit> {
        match self {
            UploadError::Metadata { pending, .. } => Some(pending),
            _ => None,
        }
    }
}

/// Coarse progress reported to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Validating,
    RequestingGrant,
    Transferring,
    CommittingMetadata,
    Succeeded,
    Failed,
}

impl UploadPhase {
    /// Whether a new submission may start (the submit button is enabled).
    pub fn accepts_submit(self) -> bool {
        matches!(
            self,
            UploadPhase::Idle | UploadPhase::Succeeded | UploadPhase::Failed
        )
    }
}

#[derive(Clone, Debug)]
pub enum UploadState {
    Idle,
    Validating(UploadForm),
    RequestingGrant(ValidatedUpload),
    Transferring {
        grant: UploadGrant,
        upload: ValidatedUpload,
    },
    CommittingMetadata(PendingCommit),
    Succeeded(VideoRecord),
    Failed(UploadError),
}

impl UploadState {
    pub fn phase(&self) -> UploadPhase {
        match self {
            UploadState::Idle => UploadPhase::Idle,
            UploadState::Validating(_) => UploadPhase::Validating,
            UploadState::RequestingGrant(_) => UploadPhase::RequestingGrant,
            UploadState::Transferring { .. } => UploadPhase::Transferring,
            UploadState::CommittingMetadata(_) => UploadPhase::CommittingMetadata,
            UploadState::Succeeded(_) => UploadPhase::Succeeded,
            UploadState::Failed(_) => UploadPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Succeeded(_) | UploadState::Failed(_))
    }
}

#[derive(Clone, Debug)]
pub struct CoordinatorSettings {
    /// Deadline for the grant and commit calls.
    pub request_timeout: Duration,
    /// Slowest transfer rate tolerated before the PUT is abandoned.
    pub min_transfer_bytes_per_sec: u64,
    /// Optional category allow-list checked before any network call.
    pub categories: Option<Vec<String>>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            min_transfer_bytes_per_sec: 64 * 1024,
            categories: None,
        }
    }
}

impl CoordinatorSettings {
    /// Transfer deadline: the request timeout plus time for `size_bytes` at the
    /// minimum rate.
    pub fn transfer_timeout(&self, size_bytes: u64) -> Duration {
        let rate = self.min_transfer_bytes_per_sec.max(1);
        self.request_timeout + Duration::from_secs(size_bytes.div_ceil(rate))
    }
}

pub struct UploadCoordinator {
    grants: Arc<dyn GrantClient>,
    transfer: Arc<dyn TransferClient>,
    metadata: Arc<dyn MetadataClient>,
    settings: CoordinatorSettings,
    in_flight: AtomicBool,
    phase_tx: watch::Sender<UploadPhase>,
}

/// Clears the in-flight flag however the attempt ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl UploadCoordinator {
    pub fn new(
        grants: Arc<dyn GrantClient>,
        transfer: Arc<dyn TransferClient>,
        metadata: Arc<dyn MetadataClient>,
        settings: CoordinatorSettings,
    ) -> Self {
        let (phase_tx, _) = watch::channel(UploadPhase::Idle);
        Self {
            grants,
            transfer,
            metadata,
            settings,
            in_flight: AtomicBool::new(false),
            phase_tx,
        }
    }

    /// Observe phase changes of the current attempt.
    pub fn subscribe(&self) -> watch::Receiver<UploadPhase> {
        self.phase_tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Replace the category allow-list with the set the server accepts, so
    /// an unknown category fails validation before a grant is requested.
    pub async fn load_categories(&mut self) -> Result<&[String], RemoteError> {
        let categories =
            bounded(self.settings.request_timeout, self.metadata.list_categories()).await?;
        info!(count = categories.len(), "loaded server categories");
        Ok(self.settings.categories.insert(categories).as_slice())
    }

    /// Run one attempt from validation to a terminal state.
    ///
    /// Every call starts from scratch and mints a new video id. A call made
    /// while another attempt is in flight fails with [`UploadError::Busy`].
    pub async fn submit(
        &self,
        form: UploadForm,
        cancel: &CancellationToken,
    ) -> Result<VideoRecord, UploadError> {
        self.run(UploadState::Validating(form), cancel).await
    }

    /// Commit metadata for a binary that is already stored, skipping the
    /// grant and the transfer.
    pub async fn retry_commit(&self, pending: PendingCommit) -> Result<VideoRecord, UploadError> {
        self.run(
            UploadState::CommittingMetadata(pending),
            &CancellationToken::new(),
        )
        .await
    }

    async fn run(
        &self,
        initial: UploadState,
        cancel: &CancellationToken,
    ) -> Result<VideoRecord, UploadError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(UploadError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        let mut state = initial;
        loop {
            self.phase_tx.send_replace(state.phase());
            if state.is_terminal() {
                break;
            }
            state = self.step(state, cancel).await;
        }

        match state {
            UploadState::Succeeded(record) => Ok(record),
            UploadState::Failed(err) => Err(err),
            _ => unreachable!("loop exits on terminal states only"),
        }
    }

    /// Advance `state` by exactly one transition.
    pub async fn step(&self, state: UploadState, cancel: &CancellationToken) -> UploadState {
        match state {
            UploadState::Idle => UploadState::Idle,
            UploadState::Validating(form) => match self.validate(form) {
                Ok(upload) => UploadState::RequestingGrant(upload),
                Err(errors) => UploadState::Failed(UploadError::Validation(errors)),
            },
            UploadState::RequestingGrant(upload) => {
                let req = GrantRequest {
                    file_name: upload.file.file_name.clone(),
                    content_type: upload.file.content_type.clone(),
                };
                let call = bounded(self.settings.request_timeout, self.grants.request_grant(&req));
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => return UploadState::Failed(UploadError::Cancelled),
                    outcome = call => outcome,
                };
                match outcome {
                    Ok(grant) => {
                        info!(video_id = %grant.video_id, "upload grant received");
                        UploadState::Transferring { grant, upload }
                    }
                    Err(err) => {
                        warn!(error = %err, "upload grant failed");
                        UploadState::Failed(UploadError::Grant(err))
                    }
                }
            }
            UploadState::Transferring { grant, upload } => {
                let deadline = self.settings.transfer_timeout(upload.file.size_bytes);
                let call = bounded(deadline, self.transfer.put_object(&grant, &upload.file));
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(video_id = %grant.video_id, "transfer cancelled, grant discarded");
                        return UploadState::Failed(UploadError::Cancelled);
                    }
                    outcome = call => outcome,
                };
                match outcome {
                    Ok(()) => {
                        info!(
                            video_id = %grant.video_id,
                            size_bytes = upload.file.size_bytes,
                            "transfer complete"
                        );
                        UploadState::CommittingMetadata(PendingCommit::new(&grant, &upload))
                    }
                    Err(err) => {
                        warn!(video_id = %grant.video_id, error = %err, "transfer failed");
                        UploadState::Failed(UploadError::Transfer(err))
                    }
                }
            }
            UploadState::CommittingMetadata(pending) => {
                let record = pending.to_record();
                match bounded(
                    self.settings.request_timeout,
                    self.metadata.create_record(&record),
                )
                .await
                {
                    Ok(saved) => {
                        info!(video_id = %saved.video_id, "video metadata committed");
                        UploadState::Succeeded(saved)
                    }
                    Err(RemoteError::Status { status: 409, .. }) => {
                        UploadState::Failed(UploadError::DuplicateId(pending.video_id))
                    }
                    Err(RemoteError::Status {
                        status: 400,
                        message,
                    }) => {
                        // Resending the same fields would be refused again.
                        warn!(
                            video_id = %pending.video_id,
                            error = %message,
                            "server rejected video metadata"
                        );
                        let mut errors = ValidationErrors::default();
                        errors.push("metadata", message);
                        UploadState::Failed(UploadError::Validation(errors))
                    }
                    Err(err) => {
                        warn!(
                            video_id = %pending.video_id,
                            video_url = %pending.video_url,
                            error = %err,
                            "metadata commit failed, binary is orphaned until retried"
                        );
                        UploadState::Failed(UploadError::Metadata {
                            pending,
                            source: err,
                        })
                    }
                }
            }
            terminal @ (UploadState::Succeeded(_) | UploadState::Failed(_)) => terminal,
        }
    }

    fn validate(&self, form: UploadForm) -> Result<ValidatedUpload, ValidationErrors> {
        let mut errors = validate_video_fields(
            &form.title,
            &form.description,
            &form.category,
            self.settings.categories.as_deref(),
        );
        match &form.file {
            None => errors.push("file", "Select a video file."),
            Some(file) if file.size_bytes == 0 => errors.push("file", "The selected file is empty."),
            Some(_) => {}
        }
        errors.into_result()?;

        let file = form.file.ok_or_else(ValidationErrors::default)?;
        Ok(ValidatedUpload {
            title: form.title.trim().to_string(),
            description: form.description.trim().to_string(),
            category: form.category.trim().to_string(),
            file,
        })
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, RemoteError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(RemoteError::Timeout))
}
