//! `/generatePreSignedURL` — the first phase of an upload.

use crate::{
    errors::AppError,
    models::grant::{GrantRequest, UploadGrant},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};

/// GET `/generatePreSignedURL?file_name=&content_type=`
pub async fn generate_presigned_url(
    State(state): State<AppState>,
    req: Result<Query<GrantRequest>, QueryRejection>,
) -> Result<Json<UploadGrant>, AppError> {
    let Query(req) = req?;
    issue(&state, req)
}

/// POST `/generatePreSignedURL` with a JSON body.
pub async fn generate_presigned_url_json(
    State(state): State<AppState>,
    req: Result<Json<GrantRequest>, JsonRejection>,
) -> Result<Json<UploadGrant>, AppError> {
    let Json(req) = req?;
    issue(&state, req)
}

fn issue(state: &AppState, req: GrantRequest) -> Result<Json<UploadGrant>, AppError> {
    let grant = state
        .grants
        .request_upload_grant(&req.file_name, &req.content_type)?;
    Ok(Json(grant))
}
