//! Metadata commit and the read path.

use crate::{
    errors::AppError,
    models::video::{NewVideoRecord, VideoQuery, VideoRecord},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use tracing::debug;

/// POST `/saveVideoMetadata` — commit the record for an uploaded binary.
pub async fn save_video_metadata(
    State(state): State<AppState>,
    new: Result<Json<NewVideoRecord>, JsonRejection>,
) -> Result<Json<VideoRecord>, AppError> {
    let Json(new) = new?;
    let record = state.metadata.create_record(new).await?;
    Ok(Json(record))
}

/// GET `/fetchVideos?searchQuery=&category=` — unordered list of records.
pub async fn fetch_videos(
    State(state): State<AppState>,
    query: Result<Query<VideoQuery>, QueryRejection>,
) -> Result<Json<Vec<VideoRecord>>, AppError> {
    let Query(query) = query?;
    let records = state.metadata.list_records(&query).await?;
    debug!(
        count = records.len(),
        search = ?query.search(),
        category = ?query.category_filter(),
        "listed videos"
    );
    Ok(Json(records))
}

/// GET `/categories` — the tags a record may be filed under.
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.metadata.categories().to_vec())
}
