//! Defines routes for the upload pipeline.
//!
//! ## Structure
//! - **Grant**
//!   - `GET|POST /generatePreSignedURL` — mint a video id and pre-signed PUT URL
//!
//! - **Object store**
//!   - `PUT  /objects/{*key}?exp=&sig=` — pre-signed binary upload (once per key)
//!   - `GET  /objects/{*key}` — public download
//!   - `HEAD /objects/{*key}` — metadata only
//!
//! - **Metadata**
//!   - `POST /saveVideoMetadata` — commit a record for an uploaded binary
//!   - `GET  /fetchVideos` — list records (supports searchQuery, category)
//!   - `GET  /categories` — configured category tags

use crate::{
    handlers::{
        grant_handlers::{generate_presigned_url, generate_presigned_url_json},
        health_handlers::{healthz, readyz},
        object_handlers::{get_object, head_object, upload_object},
        video_handlers::{fetch_videos, list_categories, save_video_metadata},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build the router for every pipeline endpoint.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/generatePreSignedURL",
            get(generate_presigned_url).post(generate_presigned_url_json),
        )
        .route(
            "/objects/{*key}",
            put(upload_object).get(get_object).head(head_object),
        )
        .route("/saveVideoMetadata", post(save_video_metadata))
        .route("/fetchVideos", get(fetch_videos))
        .route("/categories", get(list_categories))
        .layer(TraceLayer::new_for_http())
}
