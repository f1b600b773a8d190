//! Two-phase video upload pipeline.
//!
//! The server side mints upload grants, stores binaries behind pre-signed
//! URLs and keeps the video metadata; [`client`] drives an upload through
//! grant, transfer and commit.

pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

use axum::Router;

/// The full HTTP application over an already-built state.
pub fn app(state: state::AppState) -> Router {
    routes::routes::routes().with_state(state)
}
