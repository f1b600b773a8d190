//! Core data models for the upload pipeline.
//!
//! Records map to SQLite tables via `sqlx::FromRow` and serialize as the
//! camelCase JSON the mobile client speaks.

pub mod grant;
pub mod object;
pub mod video;
