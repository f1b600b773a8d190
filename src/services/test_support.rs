//! Helpers shared by service unit tests.

use crate::db;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A file-backed SQLite pool inside a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the pool is used.
pub async fn temp_pool() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("meta/video_store.db").display());
    let pool = db::connect(&url).await.unwrap();
    (pool, dir)
}
