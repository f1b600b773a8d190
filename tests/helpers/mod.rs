//! Shared setup for integration tests: a fresh SQLite file and object root
//! per test, and optionally a real listener.

#![allow(dead_code)]

use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tempfile::TempDir;
use tokio::net::TcpListener;
use video_store::{config::AppConfig, db, state::AppState};

pub const SECRET: &str = "integration-secret";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: AppConfig,
    _dir: TempDir,
}

pub fn config_for(dir: &TempDir, public_base_url: &str) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        storage_dir: dir.path().join("objects").display().to_string(),
        database_url: format!("sqlite://{}", dir.path().join("meta/video_store.db").display()),
        public_base_url: public_base_url.into(),
        signing_secret: SECRET.into(),
        grant_ttl_secs: 3600,
        categories: vec!["category1".into(), "category2".into(), "category3".into()],
    }
}

async fn build(dir: TempDir, public_base_url: &str) -> TestApp {
    let config = config_for(&dir, public_base_url);
    std::fs::create_dir_all(&config.storage_dir).unwrap();
    let pool = db::connect(&config.database_url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let state = AppState::new(Arc::new(pool), &config);
    TestApp {
        app: video_store::app(state.clone()),
        state,
        config,
        _dir: dir,
    }
}

/// An in-process router for `oneshot` requests.
pub async fn setup_test_app() -> TestApp {
    build(tempfile::tempdir().unwrap(), "http://localhost:3000").await
}

/// A router served on an ephemeral port whose public URL points back at it.
pub async fn spawn_server() -> (TestApp, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let test_app = build(tempfile::tempdir().unwrap(), &format!("http://{}", addr)).await;
    let app = test_app.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (test_app, addr)
}
