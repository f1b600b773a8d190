//! Liveness and readiness probes.
//!
//! - GET /healthz: process is up, no I/O
//! - GET /readyz: metadata database answers and the object root is writable

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    checks: BTreeMap<&'static str, Probe>,
}

#[derive(Serialize)]
struct Probe {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Probe {
    fn passed() -> Self {
        Self { ok: true, error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

pub async fn healthz() -> impl IntoResponse {
    Json(Health {
        status: "ok",
        checks: BTreeMap::new(),
    })
}

/// 200 when every probe passes, 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("metadata", probe_database(&state).await);
    checks.insert("objects", probe_object_root(&state.objects.base_path).await);

    let ready = checks.values().all(|p| p.ok);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = Health {
        status: if ready { "ok" } else { "error" },
        checks,
    };
    (status, Json(body))
}

async fn probe_database(state: &AppState) -> Probe {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM videos")
        .fetch_one(&*state.metadata.db)
        .await
    {
        Ok(_) => Probe::passed(),
        Err(e) => Probe::failed(e.to_string()),
    }
}

/// Round-trip a small file through the object root.
async fn probe_object_root(root: &Path) -> Probe {
    let path = root.join(format!(".readyz-{}", Uuid::new_v4()));
    if let Err(e) = fs::write(&path, b"readyz").await {
        return Probe::failed(format!("write: {}", e));
    }
    let read = fs::read(&path).await;
    let _ = fs::remove_file(&path).await;
    match read {
        Ok(bytes) if bytes == b"readyz" => Probe::passed(),
        Ok(_) => Probe::failed("probe file content mismatch"),
        Err(e) => Probe::failed(format!("read: {}", e)),
    }
}
