//! Health, readiness, and cluster status handlers.
//!
//! - GET /healthz     -> simple liveness ("ok")
//! - GET /readyz      -> readiness that checks store reachability
//! - GET /api/status  -> cluster health proxied from the admin API

use crate::models::cluster::ClusterStatus;
use crate::services::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness probe: always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that runs a lightweight listing against the archive
/// bucket. Returns JSON describing each check: HTTP 200 when all checks
/// pass, HTTP 503 when any check fails. The admin API is not probed here;
/// an unreachable admin API degrades the status endpoint, it does not make
/// the file API unready.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let store_check = match state.archive.probe().await {
        Ok(()) => (true, None::<String>),
        Err(err) => (false, Some(err.to_string())),
    };

    let overall_ok = store_check.0;
    let mut checks = HashMap::new();
    checks.insert(
        "store",
        CheckStatus {
            ok: store_check.0,
            error: store_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// `GET /api/status`: cluster health for the dashboard poller. Always 200;
/// an unreachable cluster is reported as offline, not as an error.
pub async fn cluster_status(State(state): State<AppState>) -> Json<ClusterStatus> {
    Json(state.cluster.cluster_status().await)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
