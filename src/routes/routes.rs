//! Defines routes for the dashboard API.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /healthz` — liveness
//!   - `GET    /readyz` — readiness (store reachability)
//!
//! - **Cluster**
//!   - `GET    /api/status` — node health proxied from the admin API
//!
//! - **File explorer**
//!   - `GET    /api/files` — list a directory (supports ?path=)
//!   - `DELETE /api/files` — batch soft delete (JSON body)
//!   - `GET    /api/files/{*path}` — download object
//!   - `PUT    /api/files/{*path}` — upload/overwrite object
//!   - `PATCH  /api/files/{*path}` — replace text content
//!   - `DELETE /api/files/{*path}` — soft delete (move to trash)
//!   - `POST   /api/restore/{*path}` — restore a trashed object
//!
//! The wildcard `*path` allows nested keys like `photos/2025/img.jpg`.

use crate::{
    handlers::{
        file_handlers::{
            delete_file, delete_files, get_file, list_files, patch_file, restore_file,
            upload_file,
        },
        status_handlers::{cluster_status, healthz, readyz},
    },
    services::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for the whole dashboard API.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // cluster status
        .route("/api/status", get(cluster_status))
        // file explorer
        .route("/api/files", get(list_files).delete(delete_files))
        .route(
            "/api/files/{*path}",
            get(get_file)
                .put(upload_file)
                .patch(patch_file)
                .delete(delete_file),
        )
        .route("/api/restore/{*path}", post(restore_file))
}
