use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod store;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        endpoint = %cfg.s3_endpoint,
        archive = %cfg.archive_bucket,
        trash = %cfg.trash_bucket,
        admin = %cfg.admin_url,
        "Starting archive-dashboard"
    );

    // --- Initialize store client + core services ---
    let store = Arc::new(store::s3::S3Store::new(
        &cfg.s3_endpoint,
        &cfg.s3_region,
        &cfg.s3_access_key,
        &cfg.s3_secret_key,
    )?);
    let archive = services::archive_service::ArchiveService::new(
        store,
        cfg.archive_bucket.clone(),
        cfg.trash_bucket.clone(),
    );
    let cluster =
        services::cluster_service::ClusterService::new(cfg.admin_url.clone(), cfg.admin_token.clone());
    let state = services::AppState { archive, cluster };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
