use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub archive_bucket: String,
    pub trash_bucket: String,
    pub admin_url: String,
    pub admin_token: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Dashboard API for a Garage-backed archive")]
pub struct Args {
    /// Host to bind to (overrides DASHBOARD_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DASHBOARD_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// S3 data API endpoint (overrides S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Live bucket for archive objects (overrides ARCHIVE_BUCKET)
    #[arg(long)]
    pub archive_bucket: Option<String>,

    /// Trash bucket for soft-deleted objects (overrides TRASH_BUCKET)
    #[arg(long)]
    pub trash_bucket: Option<String>,

    /// Garage admin API URL (overrides GARAGE_ADMIN_URL)
    #[arg(long)]
    pub admin_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    /// Credentials come from the environment only.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("DASHBOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("DASHBOARD_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing DASHBOARD_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading DASHBOARD_PORT"),
        };
        let env_endpoint =
            env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:3900".into());
        // Garage ignores the region but the protocol requires one.
        let s3_region = env::var("S3_REGION").unwrap_or_else(|_| "garage".into());
        let s3_access_key = env::var("S3_ACCESS_KEY_ID").unwrap_or_default();
        let s3_secret_key = env::var("S3_SECRET_ACCESS_KEY").unwrap_or_default();
        let env_archive = env::var("ARCHIVE_BUCKET").unwrap_or_else(|_| "archive".into());
        let env_trash = env::var("TRASH_BUCKET").unwrap_or_else(|_| "archive-trash".into());
        let env_admin_url =
            env::var("GARAGE_ADMIN_URL").unwrap_or_else(|_| "http://127.0.0.1:3903".into());
        let admin_token = env::var("GARAGE_ADMIN_TOKEN").unwrap_or_default();

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            s3_endpoint: args.s3_endpoint.unwrap_or(env_endpoint),
            s3_region,
            s3_access_key,
            s3_secret_key,
            archive_bucket: args.archive_bucket.unwrap_or(env_archive),
            trash_bucket: args.trash_bucket.unwrap_or(env_trash),
            admin_url: args.admin_url.unwrap_or(env_admin_url),
            admin_token,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
