//! Cluster status polled from the Garage admin API.
//!
//! The dashboard polls this on a timer, so an unreachable admin API is not an
//! error: it is reported as the offline cluster shape and the next poll gets
//! another chance.

use crate::models::cluster::{ClusterHealth, ClusterStatus, NodeStatus};
use serde::Deserialize;
use tracing::warn;

/// Garage admin `/status` payload, reduced to what the dashboard needs.
#[derive(Debug, Deserialize)]
struct AdminStatus {
    #[serde(default, rename = "knownNodes")]
    known_nodes: Vec<AdminNode>,
}

#[derive(Debug, Deserialize)]
struct AdminNode {
    id: String,
    hostname: Option<String>,
    #[serde(default, rename = "isUp")]
    is_up: bool,
    /// Seconds since the Unix epoch.
    #[serde(rename = "lastSeen")]
    last_seen: Option<i64>,
}

#[derive(Clone)]
pub struct ClusterService {
    http: reqwest::Client,
    admin_url: String,
    admin_token: String,
}

impl ClusterService {
    pub fn new(admin_url: impl Into<String>, admin_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            admin_url: admin_url.into(),
            admin_token: admin_token.into(),
        }
    }

    /// Current cluster status. Never fails: admin API trouble degrades to
    /// the offline shape.
    pub async fn cluster_status(&self) -> ClusterStatus {
        match self.fetch_status().await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "failed to fetch cluster status from admin API");
                ClusterStatus::offline()
            }
        }
    }

    async fn fetch_status(&self) -> anyhow::Result<ClusterStatus> {
        let payload: AdminStatus = self
            .http
            .get(format!("{}/status", self.admin_url))
            .bearer_auth(&self.admin_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let nodes: Vec<NodeStatus> = payload
            .known_nodes
            .into_iter()
            .map(|node| NodeStatus {
                id: node.id,
                hostname: node.hostname.unwrap_or_else(|| "Unknown".into()),
                is_up: node.is_up,
                last_seen: node.last_seen.map(|secs| secs * 1000).unwrap_or(0),
            })
            .collect();

        let active = nodes.iter().filter(|n| n.is_up).count();
        let status = if active == 0 {
            ClusterHealth::Offline
        } else if active < nodes.len() {
            ClusterHealth::Degraded
        } else {
            ClusterHealth::Healthy
        };

        Ok(ClusterStatus {
            status,
            node_count: nodes.len(),
            // TODO: aggregate per-node capacity from the admin layout endpoint.
            total_storage: "Unknown".into(),
            used_storage: "Unknown".into(),
            nodes,
        })
    }
}
