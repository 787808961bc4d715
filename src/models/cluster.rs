//! Cluster health as presented to the dashboard.

use serde::{Deserialize, Serialize};

/// Overall cluster classification derived from node reachability.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClusterHealth {
    /// Every known node is up.
    Healthy,
    /// At least one node is up, but not all of them.
    Degraded,
    /// No node is reachable, or the admin API itself is unreachable.
    Offline,
}

/// One storage node as reported by the cluster admin API.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NodeStatus {
    pub id: String,
    pub hostname: String,
    pub is_up: bool,
    /// Milliseconds since the Unix epoch; 0 when the node was never seen.
    pub last_seen: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClusterStatus {
    pub status: ClusterHealth,
    pub node_count: usize,
    pub total_storage: String,
    pub used_storage: String,
    pub nodes: Vec<NodeStatus>,
}

impl ClusterStatus {
    /// The shape returned when the admin API cannot be reached at all.
    pub fn offline() -> Self {
        Self {
            status: ClusterHealth::Offline,
            node_count: 0,
            total_storage: "N/A".into(),
            used_storage: "N/A".into(),
            nodes: Vec::new(),
        }
    }
}
