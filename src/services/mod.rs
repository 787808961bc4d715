//! Core services behind the HTTP surface.

pub mod archive_service;
pub mod cluster_service;
pub mod mime;
pub mod namespace;
pub mod trash;

use archive_service::ArchiveService;
use cluster_service::ClusterService;

/// Shared router state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub archive: ArchiveService,
    pub cluster: ClusterService,
}
