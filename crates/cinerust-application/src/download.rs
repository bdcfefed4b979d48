// SPDX-License-Identifier: GPL-3.0-or-later
use async_trait::async_trait;
use cinerust_config::{DownloadClientDefinition, DownloadClientImplementation};
use cinerust_domain::{DownloadProtocol, ReleaseCandidate};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::blackhole::BlackholeClient;
use crate::qbittorrent::QbittorrentClient;

/// Progress state of one tracked download. `Warning` marks a recoverable
/// issue (e.g. a stalled transfer) orthogonal to normal progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadItemStatus {
    Queued,
    Downloading,
    Completed,
    Failed,
    Warning,
}

/// Snapshot of one item known to a backend, re-derived from observable
/// backend state on every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadClientItem {
    pub download_id: String,
    pub title: String,
    pub total_size: Option<u64>,
    pub output_path: Option<PathBuf>,
    pub status: DownloadItemStatus,
    pub can_be_removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadClientStatus {
    /// Whether the backend runs on the same host; downstream path mapping
    /// depends on it.
    pub is_localhost: bool,
    pub output_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum DownloadClientError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("authentication failed")]
    Authentication,
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("download client responded with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("deserialization failed: {0}")]
    Deserialization(String),
    #[error("{client} is not configured: {reason}")]
    NotConfigured { client: String, reason: String },
    #[error("{client} does not support {operation}")]
    NotSupported {
        client: String,
        operation: &'static str,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uniform contract over heterogeneous download backends. Status is
/// always polled, never pushed: `get_items` re-derives item state from
/// whatever control surface the backend exposes.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    fn name(&self) -> &str;

    fn protocol(&self) -> DownloadProtocol;

    /// Capability query; `remove_item` on a client returning false fails
    /// with `NotSupported` rather than a generic fault.
    fn supports_remove(&self) -> bool {
        false
    }

    /// Submits a release and returns the client-assigned identifier used
    /// to re-query status later.
    async fn download(&self, candidate: &ReleaseCandidate) -> Result<String, DownloadClientError>;

    /// Enumerates items currently known to the backend. Recomputed on
    /// every call; nothing is cached across calls.
    async fn get_items(&self) -> Result<Vec<DownloadClientItem>, DownloadClientError>;

    async fn remove_item(
        &self,
        download_id: &str,
        delete_data: bool,
    ) -> Result<(), DownloadClientError>;

    async fn get_status(&self) -> Result<DownloadClientStatus, DownloadClientError>;

    /// Side-effect-free configuration self-check.
    async fn test(&self) -> Result<Vec<ValidationFailure>, DownloadClientError>;
}

/// Builds the concrete client for a configured definition.
pub fn build_client(
    definition: &DownloadClientDefinition,
    http: reqwest::Client,
) -> Arc<dyn DownloadClient> {
    match &definition.implementation {
        DownloadClientImplementation::Blackhole {
            drop_folder,
            watch_folder,
        } => Arc::new(BlackholeClient::new(
            definition.name.clone(),
            http,
            PathBuf::from(drop_folder),
            PathBuf::from(watch_folder),
        )),
        DownloadClientImplementation::Qbittorrent {
            base_url,
            username,
            password,
            category,
        } => Arc::new(QbittorrentClient::new(
            definition.name.clone(),
            base_url.clone(),
            username.clone(),
            password.clone(),
            category.clone(),
        )),
    }
}

/// Builds clients for every enabled definition, in configured order.
pub fn build_clients(
    definitions: &[DownloadClientDefinition],
    http: &reqwest::Client,
) -> Vec<Arc<dyn DownloadClient>> {
    definitions
        .iter()
        .filter(|def| def.enabled)
        .map(|def| build_client(def, http.clone()))
        .collect()
}

/// First client matching the release protocol, in configured order.
pub fn select_client(
    clients: &[Arc<dyn DownloadClient>],
    protocol: DownloadProtocol,
) -> Option<Arc<dyn DownloadClient>> {
    clients
        .iter()
        .find(|client| client.protocol() == protocol)
        .cloned()
}
