// SPDX-License-Identifier: GPL-3.0-or-later
use cinerust_config::AppConfig;
pub mod blackhole;
pub mod decision;
pub mod download;
pub mod grab;
pub mod qbittorrent;
pub mod queue;
pub mod specifications;
pub mod tracking;
pub mod upgrade;

pub use decision::{
    Decision, DecisionPipeline, DecisionSpecification, Rejection, RejectionKind, SearchContext,
    SpecificationError,
};
pub use download::{
    build_client, build_clients, select_client, DownloadClient, DownloadClientError,
    DownloadClientItem, DownloadClientStatus, DownloadItemStatus, ValidationFailure,
};
pub use grab::{GrabError, GrabOutcome, GrabService};
pub use queue::DownloadMonitor;
pub use specifications::{
    HistorySpecification, MonitoredSpecification, QualityAllowedSpecification,
    GRAB_COOLDOWN_HOURS,
};
pub use tracking::FailedDownloadHandler;
pub use upgrade::{cutoff_not_met, is_upgradable};

use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn on_start(&self) {
        info!(target: "application", "application state initialized");
    }
}
