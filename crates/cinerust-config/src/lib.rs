// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cinerust.db".to_string(),
            pool_max_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Backend selection and settings for one configured download client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadClientDefinition {
    pub name: String,
    pub enabled: bool,
    #[serde(flatten)]
    pub implementation: DownloadClientImplementation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "implementation", rename_all = "lowercase")]
pub enum DownloadClientImplementation {
    Blackhole {
        /// Folder the fetched release payload is dropped into.
        drop_folder: String,
        /// Folder watched for completed/in-progress files.
        watch_folder: String,
    },
    Qbittorrent {
        base_url: String,
        username: Option<String>,
        password: Option<String>,
        category: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// When enabled, stale grabs are expected to self-resolve via the
    /// completed-download import path instead of being re-grabbed.
    pub completed_download_handling: bool,
    /// Bounded timeout for a single download-client poll.
    pub poll_timeout_secs: u64,
    pub clients: Vec<DownloadClientDefinition>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            completed_download_handling: true,
            poll_timeout_secs: 30,
            clients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between queue refresh passes.
    pub queue_refresh_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_refresh_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telemetry: TelemetryConfig,
    pub download: DownloadConfig,
    pub sync: SyncConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: CINERUST_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("CINERUST_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
