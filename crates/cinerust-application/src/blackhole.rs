// SPDX-License-Identifier: GPL-3.0-or-later
use async_trait::async_trait;
use cinerust_domain::{clean_file_name, DownloadProtocol, ReleaseCandidate};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::download::{
    DownloadClient, DownloadClientError, DownloadClientItem, DownloadClientStatus,
    DownloadItemStatus, ValidationFailure,
};

/// Extensions download tools commonly give files that are still being
/// written into the watch folder.
const IN_PROGRESS_EXTENSIONS: &[&str] = &["part", "tmp", "!qb"];

const LOCK_SUFFIX: &str = ".lock";

/// Folder-based client: the release payload is fetched into a drop
/// folder for an external tool to pick up, and a `.strm` tracking file
/// pointing at the payload is written into the watch folder so the
/// submission is visible to `get_items` under the returned id. The
/// backend offers no control surface beyond the filesystem, so
/// everything is derived from observable file state and removal is not
/// supported.
pub struct BlackholeClient {
    name: String,
    http: reqwest::Client,
    drop_folder: PathBuf,
    watch_folder: PathBuf,
}

impl BlackholeClient {
    pub fn new(
        name: String,
        http: reqwest::Client,
        drop_folder: PathBuf,
        watch_folder: PathBuf,
    ) -> Self {
        Self {
            name,
            http,
            drop_folder,
            watch_folder,
        }
    }

    fn download_id_for(&self, file_name: &str) -> String {
        format!("{}_{}", self.name, file_name)
    }
}

fn is_in_progress(path: &Path) -> bool {
    let lock_marker = PathBuf::from(format!("{}{}", path.display(), LOCK_SUFFIX));
    if lock_marker.exists() {
        return true;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => IN_PROGRESS_EXTENSIONS
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate)),
        None => false,
    }
}

#[async_trait]
impl DownloadClient for BlackholeClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn protocol(&self) -> DownloadProtocol {
        DownloadProtocol::Usenet
    }

    async fn download(&self, candidate: &ReleaseCandidate) -> Result<String, DownloadClientError> {
        if self.drop_folder.as_os_str().is_empty() {
            return Err(DownloadClientError::NotConfigured {
                client: self.name.clone(),
                reason: "drop folder must be set".into(),
            });
        }
        if self.watch_folder.as_os_str().is_empty() {
            return Err(DownloadClientError::NotConfigured {
                client: self.name.clone(),
                reason: "watch folder must be set".into(),
            });
        }

        let title = clean_file_name(&candidate.release.title);
        let file_name = format!("{}.nzb", title);
        let target = self.drop_folder.join(&file_name);

        debug!(
            target: "download",
            client = %self.name,
            url = %candidate.release.download_url,
            file = %target.display(),
            "fetching release payload"
        );

        let response = self
            .http
            .get(&candidate.release.download_url)
            .send()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| DownloadClientError::Request(e.to_string()))?;
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        tokio::fs::create_dir_all(&self.drop_folder).await?;
        tokio::fs::write(&target, &bytes).await?;

        // The tracking file is what get_items enumerates, so the id
        // handed back here stays re-queryable across polls.
        let tracking_name = format!("{}.strm", title);
        let tracking = self.watch_folder.join(&tracking_name);
        tokio::fs::create_dir_all(&self.watch_folder).await?;
        tokio::fs::write(&tracking, target.display().to_string()).await?;

        info!(
            target: "download",
            client = %self.name,
            file = %target.display(),
            tracking = %tracking.display(),
            "release payload saved to drop folder"
        );

        Ok(self.download_id_for(&tracking_name))
    }

    async fn get_items(&self) -> Result<Vec<DownloadClientItem>, DownloadClientError> {
        let mut items = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.watch_folder).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name.ends_with(LOCK_SUFFIX) {
                continue;
            }

            let status = if is_in_progress(&path) {
                DownloadItemStatus::Downloading
            } else {
                DownloadItemStatus::Completed
            };

            items.push(DownloadClientItem {
                download_id: self.download_id_for(file_name),
                title: clean_file_name(file_name),
                total_size: Some(metadata.len()),
                output_path: Some(path),
                status,
                can_be_removed: false,
            });
        }

        Ok(items)
    }

    async fn remove_item(
        &self,
        _download_id: &str,
        _delete_data: bool,
    ) -> Result<(), DownloadClientError> {
        Err(DownloadClientError::NotSupported {
            client: self.name.clone(),
            operation: "remove",
        })
    }

    async fn get_status(&self) -> Result<DownloadClientStatus, DownloadClientError> {
        Ok(DownloadClientStatus {
            is_localhost: true,
            output_root: Some(self.watch_folder.clone()),
        })
    }

    async fn test(&self) -> Result<Vec<ValidationFailure>, DownloadClientError> {
        let mut failures = Vec::new();
        for (field, folder) in [
            ("drop_folder", &self.drop_folder),
            ("watch_folder", &self.watch_folder),
        ] {
            if !folder.is_dir() {
                failures.push(ValidationFailure {
                    field,
                    message: format!("folder does not exist: {}", folder.display()),
                });
            }
        }
        Ok(failures)
    }
}
