// SPDX-License-Identifier: GPL-3.0-or-later
use async_trait::async_trait;
use cinerust_domain::{clean_file_name, DownloadProtocol, ReleaseCandidate};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use crate::download::{
    DownloadClient, DownloadClientError, DownloadClientItem, DownloadClientStatus,
    DownloadItemStatus, ValidationFailure,
};

/// qBittorrent WebUI API v2 backend. State is always re-derived from
/// `torrents/info`; the WebUI pushes nothing.
pub struct QbittorrentClient {
    name: String,
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    category: Option<String>,
}

impl QbittorrentClient {
    pub fn new(
        name: String,
        base_url: String,
        username: Option<String>,
        password: Option<String>,
        category: Option<String>,
    ) -> Self {
        Self {
            name,
            // The WebUI issues a session cookie on login.
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("http client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            category,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, DownloadClientError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| DownloadClientError::InvalidBaseUrl(err.to_string()))
    }

    async fn authenticate_if_configured(&self) -> Result<(), DownloadClientError> {
        let Some(username) = self.username.as_deref() else {
            return Ok(());
        };
        let Some(password) = self.password.as_deref() else {
            return Ok(());
        };

        let url = self.endpoint("/api/v2/auth/login")?;
        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim() != "Ok." {
            return Err(DownloadClientError::Authentication);
        }

        Ok(())
    }

    async fn post_form(
        &self,
        path: &str,
        form: &HashMap<&str, String>,
    ) -> Result<(), DownloadClientError> {
        self.authenticate_if_configured().await?;
        let url = self.endpoint(path)?;

        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Info-hash from a magnet link, the identifier qBittorrent itself keys
/// items by. Falls back to the cleaned release title for non-magnet urls.
fn derive_download_id(download_url: &str, title: &str) -> String {
    lazy_static! {
        static ref BTIH_REGEX: Regex =
            Regex::new(r"(?i)xt=urn:btih:(?P<hash>[0-9a-f]{40}|[a-z2-7]{32})")
                .expect("valid btih regex");
    }

    BTIH_REGEX
        .captures(download_url)
        .and_then(|captures| captures.name("hash"))
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_else(|| clean_file_name(title))
}

fn map_torrent_state(state: &str) -> DownloadItemStatus {
    let state = state.to_lowercase();
    if state.contains("error") || state.contains("missingfiles") {
        DownloadItemStatus::Failed
    } else if state.contains("uploading")
        || state.contains("pausedup")
        || state.contains("stoppedup")
        || state.contains("queuedup")
        || state.contains("stalledup")
        || state == "completed"
    {
        DownloadItemStatus::Completed
    } else if state.contains("stalled") {
        // Transfer has no peers right now; recoverable.
        DownloadItemStatus::Warning
    } else if state.contains("downloading") || state.contains("meta") {
        DownloadItemStatus::Downloading
    } else {
        DownloadItemStatus::Queued
    }
}

#[async_trait]
impl DownloadClient for QbittorrentClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn protocol(&self) -> DownloadProtocol {
        DownloadProtocol::Torrent
    }

    fn supports_remove(&self) -> bool {
        true
    }

    async fn download(&self, candidate: &ReleaseCandidate) -> Result<String, DownloadClientError> {
        let mut form = HashMap::new();
        form.insert("urls", candidate.release.download_url.clone());
        if let Some(category) = &self.category {
            form.insert("category", category.clone());
        }

        debug!(
            target: "download",
            client = %self.name,
            title = %candidate.release.title,
            "submitting release to qBittorrent"
        );
        self.post_form("/api/v2/torrents/add", &form).await?;

        Ok(derive_download_id(
            &candidate.release.download_url,
            &candidate.release.title,
        ))
    }

    async fn get_items(&self) -> Result<Vec<DownloadClientItem>, DownloadClientError> {
        self.authenticate_if_configured().await?;
        let mut url = self.endpoint("/api/v2/torrents/info")?;
        if let Some(category) = &self.category {
            url.query_pairs_mut().append_pair("category", category);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let torrents: Vec<QbittorrentTorrent> = serde_json::from_str(&body)
            .map_err(|e| DownloadClientError::Deserialization(e.to_string()))?;

        Ok(torrents
            .into_iter()
            .map(|torrent| {
                let output_path = torrent
                    .content_path
                    .or(torrent.save_path)
                    .map(PathBuf::from);
                DownloadClientItem {
                    download_id: torrent.hash.to_uppercase(),
                    title: torrent.name,
                    total_size: u64::try_from(torrent.size).ok(),
                    output_path,
                    status: map_torrent_state(&torrent.state),
                    can_be_removed: true,
                }
            })
            .collect())
    }

    async fn remove_item(
        &self,
        download_id: &str,
        delete_data: bool,
    ) -> Result<(), DownloadClientError> {
        let mut form = HashMap::new();
        form.insert("hashes", download_id.to_lowercase());
        form.insert("deleteFiles", delete_data.to_string());

        self.post_form("/api/v2/torrents/delete", &form).await
    }

    async fn get_status(&self) -> Result<DownloadClientStatus, DownloadClientError> {
        let url = self.endpoint("/")?;
        let is_localhost = matches!(
            url.host_str(),
            Some("localhost") | Some("127.0.0.1") | Some("::1") | Some("[::1]")
        );

        Ok(DownloadClientStatus {
            is_localhost,
            output_root: None,
        })
    }

    async fn test(&self) -> Result<Vec<ValidationFailure>, DownloadClientError> {
        if let Err(err) = self.authenticate_if_configured().await {
            return Ok(vec![ValidationFailure {
                field: "username",
                message: err.to_string(),
            }]);
        }

        let url = self.endpoint("/api/v2/app/version")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(vec![ValidationFailure {
                field: "base_url",
                message: format!(
                    "qBittorrent responded with status {}",
                    response.status().as_u16()
                ),
            }]);
        }

        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct QbittorrentTorrent {
    hash: String,
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    save_path: Option<String>,
    #[serde(default)]
    content_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinerust_domain::{Movie, Quality, QualityProfile, QualitySource, Release};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String) -> QbittorrentClient {
        QbittorrentClient::new(
            "qBittorrent".into(),
            base_url,
            None,
            None,
            Some("movies".into()),
        )
    }

    fn candidate(download_url: &str) -> ReleaseCandidate {
        ReleaseCandidate {
            movie: Movie::new("Test Movie"),
            profile: QualityProfile::new(
                "HD",
                vec![QualitySource::Webdl1080p],
                QualitySource::Webdl1080p,
            ),
            release: Release {
                title: "Test.Movie.2024.1080p.WEB-DL".into(),
                download_url: download_url.into(),
                quality: Quality::new(QualitySource::Webdl1080p),
                size_bytes: Some(4_000_000_000),
                protocol: DownloadProtocol::Torrent,
                indexer: None,
                published_at: None,
            },
        }
    }

    #[test]
    fn derive_download_id_prefers_magnet_info_hash() {
        let magnet = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=x";
        assert_eq!(
            derive_download_id(magnet, "ignored"),
            "0123456789ABCDEF0123456789ABCDEF01234567"
        );

        assert_eq!(
            derive_download_id("http://tracker.invalid/file.torrent", "My: Title"),
            "My Title"
        );
    }

    #[test]
    fn torrent_state_mapping_covers_lifecycle() {
        assert_eq!(map_torrent_state("queuedDL"), DownloadItemStatus::Queued);
        assert_eq!(
            map_torrent_state("downloading"),
            DownloadItemStatus::Downloading
        );
        assert_eq!(
            map_torrent_state("metaDL"),
            DownloadItemStatus::Downloading
        );
        assert_eq!(
            map_torrent_state("stalledDL"),
            DownloadItemStatus::Warning
        );
        assert_eq!(
            map_torrent_state("stalledUP"),
            DownloadItemStatus::Completed
        );
        assert_eq!(map_torrent_state("pausedUP"), DownloadItemStatus::Completed);
        assert_eq!(map_torrent_state("uploading"), DownloadItemStatus::Completed);
        assert_eq!(map_torrent_state("error"), DownloadItemStatus::Failed);
        assert_eq!(
            map_torrent_state("missingFiles"),
            DownloadItemStatus::Failed
        );
    }

    #[tokio::test]
    async fn download_submits_release_and_returns_info_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/torrents/add"))
            .and(body_string_contains("category=movies"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let magnet = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567";
        let id = client
            .download(&candidate(magnet))
            .await
            .expect("download succeeds");

        assert_eq!(id, "0123456789ABCDEF0123456789ABCDEF01234567");
    }

    #[tokio::test]
    async fn get_items_maps_states_and_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/torrents/info"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[
                    {
                        "hash": "abc123",
                        "name": "Movie 2024 1080p",
                        "size": 4000000000,
                        "state": "downloading",
                        "content_path": "/downloads/Movie 2024 1080p"
                    },
                    {
                        "hash": "def456",
                        "name": "Other Movie",
                        "size": 2000000000,
                        "state": "stalledDL"
                    }
                ]"#,
            ))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let items = client.get_items().await.expect("items parse");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].download_id, "ABC123");
        assert_eq!(items[0].status, DownloadItemStatus::Downloading);
        assert_eq!(items[0].total_size, Some(4_000_000_000));
        assert_eq!(
            items[0].output_path.as_deref(),
            Some(std::path::Path::new("/downloads/Movie 2024 1080p"))
        );
        assert_eq!(items[1].status, DownloadItemStatus::Warning);
        assert!(items.iter().all(|item| item.can_be_removed));
    }

    #[tokio::test]
    async fn remove_item_posts_delete_with_data_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/torrents/delete"))
            .and(body_string_contains("hashes=abc123"))
            .and(body_string_contains("deleteFiles=true"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client(server.uri());
        assert!(client.supports_remove());
        client
            .remove_item("ABC123", true)
            .await
            .expect("remove succeeds");
    }

    #[tokio::test]
    async fn test_passes_against_healthy_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/app/version"))
            .respond_with(ResponseTemplate::new(200).set_body_string("4.6.7"))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let failures = client.test().await.expect("test runs");
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn test_reports_unreachable_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/app/version"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client(server.uri());
        let failures = client.test().await.expect("test runs");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, "base_url");
    }

    #[tokio::test]
    async fn get_status_detects_localhost() {
        let local = client("http://localhost:8080".into());
        assert!(local.get_status().await.unwrap().is_localhost);

        let remote = client("http://seedbox.example.com:8080".into());
        assert!(!remote.get_status().await.unwrap().is_localhost);
    }
}
