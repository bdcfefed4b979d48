// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use cinerust_domain::{HistoryEventType, HistoryRecord};
use cinerust_infrastructure::repositories::HistoryRepository;
use std::sync::Arc;
use tracing::{info, warn};

use crate::download::{DownloadClientItem, DownloadItemStatus};

/// Turns failed queue items into DownloadFailed history events so the
/// decision pipeline stops treating the dead grab as satisfied. A
/// failure is recorded once per download id; items without a matching
/// grab event are skipped (they were not submitted by us).
pub struct FailedDownloadHandler {
    history: Arc<dyn HistoryRepository>,
}

impl FailedDownloadHandler {
    pub fn new(history: Arc<dyn HistoryRepository>) -> Self {
        Self { history }
    }

    /// Returns the number of newly recorded failures.
    pub async fn handle(&self, items: &[DownloadClientItem]) -> Result<usize> {
        let mut recorded = 0;
        for item in items {
            if item.status != DownloadItemStatus::Failed {
                continue;
            }

            let Some(latest) = self
                .history
                .most_recent_for_download_id(&item.download_id)
                .await?
            else {
                warn!(
                    target: "download",
                    download_id = %item.download_id,
                    title = %item.title,
                    "failed item has no history, ignoring"
                );
                continue;
            };

            if latest.event_type != HistoryEventType::Grabbed {
                continue;
            }

            let mut failure = HistoryRecord::new(
                latest.movie_id,
                HistoryEventType::DownloadFailed,
                latest.quality,
                latest.source_title.clone(),
            );
            failure.download_id = Some(item.download_id.clone());
            self.history.record(failure).await?;
            recorded += 1;

            info!(
                target: "download",
                movie_id = %latest.movie_id,
                download_id = %item.download_id,
                "download failure recorded"
            );
        }
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cinerust_domain::{MovieId, Quality, QualitySource};
    use std::sync::Mutex;

    struct InMemoryHistory {
        records: Mutex<Vec<HistoryRecord>>,
    }

    impl InMemoryHistory {
        fn new(records: Vec<HistoryRecord>) -> Self {
            Self {
                records: Mutex::new(records),
            }
        }

        fn all(&self) -> Vec<HistoryRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HistoryRepository for InMemoryHistory {
        async fn most_recent_for_movie(
            &self,
            movie_id: MovieId,
        ) -> Result<Option<HistoryRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| r.movie_id == movie_id)
                .max_by_key(|r| r.date)
                .cloned())
        }

        async fn most_recent_for_download_id(
            &self,
            download_id: &str,
        ) -> Result<Option<HistoryRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| r.download_id.as_deref() == Some(download_id))
                .max_by_key(|r| r.date)
                .cloned())
        }

        async fn list_for_movie(
            &self,
            movie_id: MovieId,
            _limit: i64,
            _offset: i64,
        ) -> Result<Vec<HistoryRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| r.movie_id == movie_id)
                .cloned()
                .collect())
        }

        async fn record(&self, record: HistoryRecord) -> Result<HistoryRecord> {
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }
    }

    fn grab(download_id: &str) -> HistoryRecord {
        let mut record = HistoryRecord::new(
            MovieId::new(),
            HistoryEventType::Grabbed,
            Quality::new(QualitySource::Webdl1080p),
            "Movie.2024.1080p.WEB-DL",
        );
        record.download_id = Some(download_id.into());
        record
    }

    fn item(download_id: &str, status: DownloadItemStatus) -> DownloadClientItem {
        DownloadClientItem {
            download_id: download_id.into(),
            title: "Movie.2024.1080p.WEB-DL".into(),
            total_size: Some(100),
            output_path: None,
            status,
            can_be_removed: true,
        }
    }

    #[tokio::test]
    async fn failed_item_with_grab_history_is_recorded() {
        let grab = grab("ABC123");
        let movie_id = grab.movie_id;
        let history = Arc::new(InMemoryHistory::new(vec![grab]));
        let handler = FailedDownloadHandler::new(history.clone());

        let recorded = handler
            .handle(&[item("ABC123", DownloadItemStatus::Failed)])
            .await
            .unwrap();
        assert_eq!(recorded, 1);

        let records = history.all();
        assert_eq!(records.len(), 2);
        let failure = records
            .iter()
            .find(|r| r.event_type == HistoryEventType::DownloadFailed)
            .expect("failure recorded");
        assert_eq!(failure.movie_id, movie_id);
        assert_eq!(failure.download_id.as_deref(), Some("ABC123"));
    }

    #[tokio::test]
    async fn failure_is_recorded_once_across_polls() {
        let history = Arc::new(InMemoryHistory::new(vec![grab("ABC123")]));
        let handler = FailedDownloadHandler::new(history.clone());
        let items = [item("ABC123", DownloadItemStatus::Failed)];

        assert_eq!(handler.handle(&items).await.unwrap(), 1);
        // Second poll sees the same failed item; the DownloadFailed
        // record is now the latest for the id, so nothing is appended.
        assert_eq!(handler.handle(&items).await.unwrap(), 0);
        assert_eq!(history.all().len(), 2);
    }

    #[tokio::test]
    async fn non_failed_and_unknown_items_are_ignored() {
        let history = Arc::new(InMemoryHistory::new(vec![grab("ABC123")]));
        let handler = FailedDownloadHandler::new(history.clone());

        let recorded = handler
            .handle(&[
                item("ABC123", DownloadItemStatus::Downloading),
                item("NOT-OURS", DownloadItemStatus::Failed),
            ])
            .await
            .unwrap();
        assert_eq!(recorded, 0);
        assert_eq!(history.all().len(), 1);
    }
}
