// SPDX-License-Identifier: GPL-3.0-or-later
use cinerust_domain::{DownloadProtocol, HistoryEventType, HistoryRecord, ReleaseCandidate};
use cinerust_infrastructure::repositories::HistoryRepository;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::decision::{DecisionPipeline, Rejection, SearchContext};
use crate::download::{select_client, DownloadClient, DownloadClientError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrabOutcome {
    Grabbed {
        download_client: String,
        download_id: String,
    },
    Rejected(Rejection),
}

#[derive(Debug, Error)]
pub enum GrabError {
    #[error("no enabled download client handles {protocol}")]
    NoClient { protocol: DownloadProtocol },
    #[error("{client} failed to accept the release")]
    Download {
        client: String,
        #[source]
        source: DownloadClientError,
    },
    #[error("failed to record grab in history")]
    History(#[from] anyhow::Error),
}

/// Runs a candidate through the decision pipeline and, on acceptance,
/// hands it to a matching download client and appends a grab event to
/// history. The history write happens only after the client has taken
/// the release, so history never claims a grab that was not submitted.
pub struct GrabService {
    pipeline: DecisionPipeline,
    clients: Vec<Arc<dyn DownloadClient>>,
    history: Arc<dyn HistoryRepository>,
}

impl GrabService {
    pub fn new(
        pipeline: DecisionPipeline,
        clients: Vec<Arc<dyn DownloadClient>>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        Self {
            pipeline,
            clients,
            history,
        }
    }

    pub async fn process(
        &self,
        candidate: &ReleaseCandidate,
        search: Option<&SearchContext>,
    ) -> Result<GrabOutcome, GrabError> {
        let decision = self.pipeline.evaluate(candidate, search).await;
        if let Some(rejection) = decision.rejection() {
            info!(
                target: "grab",
                title = %candidate.release.title,
                reason = %rejection.reason,
                "release rejected"
            );
            return Ok(GrabOutcome::Rejected(rejection.clone()));
        }

        let protocol = candidate.release.protocol;
        let client =
            select_client(&self.clients, protocol).ok_or(GrabError::NoClient { protocol })?;

        let download_id =
            client
                .download(candidate)
                .await
                .map_err(|source| GrabError::Download {
                    client: client.name().to_string(),
                    source,
                })?;

        let mut record = HistoryRecord::new(
            candidate.movie.id,
            HistoryEventType::Grabbed,
            candidate.release.quality,
            candidate.release.title.clone(),
        );
        record.download_id = Some(download_id.clone());
        self.history.record(record).await?;

        info!(
            target: "grab",
            title = %candidate.release.title,
            client = %client.name(),
            download_id = %download_id,
            "release grabbed"
        );

        Ok(GrabOutcome::Grabbed {
            download_client: client.name().to_string(),
            download_id,
        })
    }
}
