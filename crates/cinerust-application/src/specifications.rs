// SPDX-License-Identifier: GPL-3.0-or-later
use async_trait::async_trait;
use chrono::{Duration, Utc};
use cinerust_domain::{HistoryEventType, ReleaseCandidate};
use cinerust_infrastructure::repositories::HistoryRepository;
use std::sync::Arc;
use tracing::debug;

use crate::decision::{
    Decision, DecisionSpecification, RejectionKind, SearchContext, SpecificationError,
};
use crate::upgrade::{cutoff_not_met, is_upgradable};

/// Age below which a prior grab suppresses re-grabbing the same movie.
pub const GRAB_COOLDOWN_HOURS: i64 = 12;

/// Rejects candidates whose quality the movie's profile does not want.
/// Cheap and local, so it runs first.
pub struct QualityAllowedSpecification;

#[async_trait]
impl DecisionSpecification for QualityAllowedSpecification {
    fn name(&self) -> &'static str {
        "quality-allowed"
    }

    fn rejection_kind(&self) -> RejectionKind {
        RejectionKind::Permanent
    }

    async fn evaluate(
        &self,
        candidate: &ReleaseCandidate,
        _search: Option<&SearchContext>,
    ) -> Result<Decision, SpecificationError> {
        let quality = candidate.release.quality;
        if !candidate.profile.allows(quality.source) {
            return Ok(Decision::reject(
                self.rejection_kind(),
                format!("{} is not wanted in profile", quality),
            ));
        }

        Ok(Decision::accept())
    }
}

/// Rejects releases for movies the user is not monitoring. Explicit
/// searches bypass the check: the user asked for this movie directly.
pub struct MonitoredSpecification;

#[async_trait]
impl DecisionSpecification for MonitoredSpecification {
    fn name(&self) -> &'static str {
        "monitored"
    }

    fn rejection_kind(&self) -> RejectionKind {
        RejectionKind::Permanent
    }

    async fn evaluate(
        &self,
        candidate: &ReleaseCandidate,
        search: Option<&SearchContext>,
    ) -> Result<Decision, SpecificationError> {
        if search.is_some() {
            debug!(target: "decision", "skipping monitored check during search");
            return Ok(Decision::accept());
        }

        if !candidate.movie.monitored {
            return Ok(Decision::reject(
                self.rejection_kind(),
                "Movie is not monitored",
            ));
        }

        Ok(Decision::accept())
    }
}

/// Suppresses redundant grabs shortly after a prior grab while still
/// letting genuine upgrades through. With completed-download handling
/// enabled, grabs older than the cooldown are expected to self-resolve
/// via the import path and are not held against the candidate.
pub struct HistorySpecification {
    history: Arc<dyn HistoryRepository>,
    cdh_enabled: bool,
}

impl HistorySpecification {
    pub fn new(history: Arc<dyn HistoryRepository>, cdh_enabled: bool) -> Self {
        Self {
            history,
            cdh_enabled,
        }
    }
}

#[async_trait]
impl DecisionSpecification for HistorySpecification {
    fn name(&self) -> &'static str {
        "history"
    }

    fn rejection_kind(&self) -> RejectionKind {
        // Final for the lifetime of the current history record; a new
        // record restarts the evaluation on the next cycle anyway.
        RejectionKind::Permanent
    }

    async fn evaluate(
        &self,
        candidate: &ReleaseCandidate,
        search: Option<&SearchContext>,
    ) -> Result<Decision, SpecificationError> {
        if search.is_some() {
            debug!(target: "decision", "skipping history check during search");
            return Ok(Decision::accept());
        }

        debug!(
            target: "decision",
            movie_id = %candidate.movie.id,
            "checking most recent grab in history"
        );
        let most_recent = self
            .history
            .most_recent_for_movie(candidate.movie.id)
            .await?;

        let Some(record) = most_recent else {
            return Ok(Decision::accept());
        };

        if record.event_type != HistoryEventType::Grabbed {
            return Ok(Decision::accept());
        }

        let recent =
            Utc::now().signed_duration_since(record.date) < Duration::hours(GRAB_COOLDOWN_HOURS);

        if !recent && self.cdh_enabled {
            return Ok(Decision::accept());
        }

        let cutoff_unmet = cutoff_not_met(&candidate.profile, record.quality);
        let upgradeable = is_upgradable(
            &candidate.profile,
            record.quality,
            candidate.release.quality,
        );

        if !cutoff_unmet {
            let reason = if recent {
                format!(
                    "Recent grab event in history already meets cutoff: {}",
                    record.quality
                )
            } else {
                format!(
                    "CDH is disabled and grab event in history already meets cutoff: {}",
                    record.quality
                )
            };
            return Ok(Decision::reject(self.rejection_kind(), reason));
        }

        if !upgradeable {
            let reason = if recent {
                format!(
                    "Recent grab event in history is of equal or higher quality: {}",
                    record.quality
                )
            } else {
                format!(
                    "CDH is disabled and grab event in history is of equal or higher quality: {}",
                    record.quality
                )
            };
            return Ok(Decision::reject(self.rejection_kind(), reason));
        }

        Ok(Decision::accept())
    }
}
