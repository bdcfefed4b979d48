// SPDX-License-Identifier: GPL-3.0-or-later
use async_trait::async_trait;
use cinerust_domain::{MovieId, ReleaseCandidate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Whether a rejection can ever resolve itself without the candidate
/// changing. Temporary rejections are worth re-evaluating on a later
/// sync cycle; Permanent ones are final for the candidate's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionKind {
    Permanent,
    Temporary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
    pub kind: RejectionKind,
}

/// Verdict for one candidate. An accepted decision cannot carry a
/// rejection reason by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    Reject(Rejection),
}

impl Decision {
    pub fn accept() -> Self {
        Self::Accept
    }

    pub fn reject(kind: RejectionKind, reason: impl Into<String>) -> Self {
        Self::Reject(Rejection {
            reason: reason.into(),
            kind,
        })
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accept => None,
            Self::Reject(rejection) => Some(rejection),
        }
    }
}

/// Present when the evaluation was triggered by an explicit user search;
/// absent during automatic background sync. Several specifications accept
/// unconditionally under a search context so that explicit user intent is
/// never blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchContext {
    pub movie_id: MovieId,
}

#[derive(Debug, Error)]
pub enum SpecificationError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] anyhow::Error),
}

/// One accept/reject rule in the decision pipeline.
#[async_trait]
pub trait DecisionSpecification: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classification used for rejections produced by this specification.
    fn rejection_kind(&self) -> RejectionKind;

    async fn evaluate(
        &self,
        candidate: &ReleaseCandidate,
        search: Option<&SearchContext>,
    ) -> Result<Decision, SpecificationError>;
}

/// Ordered chain of specifications. Evaluation is strictly in-order and
/// stops at the first rejection, so cheap local checks belong before
/// expensive remote ones.
pub struct DecisionPipeline {
    specifications: Vec<Box<dyn DecisionSpecification>>,
}

impl DecisionPipeline {
    pub fn new(specifications: Vec<Box<dyn DecisionSpecification>>) -> Self {
        Self { specifications }
    }

    pub async fn evaluate(
        &self,
        candidate: &ReleaseCandidate,
        search: Option<&SearchContext>,
    ) -> Decision {
        for specification in &self.specifications {
            match specification.evaluate(candidate, search).await {
                Ok(Decision::Accept) => {
                    debug!(
                        target: "decision",
                        specification = specification.name(),
                        title = %candidate.release.title,
                        "specification accepted"
                    );
                }
                Ok(Decision::Reject(rejection)) => {
                    debug!(
                        target: "decision",
                        specification = specification.name(),
                        title = %candidate.release.title,
                        reason = %rejection.reason,
                        "specification rejected"
                    );
                    return Decision::Reject(rejection);
                }
                Err(err) => {
                    // A faulty specification must not abort evaluation of
                    // other candidates; reject this one conservatively and
                    // let the next sync cycle retry.
                    warn!(
                        target: "decision",
                        specification = specification.name(),
                        title = %candidate.release.title,
                        error = %err,
                        "specification could not be evaluated"
                    );
                    return Decision::reject(
                        RejectionKind::Temporary,
                        format!("{} could not be evaluated", specification.name()),
                    );
                }
            }
        }

        Decision::Accept
    }
}
