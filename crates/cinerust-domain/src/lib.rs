// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

// ============================================================================
// Value Objects & IDs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovieId(pub Uuid);

impl MovieId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MovieId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRecordId(pub Uuid);

impl HistoryRecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for HistoryRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HistoryRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Quality Model
// ============================================================================

/// Quality tier of a release source. The ordinal rank is the primary
/// comparison key everywhere qualities are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualitySource {
    Unknown,
    Cam,
    Telesync,
    Dvd,
    Sdtv,
    Hdtv720p,
    Webdl720p,
    Bluray720p,
    Hdtv1080p,
    Webdl1080p,
    Bluray1080p,
    Webdl2160p,
    Bluray2160p,
}

impl QualitySource {
    /// Ordinal rank. Unknown ranks below every defined quality.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Cam => 1,
            Self::Telesync => 2,
            Self::Dvd => 3,
            Self::Sdtv => 4,
            Self::Hdtv720p => 5,
            Self::Webdl720p => 6,
            Self::Bluray720p => 7,
            Self::Hdtv1080p => 8,
            Self::Webdl1080p => 9,
            Self::Bluray1080p => 10,
            Self::Webdl2160p => 11,
            Self::Bluray2160p => 12,
        }
    }
}

impl std::fmt::Display for QualitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::Cam => "CAM",
            Self::Telesync => "TELESYNC",
            Self::Dvd => "DVD",
            Self::Sdtv => "SDTV",
            Self::Hdtv720p => "HDTV-720p",
            Self::Webdl720p => "WEBDL-720p",
            Self::Bluray720p => "Bluray-720p",
            Self::Hdtv1080p => "HDTV-1080p",
            Self::Webdl1080p => "WEBDL-1080p",
            Self::Bluray1080p => "Bluray-1080p",
            Self::Webdl2160p => "WEBDL-2160p",
            Self::Bluray2160p => "Bluray-2160p",
        };
        write!(f, "{}", name)
    }
}

impl PartialOrd for QualitySource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualitySource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Revision marker of a release: proper releases carry version >= 2,
/// REAL releases carry real >= 1. Acts as the tie-break within a tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Revision {
    pub version: u32,
    pub real: u32,
}

impl Revision {
    pub fn new(version: u32, real: u32) -> Self {
        Self { version, real }
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self {
            version: 1,
            real: 0,
        }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.version)?;
        if self.real > 0 {
            write!(f, " REAL")?;
        }
        Ok(())
    }
}

/// A fully qualified quality: source tier plus revision. Total order:
/// tier dominates, revision breaks ties within an equal tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quality {
    pub source: QualitySource,
    pub revision: Revision,
}

impl Quality {
    pub fn new(source: QualitySource) -> Self {
        Self {
            source,
            revision: Revision::default(),
        }
    }

    pub fn with_revision(source: QualitySource, revision: Revision) -> Self {
        Self { source, revision }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.revision == Revision::default() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{} {}", self.source, self.revision)
        }
    }
}

impl PartialOrd for Quality {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quality {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source
            .cmp(&other.source)
            .then(self.revision.cmp(&other.revision))
    }
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadProtocol {
    Usenet,
    Torrent,
}

impl std::fmt::Display for DownloadProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usenet => write!(f, "usenet"),
            Self::Torrent => write!(f, "torrent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryEventType {
    Grabbed,
    Imported,
    DownloadFailed,
    Deleted,
}

impl std::fmt::Display for HistoryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grabbed => write!(f, "grabbed"),
            Self::Imported => write!(f, "imported"),
            Self::DownloadFailed => write!(f, "downloadfailed"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl std::str::FromStr for HistoryEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grabbed" => Ok(Self::Grabbed),
            "imported" => Ok(Self::Imported),
            "downloadfailed" => Ok(Self::DownloadFailed),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown history event type: {}", other)),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: Option<i32>,
    pub foreign_movie_id: Option<String>,
    pub quality_profile_id: Option<ProfileId>,
    pub path: Option<String>,
    pub monitored: bool,
    pub has_file: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: MovieId::new(),
            title: title.into(),
            year: None,
            foreign_movie_id: None,
            quality_profile_id: None,
            path: None,
            monitored: true,
            has_file: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ordered allow-list of qualities for a movie plus the cutoff quality
/// above which no further upgrade search is warranted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: ProfileId,
    pub name: String,
    pub allowed: Vec<QualitySource>,
    pub cutoff: QualitySource,
    pub upgrade_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QualityProfile {
    pub fn new(
        name: impl Into<String>,
        allowed: Vec<QualitySource>,
        cutoff: QualitySource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            name: name.into(),
            allowed,
            cutoff,
            upgrade_allowed: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn allows(&self, source: QualitySource) -> bool {
        self.allowed.contains(&source)
    }
}

/// Immutable description of a discovered release. Produced by the
/// search/feed collaborator, read-only within the decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub title: String,
    pub download_url: String,
    pub quality: Quality,
    pub size_bytes: Option<u64>,
    pub protocol: DownloadProtocol,
    pub indexer: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A release paired with the movie it is believed to satisfy and that
/// movie's quality profile. Unit of evaluation for the decision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseCandidate {
    pub movie: Movie,
    pub profile: QualityProfile,
    pub release: Release,
}

/// Append-only acquisition event log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryRecordId,
    pub movie_id: MovieId,
    pub event_type: HistoryEventType,
    pub quality: Quality,
    pub date: DateTime<Utc>,
    pub source_title: String,
    pub download_id: Option<String>,
}

impl HistoryRecord {
    pub fn new(
        movie_id: MovieId,
        event_type: HistoryEventType,
        quality: Quality,
        source_title: impl Into<String>,
    ) -> Self {
        Self {
            id: HistoryRecordId::new(),
            movie_id,
            event_type,
            quality,
            date: Utc::now(),
            source_title: source_title.into(),
            download_id: None,
        }
    }
}

// ============================================================================
// Domain Validation
// ============================================================================

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl Validate for Movie {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(ValidationError {
                field: "title",
                message: "title cannot be empty".into(),
            });
        }
        if let Some(path) = &self.path {
            if path.trim().is_empty() {
                errors.push(ValidationError {
                    field: "path",
                    message: "path cannot be empty when provided".into(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for QualityProfile {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "name",
                message: "name cannot be empty".into(),
            });
        }
        if self.allowed.is_empty() {
            errors.push(ValidationError {
                field: "allowed",
                message: "at least one quality must be allowed".into(),
            });
        }
        if !self.allowed.contains(&self.cutoff) {
            errors.push(ValidationError {
                field: "cutoff",
                message: "cutoff must be one of the allowed qualities".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ============================================================================
// File Name Utilities
// ============================================================================

/// Strip characters that are invalid in file names on common platforms.
pub fn clean_file_name(input: &str) -> String {
    let banned = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    input
        .chars()
        .map(|c| if banned.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

// ============================================================================
// Domain Events (lightweight scaffolding)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent<TPayload> {
    pub name: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: TPayload,
}

impl<TPayload> DomainEvent<TPayload> {
    pub fn new(name: &'static str, payload: TPayload) -> Self {
        Self {
            name,
            occurred_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieGrabbedPayload {
    pub movie_id: MovieId,
    pub release_title: String,
    pub quality: Quality,
    pub download_client: String,
    pub download_id: String,
}

pub type MovieGrabbed = DomainEvent<MovieGrabbedPayload>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadCompletedPayload {
    pub movie_id: MovieId,
    pub download_id: String,
    pub output_path: Option<String>,
}

pub type DownloadCompleted = DomainEvent<DownloadCompletedPayload>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn q(source: QualitySource) -> Quality {
        Quality::new(source)
    }

    #[test]
    fn quality_source_rank_ordering() {
        assert!(QualitySource::Cam < QualitySource::Dvd);
        assert!(QualitySource::Webdl720p < QualitySource::Webdl1080p);
        assert!(QualitySource::Webdl1080p < QualitySource::Bluray1080p);
        assert!(QualitySource::Unknown < QualitySource::Cam);
    }

    #[test]
    fn quality_order_is_total_and_antisymmetric() {
        let all = [
            q(QualitySource::Unknown),
            q(QualitySource::Cam),
            q(QualitySource::Dvd),
            q(QualitySource::Hdtv720p),
            q(QualitySource::Webdl1080p),
            Quality::with_revision(QualitySource::Webdl1080p, Revision::new(2, 0)),
            q(QualitySource::Bluray2160p),
        ];
        for a in &all {
            for b in &all {
                // Exactly one of <, ==, > holds.
                let relations = [a < b, a == b, a > b];
                assert_eq!(relations.iter().filter(|r| **r).count(), 1);
                assert_eq!(a.cmp(b), b.cmp(a).reverse());
            }
        }
    }

    #[test]
    fn revision_breaks_ties_within_equal_tier() {
        let plain = q(QualitySource::Webdl1080p);
        let proper = Quality::with_revision(QualitySource::Webdl1080p, Revision::new(2, 0));
        let real = Quality::with_revision(QualitySource::Webdl1080p, Revision::new(2, 1));

        assert!(plain < proper);
        assert!(proper < real);
        // Tier still dominates the revision.
        assert!(real < q(QualitySource::Bluray1080p));
    }

    #[test]
    fn quality_display_includes_revision_only_when_bumped() {
        assert_eq!(q(QualitySource::Webdl1080p).to_string(), "WEBDL-1080p");
        let proper = Quality::with_revision(QualitySource::Dvd, Revision::new(2, 0));
        assert_eq!(proper.to_string(), "DVD v2");
        let real = Quality::with_revision(QualitySource::Dvd, Revision::new(2, 1));
        assert_eq!(real.to_string(), "DVD v2 REAL");
    }

    #[test]
    fn history_event_type_round_trips_through_str() {
        for event in [
            HistoryEventType::Grabbed,
            HistoryEventType::Imported,
            HistoryEventType::DownloadFailed,
            HistoryEventType::Deleted,
        ] {
            let parsed: HistoryEventType = event.to_string().parse().unwrap();
            assert_eq!(parsed, event);
        }
        assert!("grab".parse::<HistoryEventType>().is_err());
    }

    #[test]
    fn quality_profile_validation_cutoff_must_be_allowed() {
        let mut profile = QualityProfile::new(
            "HD",
            vec![QualitySource::Webdl720p, QualitySource::Webdl1080p],
            QualitySource::Webdl1080p,
        );
        assert!(profile.validate().is_ok());

        profile.cutoff = QualitySource::Bluray2160p;
        let errs = profile.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "cutoff"));
    }

    #[test]
    fn quality_profile_validation_requires_allowed_list() {
        let mut profile =
            QualityProfile::new("Empty", vec![QualitySource::Dvd], QualitySource::Dvd);
        profile.allowed.clear();
        let errs = profile.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "allowed"));
    }

    #[test]
    fn movie_validation_rejects_blank_title() {
        let movie = Movie::new("  ");
        let errs = movie.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "title"));
    }

    #[test]
    fn clean_file_name_strips_banned_characters() {
        assert_eq!(
            clean_file_name("Movie: The/Sequel? (2024)"),
            "Movie The Sequel (2024)"
        );
        assert_eq!(clean_file_name("  spaced   out  "), "spaced out");
    }

    #[test]
    fn movie_grabbed_event() {
        let payload = MovieGrabbedPayload {
            movie_id: MovieId::new(),
            release_title: "Movie.2024.1080p.WEB-DL".into(),
            quality: Quality::new(QualitySource::Webdl1080p),
            download_client: "qBittorrent".into(),
            download_id: "ABC123".into(),
        };
        let event: MovieGrabbed = DomainEvent::new("movie.grabbed", payload);
        assert_eq!(event.name, "movie.grabbed");
        assert_eq!(event.payload.download_id, "ABC123");
    }
}
