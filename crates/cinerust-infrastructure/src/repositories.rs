// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use cinerust_domain::{HistoryRecord, Movie, MovieId, QualityProfile};

// ============================================================================
// Repository Traits
// ============================================================================

/// Generic repository for CRUD operations on a domain entity
#[async_trait::async_trait]
pub trait Repository<T>: Send + Sync {
    async fn create(&self, entity: T) -> Result<T>;
    async fn get_by_id(&self, id: impl Into<String> + Send) -> Result<Option<T>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<T>>;
    async fn update(&self, entity: T) -> Result<T>;
    async fn delete(&self, id: impl Into<String> + Send) -> Result<()>;
}

/// Movie repository with specialized queries
#[async_trait::async_trait]
pub trait MovieRepository: Repository<Movie> {
    async fn get_by_title(&self, title: &str) -> Result<Option<Movie>>;
    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Movie>>;
    async fn list_monitored(&self, limit: i64, offset: i64) -> Result<Vec<Movie>>;
}

/// Quality profile repository
#[async_trait::async_trait]
pub trait QualityProfileRepository: Repository<QualityProfile> {
    async fn get_by_name(&self, name: &str) -> Result<Option<QualityProfile>>;
}

/// Read/append surface over the acquisition event log. Records are
/// immutable once written; there is no update or delete.
#[async_trait::async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Latest event for the movie by date, regardless of event type.
    async fn most_recent_for_movie(&self, movie_id: MovieId) -> Result<Option<HistoryRecord>>;
    /// Latest event carrying the given download client id.
    async fn most_recent_for_download_id(
        &self,
        download_id: &str,
    ) -> Result<Option<HistoryRecord>>;
    async fn list_for_movie(
        &self,
        movie_id: MovieId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HistoryRecord>>;
    async fn record(&self, record: HistoryRecord) -> Result<HistoryRecord>;
}
