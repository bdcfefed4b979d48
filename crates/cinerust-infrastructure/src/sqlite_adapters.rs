// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use cinerust_domain::{
    HistoryRecord, HistoryRecordId, Movie, MovieId, ProfileId, Quality, QualityProfile,
    QualitySource,
};
use sqlx::Row;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::repositories::{
    HistoryRepository, MovieRepository, QualityProfileRepository, Repository,
};

/// SQLx-backed Movie repository
pub struct SqliteMovieRepository {
    pool: SqlitePool,
}

impl SqliteMovieRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository<Movie> for SqliteMovieRepository {
    async fn create(&self, entity: Movie) -> Result<Movie> {
        debug!(target: "repository", movie_id = %entity.id, "creating movie");
        let q = r#"
            INSERT INTO movies (
                id, title, year, foreign_movie_id, quality_profile_id,
                path, monitored, has_file, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        sqlx::query(q)
            .bind(entity.id.to_string())
            .bind(entity.title.clone())
            .bind(entity.year)
            .bind(entity.foreign_movie_id.clone())
            .bind(entity.quality_profile_id.map(|p| p.to_string()))
            .bind(entity.path.clone())
            .bind(entity.monitored)
            .bind(entity.has_file)
            .bind(entity.created_at.to_rfc3339())
            .bind(entity.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: impl Into<String> + Send) -> Result<Option<Movie>> {
        let id = id.into();
        debug!(target: "repository", %id, "fetching movie by id");
        let row = sqlx::query("SELECT * FROM movies WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_movie(&r)).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Movie>> {
        debug!(target: "repository", limit, offset, "listing movies");
        let rows = sqlx::query("SELECT * FROM movies ORDER BY title LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_movie(&r)?);
        }
        Ok(out)
    }

    async fn update(&self, entity: Movie) -> Result<Movie> {
        debug!(target: "repository", movie_id = %entity.id, "updating movie");
        let q = r#"
            UPDATE movies SET
                title = ?,
                year = ?,
                foreign_movie_id = ?,
                quality_profile_id = ?,
                path = ?,
                monitored = ?,
                has_file = ?,
                updated_at = ?
            WHERE id = ?
        "#;
        sqlx::query(q)
            .bind(entity.title.clone())
            .bind(entity.year)
            .bind(entity.foreign_movie_id.clone())
            .bind(entity.quality_profile_id.map(|p| p.to_string()))
            .bind(entity.path.clone())
            .bind(entity.monitored)
            .bind(entity.has_file)
            .bind(entity.updated_at.to_rfc3339())
            .bind(entity.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn delete(&self, id: impl Into<String> + Send) -> Result<()> {
        let id = id.into();
        debug!(target: "repository", %id, "deleting movie");
        sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MovieRepository for SqliteMovieRepository {
    async fn get_by_title(&self, title: &str) -> Result<Option<Movie>> {
        debug!(target: "repository", title, "fetching movie by title");
        let row = sqlx::query("SELECT * FROM movies WHERE title = ? LIMIT 1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_movie(&r)).transpose()
    }

    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Movie>> {
        debug!(target: "repository", foreign_id, "fetching movie by foreign_id");
        let row = sqlx::query("SELECT * FROM movies WHERE foreign_movie_id = ? LIMIT 1")
            .bind(foreign_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_movie(&r)).transpose()
    }

    async fn list_monitored(&self, limit: i64, offset: i64) -> Result<Vec<Movie>> {
        debug!(target: "repository", limit, offset, "listing monitored movies");
        let rows =
            sqlx::query("SELECT * FROM movies WHERE monitored = 1 ORDER BY title LIMIT ? OFFSET ?")
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_movie(&r)?);
        }
        Ok(out)
    }
}

fn parse_profile_id_opt(s: Option<String>) -> Result<Option<ProfileId>> {
    match s {
        Some(val) => {
            let uuid = Uuid::parse_str(&val)?;
            Ok(Some(ProfileId::from_uuid(uuid)))
        }
        None => Ok(None),
    }
}

fn parse_dt(s: String) -> Result<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Fallback to SQLite default CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS"
    let ndt = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

fn row_to_movie(row: &sqlx::sqlite::SqliteRow) -> Result<Movie> {
    let id_str: String = row.try_get("id")?;
    let id = MovieId::from_uuid(Uuid::parse_str(&id_str)?);

    let title: String = row.try_get("title")?;
    let year: Option<i32> = row.try_get("year")?;
    let foreign_movie_id: Option<String> = row.try_get("foreign_movie_id")?;
    let quality_profile_id: Option<String> = row.try_get("quality_profile_id")?;
    let path: Option<String> = row.try_get("path")?;
    let monitored: bool = row.try_get("monitored")?;
    let has_file: bool = row.try_get("has_file")?;
    let created_at_s: String = row.try_get("created_at")?;
    let updated_at_s: String = row.try_get("updated_at")?;

    Ok(Movie {
        id,
        title,
        year,
        foreign_movie_id,
        quality_profile_id: parse_profile_id_opt(quality_profile_id)?,
        path,
        monitored,
        has_file,
        created_at: parse_dt(created_at_s)?,
        updated_at: parse_dt(updated_at_s)?,
    })
}

// ============================================================================

/// SQLx-backed Quality Profile repository. The allowed list and the
/// cutoff are stored as JSON text columns.
pub struct SqliteQualityProfileRepository {
    pool: SqlitePool,
}

impl SqliteQualityProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository<QualityProfile> for SqliteQualityProfileRepository {
    async fn create(&self, entity: QualityProfile) -> Result<QualityProfile> {
        debug!(target: "repository", profile_id = %entity.id, "creating quality profile");
        let q = r#"
            INSERT INTO quality_profiles (
                id, name, allowed, cutoff, upgrade_allowed, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;
        sqlx::query(q)
            .bind(entity.id.to_string())
            .bind(entity.name.clone())
            .bind(serde_json::to_string(&entity.allowed)?)
            .bind(serde_json::to_string(&entity.cutoff)?)
            .bind(entity.upgrade_allowed)
            .bind(entity.created_at.to_rfc3339())
            .bind(entity.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: impl Into<String> + Send) -> Result<Option<QualityProfile>> {
        let id = id.into();
        debug!(target: "repository", %id, "fetching quality profile by id");
        let row = sqlx::query("SELECT * FROM quality_profiles WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_profile(&r)).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<QualityProfile>> {
        debug!(target: "repository", limit, offset, "listing quality profiles");
        let rows = sqlx::query("SELECT * FROM quality_profiles ORDER BY name LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_profile(&r)?);
        }
        Ok(out)
    }

    async fn update(&self, entity: QualityProfile) -> Result<QualityProfile> {
        debug!(target: "repository", profile_id = %entity.id, "updating quality profile");
        let q = r#"
            UPDATE quality_profiles SET
                name = ?,
                allowed = ?,
                cutoff = ?,
                upgrade_allowed = ?,
                updated_at = ?
            WHERE id = ?
        "#;
        sqlx::query(q)
            .bind(entity.name.clone())
            .bind(serde_json::to_string(&entity.allowed)?)
            .bind(serde_json::to_string(&entity.cutoff)?)
            .bind(entity.upgrade_allowed)
            .bind(entity.updated_at.to_rfc3339())
            .bind(entity.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn delete(&self, id: impl Into<String> + Send) -> Result<()> {
        let id = id.into();
        debug!(target: "repository", %id, "deleting quality profile");
        sqlx::query("DELETE FROM quality_profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl QualityProfileRepository for SqliteQualityProfileRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<QualityProfile>> {
        debug!(target: "repository", name, "fetching quality profile by name");
        let row = sqlx::query("SELECT * FROM quality_profiles WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_profile(&r)).transpose()
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<QualityProfile> {
    let id_str: String = row.try_get("id")?;
    let id = ProfileId::from_uuid(Uuid::parse_str(&id_str)?);

    let name: String = row.try_get("name")?;
    let allowed_json: String = row.try_get("allowed")?;
    let cutoff_json: String = row.try_get("cutoff")?;
    let upgrade_allowed: bool = row.try_get("upgrade_allowed")?;
    let created_at_s: String = row.try_get("created_at")?;
    let updated_at_s: String = row.try_get("updated_at")?;

    let allowed: Vec<QualitySource> = serde_json::from_str(&allowed_json)
        .map_err(|e| anyhow!("invalid allowed qualities for profile {}: {}", name, e))?;
    let cutoff: QualitySource = serde_json::from_str(&cutoff_json)
        .map_err(|e| anyhow!("invalid cutoff for profile {}: {}", name, e))?;

    Ok(QualityProfile {
        id,
        name,
        allowed,
        cutoff,
        upgrade_allowed,
        created_at: parse_dt(created_at_s)?,
        updated_at: parse_dt(updated_at_s)?,
    })
}

// ============================================================================

/// SQLx-backed history repository. Append-only; the decision engine reads
/// only the most recent record per movie.
pub struct SqliteHistoryRepository {
    pool: SqlitePool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryRepository for SqliteHistoryRepository {
    async fn most_recent_for_movie(&self, movie_id: MovieId) -> Result<Option<HistoryRecord>> {
        debug!(target: "repository", %movie_id, "fetching most recent history record");
        let row = sqlx::query(
            "SELECT * FROM history WHERE movie_id = ? ORDER BY date DESC, rowid DESC LIMIT 1",
        )
        .bind(movie_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_history(&r)).transpose()
    }

    async fn most_recent_for_download_id(
        &self,
        download_id: &str,
    ) -> Result<Option<HistoryRecord>> {
        debug!(target: "repository", download_id, "fetching most recent history record by download id");
        let row = sqlx::query(
            "SELECT * FROM history WHERE download_id = ? ORDER BY date DESC, rowid DESC LIMIT 1",
        )
        .bind(download_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_history(&r)).transpose()
    }

    async fn list_for_movie(
        &self,
        movie_id: MovieId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HistoryRecord>> {
        debug!(target: "repository", %movie_id, limit, offset, "listing history records");
        let rows = sqlx::query(
            "SELECT * FROM history WHERE movie_id = ? ORDER BY date DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(movie_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(row_to_history(&r)?);
        }
        Ok(out)
    }

    async fn record(&self, record: HistoryRecord) -> Result<HistoryRecord> {
        debug!(
            target: "repository",
            movie_id = %record.movie_id,
            event = %record.event_type,
            "appending history record"
        );
        let q = r#"
            INSERT INTO history (
                id, movie_id, event_type, quality, date, source_title, download_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;
        sqlx::query(q)
            .bind(record.id.to_string())
            .bind(record.movie_id.to_string())
            .bind(record.event_type.to_string())
            .bind(serde_json::to_string(&record.quality)?)
            .bind(record.date.to_rfc3339())
            .bind(record.source_title.clone())
            .bind(record.download_id.clone())
            .execute(&self.pool)
            .await?;
        Ok(record)
    }
}

fn row_to_history(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryRecord> {
    let id_str: String = row.try_get("id")?;
    let movie_id_str: String = row.try_get("movie_id")?;
    let event_type_s: String = row.try_get("event_type")?;
    let quality_json: String = row.try_get("quality")?;
    let date_s: String = row.try_get("date")?;
    let source_title: String = row.try_get("source_title")?;
    let download_id: Option<String> = row.try_get("download_id")?;

    let quality: Quality = serde_json::from_str(&quality_json)
        .map_err(|e| anyhow!("invalid quality in history record {}: {}", id_str, e))?;

    Ok(HistoryRecord {
        id: HistoryRecordId::from_uuid(Uuid::parse_str(&id_str)?),
        movie_id: MovieId::from_uuid(Uuid::parse_str(&movie_id_str)?),
        event_type: event_type_s
            .parse()
            .map_err(|e: String| anyhow!(e))?,
        quality,
        date: parse_dt(date_s)?,
        source_title,
        download_id,
    })
}

// ============================================================================
// Tests
// ============================================================================
