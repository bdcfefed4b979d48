// SPDX-License-Identifier: GPL-3.0-or-later
pub mod repositories;
pub mod sqlite_adapters;

use anyhow::Result;
use cinerust_config::AppConfig;
use reqwest::Client;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub fn http_client() -> Client {
    Client::builder()
        .pool_max_idle_per_host(8)
        .build()
        .expect("http client")
}

pub async fn init_database(config: &AppConfig) -> Result<SqlitePool> {
    info!(target: "infrastructure", "initializing database");

    // Normalize the database URL for SQLite on Windows
    let db_url = if config.database.url.starts_with("sqlite://")
        && !config.database.url.starts_with("sqlite://:memory:")
    {
        let db_path = config.database.url.trim_start_matches("sqlite://");
        let path = Path::new(db_path);

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
                info!(target: "infrastructure", path = %parent.display(), "created database directory");
            }
        }

        // Convert to absolute path for better Windows compatibility
        let absolute_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        // Use the absolute path with forward slashes (SQLite handles this on all platforms)
        let path_str = absolute_path.to_string_lossy().replace('\\', "/");

        // Add create mode to ensure SQLite can create the file
        format!("sqlite://{}?mode=rwc", path_str)
    } else {
        config.database.url.clone()
    };

    info!(target: "infrastructure", db_url = %db_url, "connecting to database");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.pool_max_size)
        .connect(&db_url)
        .await?;

    info!(target: "infrastructure", db_url = %config.database.url, "running migrations");
    sqlx::migrate!("../../migrations").run(&pool).await?;

    info!(target: "infrastructure", "database initialized successfully");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    #[test]
    fn test_path_conversion_windows_style() {
        let path = Path::new("data\\cinerust.db");
        let normalized = path.to_string_lossy().replace('\\', "/");
        assert!(normalized.contains("/") || !normalized.contains("\\"));
    }

    #[test]
    fn test_path_conversion_unix_style() {
        let path = Path::new("data/cinerust.db");
        let normalized = path.to_string_lossy().replace('\\', "/");
        assert_eq!(normalized, "data/cinerust.db");
    }

    #[test]
    fn test_relative_to_absolute_conversion() {
        let relative_path = Path::new("data/cinerust.db");
        let result = std::env::current_dir().unwrap().join(relative_path);
        assert!(result.is_absolute());
    }
}
