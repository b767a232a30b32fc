//! Database models and queries.

pub mod feedback;
pub mod health;
pub mod models;
pub mod predictions;
pub mod profiles;
pub mod sessions;
pub mod users;

use anyhow::Context;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time::Duration;

/// Embedded schema migrations from `./migrations`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open (creating if needed) the SQLite database and apply migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .context("Failed to parse database URL")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(tracing::log::LevelFilter::Debug)
        .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

    let pool = SqlitePoolOptions::new()
        .min_connections(0)
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(4))
        .idle_timeout(Duration::from_secs(60 * 2))
        .connect_with(options)
        .await
        .context("Failed to create database pool")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
