//! Datastore connection and startup settings. Settings come from env (`SCAFFOLD_DIR`,
//! `SCAFFOLD_SCHEMA`, `SCAFFOLD_DB`), each with a default relative to the project dir.

use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const SCHEMA_FILE: &str = "scaffold.yml";
pub const DATABASE_FILE: &str = "scaffold.db";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub schema_path: PathBuf,
    pub database_path: PathBuf,
}

impl Settings {
    /// Schema and database files inside `dir`.
    pub fn for_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Settings {
            schema_path: dir.join(SCHEMA_FILE),
            database_path: dir.join(DATABASE_FILE),
        }
    }

    pub fn from_env() -> Self {
        let dir = std::env::var("SCAFFOLD_DIR").unwrap_or_else(|_| ".".into());
        let defaults = Settings::for_dir(&dir);
        Settings {
            schema_path: std::env::var("SCAFFOLD_SCHEMA")
                .map(PathBuf::from)
                .unwrap_or(defaults.schema_path),
            database_path: std::env::var("SCAFFOLD_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
        }
    }
}

/// Single-connection pool: one shared connection for the process lifetime, never reaped.
fn single_connection() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

/// Open (creating if missing) the project database in WAL mode with foreign keys on.
pub async fn open_datastore(path: impl AsRef<Path>) -> Result<SqlitePool, AppError> {
    let path = path.as_ref();
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);
    let pool = single_connection().connect_with(options).await?;
    tracing::info!(path = %path.display(), "datastore opened");
    Ok(pool)
}

/// Private in-memory database; lives as long as the returned pool.
pub async fn open_in_memory() -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    Ok(single_connection().connect_with(options).await?)
}

/// Readiness probe.
pub async fn ping(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query("SELECT 1").fetch_optional(pool).await?;
    Ok(())
}
