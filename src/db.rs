//! SQLite connection and schema setup.

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::path::Path;

const INIT_MIGRATION: &str = include_str!("../migrations/0001_init.sql");

/// Open (creating if needed) the database file with foreign keys enforced.
pub async fn connect(database_file: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(database_file)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("opening database {}", database_file.display()))
}

/// Run the embedded schema. Every statement is `IF NOT EXISTS`, so this is
/// safe on every start.
pub async fn run_migrations(db: &SqlitePool) -> Result<()> {
    let statements = INIT_MIGRATION
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt)
            .execute(db)
            .await
            .with_context(|| format!("executing migration statement `{}`", stmt))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn migrations_are_repeatable() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = connect(&temp_dir.path().join("data.db"))
            .await
            .expect("database should open");

        run_migrations(&db).await.expect("first run");
        run_migrations(&db).await.expect("second run");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&db)
        .await
        .unwrap();
        assert_eq!(tables, ["collections", "images"]);
    }
}
