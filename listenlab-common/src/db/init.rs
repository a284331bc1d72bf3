//! Database initialization
//!
//! Creates the record-store tables on first run. Both tables mirror the
//! sheet-like positional row layout: text cells, append order preserved by
//! rowid, and deliberately no uniqueness constraint on participant id (the
//! store semantics are append/overwrite with last write wins).

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer; sessions from several
    // participants share this pool.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create record-store tables (idempotent, safe to call multiple times)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_survey_table(pool).await?;
    create_transcript_table(pool).await?;
    Ok(())
}

async fn create_survey_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS survey_responses (
            timestamp TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            q1 TEXT NOT NULL DEFAULT '',
            q2 TEXT NOT NULL DEFAULT '',
            q3 TEXT NOT NULL DEFAULT '',
            q4 TEXT NOT NULL DEFAULT '',
            q5 TEXT NOT NULL DEFAULT '',
            q6 TEXT NOT NULL DEFAULT '',
            calib1 TEXT NOT NULL DEFAULT '',
            calib2 TEXT NOT NULL DEFAULT '',
            calib3 TEXT NOT NULL DEFAULT '',
            calib4 TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_survey_participant
         ON survey_responses (participant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_transcript_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transcripts (
            timestamp TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            duration_seconds REAL NOT NULL,
            first_response TEXT NOT NULL,
            second_response TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transcript_participant
         ON transcripts (participant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn creates_tables_in_fresh_database() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_tables(&pool).await.unwrap();
        // Idempotent second pass
        create_tables(&pool).await.unwrap();

        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sqlite_master
             WHERE type = 'table' AND name IN ('survey_responses', 'transcripts')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let n: i64 = row.get("n");
        assert_eq!(n, 2);
    }
}
