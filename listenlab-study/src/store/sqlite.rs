//! SQLite-backed record store

use async_trait::async_trait;
use chrono::Utc;
use listenlab_common::records::{SurveyRow, TranscriptRow};
use listenlab_common::Result;
use sqlx::{Row, SqlitePool};

use super::PersistenceGateway;

/// Record store over the shared SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistenceGateway for SqliteStore {
    async fn append_survey_stub(&self, participant_id: &str) -> Result<()> {
        let stub = SurveyRow::stub(participant_id, Utc::now());
        insert_survey_row(&self.pool, &stub).await
    }

    async fn find_survey_row(&self, participant_id: &str) -> Result<Option<SurveyRow>> {
        let row = sqlx::query(
            "SELECT timestamp, participant_id,
                    q1, q2, q3, q4, q5, q6,
                    calib1, calib2, calib3, calib4
             FROM survey_responses
             WHERE participant_id = ?
             ORDER BY rowid
             LIMIT 1",
        )
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| survey_from_row(&r)).transpose()
    }

    async fn update_survey_row(&self, participant_id: &str, row: &SurveyRow) -> Result<()> {
        // Read-then-overwrite of the earliest row for this id. No lock: a
        // concurrent writer may win the race, and a missed lookup appends a
        // second row (last write wins, duplicates tolerated).
        let result = sqlx::query(
            "UPDATE survey_responses SET
                timestamp = ?,
                q1 = ?, q2 = ?, q3 = ?, q4 = ?, q5 = ?, q6 = ?,
                calib1 = ?, calib2 = ?, calib3 = ?, calib4 = ?
             WHERE rowid = (
                SELECT MIN(rowid) FROM survey_responses WHERE participant_id = ?
             )",
        )
        .bind(row.timestamp.to_rfc3339())
        .bind(&row.screening[0])
        .bind(&row.screening[1])
        .bind(&row.screening[2])
        .bind(&row.screening[3])
        .bind(&row.screening[4])
        .bind(&row.screening[5])
        .bind(&row.calibration[0])
        .bind(&row.calibration[1])
        .bind(&row.calibration[2])
        .bind(&row.calibration[3])
        .bind(participant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            insert_survey_row(&self.pool, row).await?;
        }
        Ok(())
    }

    async fn append_transcript_row(&self, row: &TranscriptRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO transcripts (
                timestamp, participant_id, item_id,
                start_time, end_time, duration_seconds,
                first_response, second_response
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.timestamp.to_rfc3339())
        .bind(&row.participant_id)
        .bind(&row.item_id)
        .bind(row.start_time.to_rfc3339())
        .bind(row.end_time.to_rfc3339())
        .bind(row.duration_seconds)
        .bind(&row.first_response)
        .bind(&row.second_response)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_survey_rows(&self) -> Result<Vec<SurveyRow>> {
        let rows = sqlx::query(
            "SELECT timestamp, participant_id,
                    q1, q2, q3, q4, q5, q6,
                    calib1, calib2, calib3, calib4
             FROM survey_responses
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(survey_from_row).collect()
    }

    async fn list_transcript_rows(&self) -> Result<Vec<TranscriptRow>> {
        let rows = sqlx::query(
            "SELECT timestamp, participant_id, item_id,
                    start_time, end_time, duration_seconds,
                    first_response, second_response
             FROM transcripts
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transcript_from_row).collect()
    }
}

async fn insert_survey_row(pool: &SqlitePool, row: &SurveyRow) -> Result<()> {
    sqlx::query(
        "INSERT INTO survey_responses (
            timestamp, participant_id,
            q1, q2, q3, q4, q5, q6,
            calib1, calib2, calib3, calib4
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(row.timestamp.to_rfc3339())
    .bind(&row.participant_id)
    .bind(&row.screening[0])
    .bind(&row.screening[1])
    .bind(&row.screening[2])
    .bind(&row.screening[3])
    .bind(&row.screening[4])
    .bind(&row.screening[5])
    .bind(&row.calibration[0])
    .bind(&row.calibration[1])
    .bind(&row.calibration[2])
    .bind(&row.calibration[3])
    .execute(pool)
    .await?;
    Ok(())
}

fn survey_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SurveyRow> {
    let mut cells: Vec<String> = Vec::with_capacity(12);
    for col in [
        "timestamp", "participant_id", "q1", "q2", "q3", "q4", "q5", "q6", "calib1", "calib2",
        "calib3", "calib4",
    ] {
        cells.push(row.try_get::<String, _>(col)?);
    }
    SurveyRow::from_cells(&cells)
}

fn transcript_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<TranscriptRow> {
    let mut cells: Vec<String> = Vec::with_capacity(8);
    for col in ["timestamp", "participant_id", "item_id", "start_time", "end_time"] {
        cells.push(row.try_get::<String, _>(col)?);
    }
    cells.push(row.try_get::<f64, _>("duration_seconds")?.to_string());
    cells.push(row.try_get::<String, _>("first_response")?);
    cells.push(row.try_get::<String, _>("second_response")?);
    TranscriptRow::from_cells(&cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use listenlab_common::db::create_tables;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_tables(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn stub_then_update_round_trip() {
        let store = test_store().await;
        store.append_survey_stub("p1").await.unwrap();

        let found = store.find_survey_row("p1").await.unwrap().unwrap();
        assert!(!found.is_complete());

        let mut row = found.clone();
        row.screening = std::array::from_fn(|i| format!("a{}", i));
        row.calibration = std::array::from_fn(|i| format!("c{}", i));
        store.update_survey_row("p1", &row).await.unwrap();

        let updated = store.find_survey_row("p1").await.unwrap().unwrap();
        assert!(updated.is_complete());
        // Overwrote in place: still exactly one row
        assert_eq!(store.list_survey_rows().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_without_stub_appends() {
        let store = test_store().await;
        let row = SurveyRow::stub("ghost", Utc::now());
        store.update_survey_row("ghost", &row).await.unwrap();
        assert_eq!(store.list_survey_rows().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_participant_finds_nothing() {
        let store = test_store().await;
        assert!(store.find_survey_row("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transcripts_append_in_order() {
        let store = test_store().await;
        let now = Utc::now();
        for n in 0..3 {
            store
                .append_transcript_row(&TranscriptRow {
                    timestamp: now,
                    participant_id: "p1".to_string(),
                    item_id: format!("words/w{}.wav", n),
                    start_time: now,
                    end_time: now,
                    duration_seconds: n as f64,
                    first_response: "one".to_string(),
                    second_response: "two".to_string(),
                })
                .await
                .unwrap();
        }
        let rows = store.list_transcript_rows().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].item_id, "words/w2.wav");
    }
}
