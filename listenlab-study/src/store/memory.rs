//! In-memory record store for tests and local demos

use async_trait::async_trait;
use chrono::Utc;
use listenlab_common::records::{SurveyRow, TranscriptRow};
use listenlab_common::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::PersistenceGateway;

/// Record store held entirely in memory.
///
/// `fail_next_write` and `fail_next_read` let tests simulate one transient
/// store failure to check that a failed operation never advances session
/// state or clobbers recorded answers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    surveys: Mutex<Vec<SurveyRow>>,
    transcripts: Mutex<Vec<TranscriptRow>>,
    fail_next_write: AtomicBool,
    fail_next_read: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write fail with a transient store error
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Make the next read fail with a transient store error
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::SeqCst);
    }

    fn check_injected_write_failure(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            Err(Error::Store("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_injected_read_failure(&self) -> Result<()> {
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            Err(Error::Store("injected read failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn append_survey_stub(&self, participant_id: &str) -> Result<()> {
        self.check_injected_write_failure()?;
        self.surveys
            .lock()
            .await
            .push(SurveyRow::stub(participant_id, Utc::now()));
        Ok(())
    }

    async fn find_survey_row(&self, participant_id: &str) -> Result<Option<SurveyRow>> {
        self.check_injected_read_failure()?;
        Ok(self
            .surveys
            .lock()
            .await
            .iter()
            .find(|row| row.participant_id == participant_id)
            .cloned())
    }

    async fn update_survey_row(&self, participant_id: &str, row: &SurveyRow) -> Result<()> {
        self.check_injected_write_failure()?;
        let mut surveys = self.surveys.lock().await;
        match surveys
            .iter_mut()
            .find(|existing| existing.participant_id == participant_id)
        {
            Some(existing) => *existing = row.clone(),
            None => surveys.push(row.clone()),
        }
        Ok(())
    }

    async fn append_transcript_row(&self, row: &TranscriptRow) -> Result<()> {
        self.check_injected_write_failure()?;
        self.transcripts.lock().await.push(row.clone());
        Ok(())
    }

    async fn list_survey_rows(&self) -> Result<Vec<SurveyRow>> {
        Ok(self.surveys.lock().await.clone())
    }

    async fn list_transcript_rows(&self) -> Result<Vec<TranscriptRow>> {
        Ok(self.transcripts.lock().await.clone())
    }
}
