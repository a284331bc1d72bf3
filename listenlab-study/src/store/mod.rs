//! Record store access
//!
//! The record store is sheet-like: append-only transcript rows plus one
//! survey row per participant that gets overwritten in place as the session
//! progresses. Calls are not auto-retried; a failed write surfaces to the
//! step that attempted it so the participant can resubmit, and the step index
//! never advances past a failed write.

use async_trait::async_trait;
use listenlab_common::records::{SurveyRow, TranscriptRow};
use listenlab_common::Result;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Append/query access to the participant record store
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Append the all-blank survey stub for a freshly minted participant id
    async fn append_survey_stub(&self, participant_id: &str) -> Result<()>;

    /// First survey row recorded for this participant, if any
    async fn find_survey_row(&self, participant_id: &str) -> Result<Option<SurveyRow>>;

    /// Overwrite this participant's survey row. When no stub is found the
    /// row is appended instead; concurrent completion attempts are last
    /// write wins and may leave duplicate rows, mirroring the sheet
    /// semantics.
    async fn update_survey_row(&self, participant_id: &str, row: &SurveyRow) -> Result<()>;

    /// Append one transcript row; never mutates existing rows
    async fn append_transcript_row(&self, row: &TranscriptRow) -> Result<()>;

    /// All survey rows, in store order
    async fn list_survey_rows(&self) -> Result<Vec<SurveyRow>>;

    /// All transcript rows, in store order
    async fn list_transcript_rows(&self) -> Result<Vec<TranscriptRow>>;
}
