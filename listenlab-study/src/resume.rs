//! Resume resolution
//!
//! Recomputes a returning participant's position purely from persisted rows.
//! The assignment is never stored: it is rederived from the participant id,
//! and "completed" is set membership on item id, so the store may return
//! rows in any order.

use listenlab_common::records::{SurveyRow, TranscriptRow};
use listenlab_common::{Error, Result};
use std::collections::HashSet;

use crate::assignment;
use crate::content::ContentCatalog;
use crate::flow::{FIXED_STEPS, SCREENING_STEP};

/// Resolves the step index a returning participant should resume at
pub struct ResumeResolver<'a> {
    catalog: &'a ContentCatalog,
}

impl<'a> ResumeResolver<'a> {
    pub fn new(catalog: &'a ContentCatalog) -> Self {
        Self { catalog }
    }

    /// Decision ladder, evaluated in order:
    /// 1. no rows at all → unknown participant;
    /// 2. survey missing or incomplete → screening;
    /// 3. complete survey, no transcripts → first item;
    /// 4. some transcripts → first assigned item without a transcript;
    /// 5. every assigned item covered → closing step.
    pub fn resolve(
        &self,
        participant_id: &str,
        survey_row: Option<&SurveyRow>,
        transcript_rows: &[TranscriptRow],
    ) -> Result<usize> {
        let completed: HashSet<&str> = transcript_rows
            .iter()
            .filter(|row| row.participant_id == participant_id)
            .map(|row| row.item_id.as_str())
            .collect();

        if survey_row.is_none() && completed.is_empty() {
            return Err(Error::UnknownParticipant(participant_id.to_string()));
        }

        match survey_row {
            Some(row) if row.is_complete() => {}
            // A participant with transcripts but no (or a partial) survey row
            // still redoes screening first.
            _ => return Ok(SCREENING_STEP),
        }

        if completed.is_empty() {
            return Ok(FIXED_STEPS);
        }

        let assigned = assignment::build(
            participant_id,
            &self.catalog.sentences,
            &self.catalog.words,
        )?;

        match assigned
            .iter()
            .position(|item| !completed.contains(item.id.as_str()))
        {
            Some(position) => Ok(FIXED_STEPS + position),
            // All assigned items covered: thank-you step
            None => Ok(FIXED_STEPS + assigned.len()),
        }
    }
}
