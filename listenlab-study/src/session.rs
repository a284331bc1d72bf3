//! Session orchestration
//!
//! `SessionService` ties the catalog, the assignment builder, the flow
//! controller and the record store together. Every operation takes the
//! session state explicitly and mutates it only after the store write it
//! depends on has succeeded, so a failed write leaves the session exactly
//! where it was.

use chrono::{DateTime, Utc};
use listenlab_common::records::{
    SurveyRow, TranscriptRow, CALIBRATION_ANSWERS, SCREENING_ANSWERS,
};
use listenlab_common::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::assignment;
use crate::content::ContentCatalog;
use crate::flow::{
    validate_item_responses, SessionFlow, SessionState, Step, CALIBRATION_STEP, SCREENING_STEP,
};
use crate::resume::ResumeResolver;
use crate::store::PersistenceGateway;

/// Length of generated participant tokens
const PARTICIPANT_ID_LEN: usize = 8;

/// Attempts before giving up on minting a unique token
const MAX_ID_ATTEMPTS: usize = 32;

/// Result of completing one item step
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item_id: String,
    pub duration_seconds: f64,
    pub next_step: usize,
}

/// Orchestrates participant sessions over injected collaborators
pub struct SessionService {
    catalog: Arc<ContentCatalog>,
    store: Arc<dyn PersistenceGateway>,
}

impl SessionService {
    pub fn new(catalog: Arc<ContentCatalog>, store: Arc<dyn PersistenceGateway>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    /// Rebuild the deterministic step list for one participant
    pub fn flow_for(&self, participant_id: &str) -> Result<SessionFlow> {
        let items = assignment::build(
            participant_id,
            &self.catalog.sentences,
            &self.catalog.words,
        )?;
        Ok(SessionFlow::new(items))
    }

    /// Mint a fresh participant id, append its survey stub, and open a
    /// session at the first step.
    ///
    /// The id is checked for uniqueness against every id ever recorded, in
    /// either table, before the stub is written.
    pub async fn create_participant(&self) -> Result<SessionState> {
        let mut known: HashSet<String> = HashSet::new();
        for row in self.store.list_survey_rows().await? {
            known.insert(row.participant_id);
        }
        for row in self.store.list_transcript_rows().await? {
            known.insert(row.participant_id);
        }

        let mut participant_id = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(PARTICIPANT_ID_LEN)
                .collect();
            if !known.contains(&candidate) {
                participant_id = Some(candidate);
                break;
            }
        }
        let participant_id = participant_id
            .ok_or_else(|| Error::Internal("could not mint a unique participant id".to_string()))?;

        self.store.append_survey_stub(&participant_id).await?;
        info!("Created participant {}", participant_id);
        Ok(SessionState::new(&participant_id))
    }

    /// Reopen a session for a returning participant at the resolved step.
    ///
    /// An id with no recorded rows is an unknown participant; a new identity
    /// is never minted here.
    pub async fn resume(&self, participant_id: &str) -> Result<SessionState> {
        let survey_row = self.store.find_survey_row(participant_id).await?;
        let transcript_rows = self.store.list_transcript_rows().await?;

        let resolver = ResumeResolver::new(&self.catalog);
        let step = resolver.resolve(participant_id, survey_row.as_ref(), &transcript_rows)?;
        info!("Resumed participant {} at step {}", participant_id, step);
        Ok(SessionState::at_step(participant_id, step))
    }

    /// Confirm an instruction step (intro, calibration instructions, task
    /// instructions). Form steps have their own submission operations and
    /// cannot be skipped this way.
    pub fn confirm_step(&self, flow: &SessionFlow, state: &mut SessionState) -> Result<usize> {
        match flow.current(state)? {
            Step::Intro | Step::CalibrationInstructions | Step::TaskInstructions => {
                flow.advance(state)?;
                Ok(state.current_step)
            }
            other => Err(Error::Validation(format!(
                "step {:?} requires its own submission",
                other
            ))),
        }
    }

    /// Submit screening answers and advance past the screening step
    pub async fn submit_screening(
        &self,
        flow: &SessionFlow,
        state: &mut SessionState,
        answers: &[String],
    ) -> Result<usize> {
        if state.current_step != SCREENING_STEP {
            return Err(Error::Validation(format!(
                "screening submitted at step {}",
                state.current_step
            )));
        }
        let answers = required_answers::<SCREENING_ANSWERS>(answers, "screening")?;

        let mut row = self.survey_row_or_stub(&state.participant_id).await?;
        row.timestamp = Utc::now();
        row.screening = answers;
        self.store
            .update_survey_row(&state.participant_id, &row)
            .await?;

        flow.advance(state)?;
        Ok(state.current_step)
    }

    /// Submit calibration-check answers and advance past the calibration
    /// step. This completes the survey row.
    pub async fn submit_calibration(
        &self,
        flow: &SessionFlow,
        state: &mut SessionState,
        answers: &[String],
    ) -> Result<usize> {
        if state.current_step != CALIBRATION_STEP {
            return Err(Error::Validation(format!(
                "calibration submitted at step {}",
                state.current_step
            )));
        }
        let answers = required_answers::<CALIBRATION_ANSWERS>(answers, "calibration")?;

        let mut row = self.survey_row_or_stub(&state.participant_id).await?;
        row.timestamp = Utc::now();
        row.calibration = answers;
        self.store
            .update_survey_row(&state.participant_id, &row)
            .await?;

        flow.advance(state)?;
        Ok(state.current_step)
    }

    /// Reveal the current item's audio, recording its start timestamp once
    pub fn reveal_item(
        &self,
        flow: &SessionFlow,
        state: &mut SessionState,
        step_index: usize,
    ) -> Result<DateTime<Utc>> {
        flow.record_item_reveal(state, step_index, Utc::now())
    }

    /// Submit both responses for the current item step: validates input,
    /// appends the transcript row, then advances. Nothing is partially
    /// committed; a store failure leaves the step index unchanged.
    pub async fn submit_item(
        &self,
        flow: &SessionFlow,
        state: &mut SessionState,
        step_index: usize,
        first: &str,
        second: &str,
    ) -> Result<ItemOutcome> {
        let item = flow.expect_item_step(state, step_index)?;
        validate_item_responses(first, second)?;

        let start_time = *state.item_started_at.get(&step_index).ok_or_else(|| {
            Error::Validation("reveal the audio before submitting responses".to_string())
        })?;
        let end_time = Utc::now();
        let duration_seconds =
            (end_time - start_time).num_milliseconds().max(0) as f64 / 1000.0;

        let row = TranscriptRow {
            timestamp: end_time,
            participant_id: state.participant_id.clone(),
            item_id: item.id.clone(),
            start_time,
            end_time,
            duration_seconds,
            first_response: first.to_string(),
            second_response: second.to_string(),
        };
        self.store.append_transcript_row(&row).await?;

        flow.advance(state)?;
        Ok(ItemOutcome {
            item_id: row.item_id,
            duration_seconds,
            next_step: state.current_step,
        })
    }

    /// Current survey row, or a fresh stub when the lookup finds none (the
    /// duplicate-row case the store semantics tolerate). A failed lookup is
    /// surfaced, never papered over with a blank row.
    async fn survey_row_or_stub(&self, participant_id: &str) -> Result<SurveyRow> {
        Ok(match self.store.find_survey_row(participant_id).await? {
            Some(row) => row,
            None => SurveyRow::stub(participant_id, Utc::now()),
        })
    }
}

/// Require exactly N non-blank answers
fn required_answers<const N: usize>(answers: &[String], what: &str) -> Result<[String; N]> {
    if answers.len() != N {
        return Err(Error::Validation(format!(
            "{} expects {} answers, got {}",
            what,
            N,
            answers.len()
        )));
    }
    for (i, answer) in answers.iter().enumerate() {
        if answer.trim().is_empty() {
            return Err(Error::Validation(format!(
                "{} answer {} must not be empty",
                what,
                i + 1
            )));
        }
    }
    let mut out: [String; N] = std::array::from_fn(|_| String::new());
    out.clone_from_slice(answers);
    Ok(out)
}
