//! Session entry points: new participants and resumption

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::steps::{describe_step, StepDescriptor};
use crate::AppState;

use super::ApiError;

/// Response for session creation and resumption
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub participant_id: String,
    pub step: StepDescriptor,
}

/// POST /api/participant
///
/// Mints a fresh unique participant id, appends the survey stub, and opens a
/// session at the first step.
pub async fn create_participant(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.service.create_participant().await?;
    let flow = state.service.flow_for(&session.participant_id)?;

    let response = SessionResponse {
        participant_id: session.participant_id.clone(),
        step: describe_step(&flow, session.current_step)?,
    };
    state.insert_session(session).await;
    Ok(Json(response))
}

/// Resume request body
#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub participant_id: String,
}

/// POST /api/session/resume
///
/// Reconstructs the participant's position from persisted records. An id
/// with no records is rejected; it never silently becomes a new identity.
pub async fn resume_session(
    State(state): State<AppState>,
    Json(request): Json<ResumeRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let participant_id = request.participant_id.trim().to_string();
    let session = state.service.resume(&participant_id).await?;
    let flow = state.service.flow_for(&participant_id)?;

    let response = SessionResponse {
        participant_id: participant_id.clone(),
        step: describe_step(&flow, session.current_step)?,
    };
    state.insert_session(session).await;
    Ok(Json(response))
}
