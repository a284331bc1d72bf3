//! Step progression handlers

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use listenlab_common::Error;
use serde::{Deserialize, Serialize};

use crate::flow::{SessionFlow, Step};
use crate::AppState;

use super::ApiError;

/// One step as reported to the presentation layer
#[derive(Debug, Serialize)]
pub struct StepDescriptor {
    pub index: usize,
    pub total: usize,
    #[serde(flatten)]
    pub step: Step,
}

/// Describe one step of a flow by index
pub fn describe_step(flow: &SessionFlow, index: usize) -> Result<StepDescriptor, Error> {
    let step = flow
        .steps()
        .get(index)
        .ok_or_else(|| Error::Internal(format!("step index {} out of range", index)))?;
    Ok(StepDescriptor {
        index,
        total: flow.len(),
        step: step.clone(),
    })
}

/// GET /api/session/:pid/steps
pub async fn list_steps(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> Result<Json<Vec<StepDescriptor>>, ApiError> {
    state.session(&participant_id).await?;
    let flow = state.service.flow_for(&participant_id)?;
    let steps = (0..flow.len())
        .map(|i| describe_step(&flow, i))
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(Json(steps))
}

/// GET /api/session/:pid/current
pub async fn current_step(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> Result<Json<StepDescriptor>, ApiError> {
    let flow = state.service.flow_for(&participant_id)?;
    let handle = state.session(&participant_id).await?;
    let session = handle.lock().await;
    Ok(Json(describe_step(&flow, session.current_step)?))
}

/// POST /api/session/:pid/advance
///
/// Explicit confirmation of an instruction step. Form steps are rejected
/// here; they advance through their own submission endpoints.
pub async fn confirm_step(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> Result<Json<StepDescriptor>, ApiError> {
    let flow = state.service.flow_for(&participant_id)?;
    let handle = state.session(&participant_id).await?;
    let mut session = handle.lock().await;
    let next = state.service.confirm_step(&flow, &mut session)?;
    Ok(Json(describe_step(&flow, next)?))
}

/// Screening form body: six answers in question order
#[derive(Debug, Deserialize)]
pub struct ScreeningRequest {
    pub answers: Vec<String>,
}

/// POST /api/session/:pid/screening
pub async fn submit_screening(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
    Json(request): Json<ScreeningRequest>,
) -> Result<Json<StepDescriptor>, ApiError> {
    let flow = state.service.flow_for(&participant_id)?;
    let handle = state.session(&participant_id).await?;
    let mut session = handle.lock().await;
    let next = state
        .service
        .submit_screening(&flow, &mut session, &request.answers)
        .await?;
    Ok(Json(describe_step(&flow, next)?))
}

/// Calibration form body: four answers in question order
#[derive(Debug, Deserialize)]
pub struct CalibrationRequest {
    pub answers: Vec<String>,
}

/// POST /api/session/:pid/calibration
pub async fn submit_calibration(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
    Json(request): Json<CalibrationRequest>,
) -> Result<Json<StepDescriptor>, ApiError> {
    let flow = state.service.flow_for(&participant_id)?;
    let handle = state.session(&participant_id).await?;
    let mut session = handle.lock().await;
    let next = state
        .service
        .submit_calibration(&flow, &mut session, &request.answers)
        .await?;
    Ok(Json(describe_step(&flow, next)?))
}

/// Reveal response: the (idempotent) start timestamp of the item step
#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub step_index: usize,
    pub started_at: DateTime<Utc>,
}

/// POST /api/session/:pid/item/:step/reveal
pub async fn reveal_item(
    State(state): State<AppState>,
    Path((participant_id, step_index)): Path<(String, usize)>,
) -> Result<Json<RevealResponse>, ApiError> {
    let flow = state.service.flow_for(&participant_id)?;
    let handle = state.session(&participant_id).await?;
    let mut session = handle.lock().await;
    let started_at = state.service.reveal_item(&flow, &mut session, step_index)?;
    Ok(Json(RevealResponse {
        step_index,
        started_at,
    }))
}

/// Item responses body
#[derive(Debug, Deserialize)]
pub struct ItemResponsesRequest {
    pub first: String,
    pub second: String,
}

/// Item completion response
#[derive(Debug, Serialize)]
pub struct ItemResponsesResponse {
    pub item_id: String,
    pub duration_seconds: f64,
    pub next: StepDescriptor,
}

/// POST /api/session/:pid/item/:step/responses
pub async fn submit_item_responses(
    State(state): State<AppState>,
    Path((participant_id, step_index)): Path<(String, usize)>,
    Json(request): Json<ItemResponsesRequest>,
) -> Result<Json<ItemResponsesResponse>, ApiError> {
    let flow = state.service.flow_for(&participant_id)?;
    let handle = state.session(&participant_id).await?;
    let mut session = handle.lock().await;
    let outcome = state
        .service
        .submit_item(&flow, &mut session, step_index, &request.first, &request.second)
        .await?;
    Ok(Json(ItemResponsesResponse {
        item_id: outcome.item_id,
        duration_seconds: outcome.duration_seconds,
        next: describe_step(&flow, outcome.next_step)?,
    }))
}
