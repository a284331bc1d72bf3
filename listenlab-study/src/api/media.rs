//! Audio delivery for item steps

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use listenlab_common::Error;

use crate::content::download_blob_with_retry;
use crate::flow::Step;
use crate::AppState;

use super::ApiError;

/// GET /api/session/:pid/item/:step/audio
///
/// Streams the item's audio bytes. Only available once the step has been
/// revealed, so the start timestamp is always recorded before first
/// playback. Downloads retry once on transient store failure.
pub async fn item_audio(
    State(state): State<AppState>,
    Path((participant_id, step_index)): Path<(String, usize)>,
) -> Result<Response, ApiError> {
    let flow = state.service.flow_for(&participant_id)?;

    let handle = state.session(&participant_id).await?;
    let revealed = handle.lock().await.revealed.contains(&step_index);
    if !revealed {
        return Err(ApiError(Error::Validation(format!(
            "step {} has not been revealed",
            step_index
        ))));
    }

    let item = match flow.steps().get(step_index) {
        Some(Step::Item { item, .. }) => item.clone(),
        _ => {
            return Err(ApiError(Error::NotFound(format!(
                "no item at step {}",
                step_index
            ))))
        }
    };

    let bytes = download_blob_with_retry(state.content.as_ref(), &item.blob_ref).await?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}
