//! listenlab-study library - audio transcription study service
//!
//! Deterministically assigns each participant a stratified playlist of audio
//! stimuli and drives a linear, resumable session over it, recording per-step
//! timing and free-text responses.

use axum::routing::{get, post};
use axum::Router;
use listenlab_common::Error;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod assignment;
pub mod content;
pub mod flow;
pub mod resume;
pub mod session;
pub mod store;

use content::ContentStore;
use flow::SessionState;
use session::SessionService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService>,
    pub content: Arc<dyn ContentStore>,
    /// Open sessions, one per participant, process-local. Each session has
    /// its own lock; the outer lock only guards the map itself.
    pub sessions: Arc<Mutex<HashMap<String, Arc<Mutex<SessionState>>>>>,
}

impl AppState {
    pub fn new(service: Arc<SessionService>, content: Arc<dyn ContentStore>) -> Self {
        Self {
            service,
            content,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a freshly opened session, replacing any previous one for the
    /// same participant
    pub async fn insert_session(&self, session: SessionState) {
        let participant_id = session.participant_id.clone();
        self.sessions
            .lock()
            .await
            .insert(participant_id, Arc::new(Mutex::new(session)));
    }

    /// Handle to one participant's open session. The map lock is released
    /// before the handle is returned, so one participant's in-flight request
    /// never blocks another's.
    pub async fn session(&self, participant_id: &str) -> Result<Arc<Mutex<SessionState>>, Error> {
        self.sessions
            .lock()
            .await
            .get(participant_id)
            .cloned()
            .ok_or_else(|| Error::UnknownParticipant(participant_id.to_string()))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/participant", post(api::create_participant))
        .route("/api/session/resume", post(api::resume_session))
        .route("/api/session/:pid/steps", get(api::list_steps))
        .route("/api/session/:pid/current", get(api::current_step))
        .route("/api/session/:pid/advance", post(api::confirm_step))
        .route("/api/session/:pid/screening", post(api::submit_screening))
        .route("/api/session/:pid/calibration", post(api::submit_calibration))
        .route("/api/session/:pid/item/:step/reveal", post(api::reveal_item))
        .route(
            "/api/session/:pid/item/:step/responses",
            post(api::submit_item_responses),
        )
        .route("/api/session/:pid/item/:step/audio", get(api::item_audio))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
