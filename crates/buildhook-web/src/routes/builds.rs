use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json,
    Router,
};
use buildhook_api::{
    BuildEvent,
    BuildListener,
};
use buildhook_core::EventReport;

use crate::state::AppState;

/// The host always gets `202`; the body is `null` when the event was dropped.
type Accepted = (StatusCode, Json<Option<EventReport>>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queued", post(build_queued))
        .route("/started", post(build_started))
        .route("/finished", post(build_finished))
        .route("/interrupted", post(build_interrupted))
}

async fn build_queued(State(state): State<AppState>, Json(event): Json<BuildEvent>) -> Accepted {
    (StatusCode::ACCEPTED, Json(state.listener.build_queued(&event).await))
}

async fn build_started(State(state): State<AppState>, Json(event): Json<BuildEvent>) -> Accepted {
    (StatusCode::ACCEPTED, Json(state.listener.changes_loaded(&event).await))
}

async fn build_finished(State(state): State<AppState>, Json(event): Json<BuildEvent>) -> Accepted {
    (StatusCode::ACCEPTED, Json(state.listener.build_finished(&event).await))
}

async fn build_interrupted(
    State(state): State<AppState>, Json(event): Json<BuildEvent>,
) -> Accepted {
    (StatusCode::ACCEPTED, Json(state.listener.build_interrupted(&event).await))
}
