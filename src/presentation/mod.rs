// Presentation layer - HTTP bridge the phone shell talks to
pub mod api_error;
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/readings", post(post_reading))
        .route("/permissions", put(put_permissions))
        .route("/app-state", put(put_app_state))
        .route("/sessions", get(list_sessions))
        .route(
            "/sessions/:scenario",
            post(open_session).get(session_status).delete(close_session),
        )
        .route("/sessions/:scenario/trigger", post(trigger_session))
        .route("/sessions/:scenario/siren/stop", post(stop_siren))
        .route("/sessions/:scenario/recording/start", post(start_voice_memo))
        .route("/sessions/:scenario/recording/stop", post(stop_recording))
        .route("/sessions/:scenario/fake-call", post(start_fake_call))
        .route("/sessions/:scenario/beacon", post(toggle_beacon))
        .route("/outbox", get(drain_outbox))
        .route("/outbox/stream", get(stream_outbox))
        .route("/prompts/:id/answer", post(answer_prompt))
        .route("/contacts", get(list_contacts).post(add_contact))
        .route("/checklist", get(get_checklist).post(add_checklist_item))
        .route("/checklist/:id/toggle", post(toggle_checklist_item))
        .route("/checklist/:id", delete(delete_checklist_item))
        .route("/compass", get(compass))
        .route("/signal", get(signal_log).post(record_signal))
        .route("/news", get(news_feed))
        .route("/profile/:user_id", get(get_profile).put(put_profile))
        .with_state(state)
}
