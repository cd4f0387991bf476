// HTTP request handlers
use crate::application::ports::PermissionGate;
use crate::application::profile_service::ProfileView;
use crate::application::session::{SessionStatus, TriggerAck};
use crate::application::trekking_service::CompassReading;
use crate::domain::alert::Scenario;
use crate::domain::contact::{Checklist, ChecklistItem, Contact};
use crate::domain::device::{AppLifecycle, DeviceAction, PromptAnswer};
use crate::domain::error::{Permission, PermissionState};
use crate::domain::network::{SignalLogEntry, SignalSample};
use crate::domain::news::NewsFeed;
use crate::domain::profile::PersonalInfo;
use crate::domain::reading::Reading;
use crate::infrastructure::outbox_stream::stream_from_receiver;
use crate::infrastructure::sensor_hub::PublishOutcome;
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type ApiResult<T> = Result<T, ApiError>;

fn session_not_open(scenario: Scenario) -> ApiError {
    ApiError::NotFound(format!("The {} screen is not open.", scenario))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn post_reading(
    State(state): State<Arc<AppState>>,
    Json(reading): Json<Reading>,
) -> ApiResult<Json<PublishOutcome>> {
    Ok(Json(state.hub.publish(reading)?))
}

#[derive(Debug, Deserialize)]
pub struct PermissionUpdate {
    pub location: Option<PermissionState>,
    pub audio: Option<PermissionState>,
}

#[derive(Debug, Serialize)]
pub struct PermissionReport {
    pub location: PermissionState,
    pub audio: PermissionState,
}

pub async fn put_permissions(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PermissionUpdate>,
) -> Json<PermissionReport> {
    if let Some(location) = update.location {
        state.hub.set_permission(Permission::Location, location);
    }
    if let Some(audio) = update.audio {
        state.hub.set_permission(Permission::Audio, audio);
    }
    Json(PermissionReport {
        location: state.hub.permission(Permission::Location),
        audio: state.hub.permission(Permission::Audio),
    })
}

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionStatus>> {
    Json(state.sessions.list().await)
}

pub async fn open_session(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> Json<SessionStatus> {
    Json(state.sessions.open(scenario).await)
}

pub async fn session_status(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SessionStatus>> {
    state
        .sessions
        .status(scenario)
        .await
        .map(Json)
        .ok_or_else(|| session_not_open(scenario))
}

pub async fn close_session(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    if state.sessions.close(scenario).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_open(scenario))
    }
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub result: TriggerAck,
}

pub async fn trigger_session(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    match state.sessions.trigger(scenario).await {
        TriggerAck::Queued => Ok((
            StatusCode::ACCEPTED,
            Json(TriggerResponse {
                result: TriggerAck::Queued,
            }),
        )),
        TriggerAck::AlreadyInProgress => Err(ApiError::Conflict(
            "An SOS is already being sent.".to_string(),
        )),
        TriggerAck::Closed => Err(session_not_open(scenario)),
    }
}

#[derive(Debug, Serialize)]
pub struct Stopped {
    pub stopped: bool,
}

pub async fn stop_siren(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Stopped>> {
    let stopped = state
        .sessions
        .stop_siren(scenario)
        .await
        .ok_or_else(|| session_not_open(scenario))?;
    Ok(Json(Stopped { stopped }))
}

pub async fn stop_recording(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Stopped>> {
    let stopped = state
        .sessions
        .stop_recording(scenario)
        .await
        .ok_or_else(|| session_not_open(scenario))?;
    Ok(Json(Stopped { stopped }))
}

#[derive(Debug, Serialize)]
pub struct Started {
    pub started: bool,
}

pub async fn start_voice_memo(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Started>> {
    let started = state
        .sessions
        .start_voice_memo(scenario)
        .await
        .ok_or_else(|| session_not_open(scenario))??;
    Ok(Json(Started { started }))
}

#[derive(Debug, Deserialize)]
pub struct AppStateChange {
    pub state: AppLifecycle,
}

#[derive(Debug, Serialize)]
pub struct SirensStopped {
    pub sirens_stopped: usize,
}

pub async fn put_app_state(
    State(state): State<Arc<AppState>>,
    Json(change): Json<AppStateChange>,
) -> Json<SirensStopped> {
    Json(SirensStopped {
        sirens_stopped: state.sessions.app_state(change.state).await,
    })
}

pub async fn start_fake_call(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    if state.sessions.start_fake_call(scenario).await {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(session_not_open(scenario))
    }
}

#[derive(Debug, Serialize)]
pub struct BeaconState {
    pub active: bool,
}

pub async fn toggle_beacon(
    Path(scenario): Path<Scenario>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BeaconState>> {
    let active = state
        .sessions
        .toggle_beacon(scenario)
        .await
        .ok_or_else(|| session_not_open(scenario))?;
    Ok(Json(BeaconState { active }))
}

pub async fn drain_outbox(State(state): State<Arc<AppState>>) -> Json<Vec<DeviceAction>> {
    Json(state.outbox.drain())
}

/// Live device actions (progressive delivery)
pub async fn stream_outbox(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_receiver(state.outbox.subscribe())
}

#[derive(Debug, Deserialize)]
pub struct PromptReply {
    pub answer: PromptAnswer,
}

pub async fn answer_prompt(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
    Json(reply): Json<PromptReply>,
) -> ApiResult<StatusCode> {
    if state.outbox.answer(id, reply.answer) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Prompt {} is no longer waiting.", id)))
    }
}

pub async fn list_contacts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Contact>>> {
    Ok(Json(state.contacts.list().await?))
}

#[derive(Debug, Deserialize)]
pub struct NewContact {
    pub number: String,
}

pub async fn add_contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewContact>,
) -> ApiResult<(StatusCode, Json<Vec<Contact>>)> {
    let contacts = state.contacts.add(&body.number).await?;
    Ok((StatusCode::CREATED, Json(contacts)))
}

pub async fn get_checklist(State(state): State<Arc<AppState>>) -> ApiResult<Json<Checklist>> {
    Ok(Json(state.trekking.checklist().await?))
}

#[derive(Debug, Deserialize)]
pub struct NewChecklistItem {
    pub text: String,
}

pub async fn add_checklist_item(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewChecklistItem>,
) -> ApiResult<(StatusCode, Json<ChecklistItem>)> {
    let item = state.trekking.add(&body.text).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn toggle_checklist_item(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Checklist>> {
    state
        .trekking
        .toggle(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Checklist item {} not found.", id)))
}

pub async fn delete_checklist_item(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    if state.trekking.remove(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Checklist item {} not found.", id)))
    }
}

pub async fn compass(State(state): State<Arc<AppState>>) -> ApiResult<Json<CompassReading>> {
    state
        .trekking
        .compass()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No compass reading yet.".to_string()))
}

pub async fn record_signal(
    State(state): State<Arc<AppState>>,
    Json(sample): Json<SignalSample>,
) -> Json<SignalLogEntry> {
    Json(state.trekking.record_signal(sample))
}

pub async fn signal_log(State(state): State<Arc<AppState>>) -> Json<Vec<SignalLogEntry>> {
    Json(state.trekking.signal_log())
}

pub async fn news_feed(State(state): State<Arc<AppState>>) -> Json<NewsFeed> {
    Json(state.news.feed().await)
}

pub async fn get_profile(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.load(&user_id).await?))
}

pub async fn put_profile(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(info): Json<PersonalInfo>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(state.profiles.save(&user_id, &info).await?))
}
