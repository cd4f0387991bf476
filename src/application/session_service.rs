// Session service - Registry of open scenario screens
use crate::application::session::{EmergencySession, SessionContext, SessionStatus, TriggerAck};
use crate::domain::alert::{Scenario, Trigger};
use crate::domain::device::AppLifecycle;
use crate::domain::error::SosError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// At most one session per scenario; opening an open scenario returns its state
#[derive(Clone)]
pub struct SessionService {
    context: SessionContext,
    sessions: Arc<Mutex<HashMap<Scenario, EmergencySession>>>,
}

impl SessionService {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn open(&self, scenario: Scenario) -> SessionStatus {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(scenario)
            .or_insert_with(|| EmergencySession::open(scenario, self.context.clone()))
            .status()
    }

    pub async fn close(&self, scenario: Scenario) -> bool {
        let session = self.sessions.lock().await.remove(&scenario);
        match session {
            Some(session) => {
                session.teardown().await;
                true
            }
            None => false,
        }
    }

    /// Manual SOS. The home SOS button works without the screen being open first.
    pub async fn trigger(&self, scenario: Scenario) -> TriggerAck {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .entry(scenario)
            .or_insert_with(|| EmergencySession::open(scenario, self.context.clone()));
        session.trigger(Trigger::Button).await
    }

    pub async fn status(&self, scenario: Scenario) -> Option<SessionStatus> {
        self.sessions.lock().await.get(&scenario).map(|s| s.status())
    }

    pub async fn list(&self) -> Vec<SessionStatus> {
        let sessions = self.sessions.lock().await;
        let mut statuses: Vec<SessionStatus> = sessions.values().map(|s| s.status()).collect();
        statuses.sort_by_key(|s| s.scenario.as_str());
        statuses
    }

    pub async fn stop_siren(&self, scenario: Scenario) -> Option<bool> {
        match self.sessions.lock().await.get(&scenario) {
            Some(session) => Some(session.stop_siren().await),
            None => None,
        }
    }

    pub async fn stop_recording(&self, scenario: Scenario) -> Option<bool> {
        match self.sessions.lock().await.get(&scenario) {
            Some(session) => Some(session.stop_recording().await),
            None => None,
        }
    }

    pub async fn start_voice_memo(&self, scenario: Scenario) -> Option<Result<bool, SosError>> {
        match self.sessions.lock().await.get(&scenario) {
            Some(session) => Some(session.start_voice_memo().await),
            None => None,
        }
    }

    /// Forward a foreground change to every open screen; returns how many sirens stopped
    pub async fn app_state(&self, state: AppLifecycle) -> usize {
        let sessions = self.sessions.lock().await;
        let mut stopped = 0;
        for session in sessions.values() {
            if session.app_state_changed(state).await {
                stopped += 1;
            }
        }
        tracing::debug!("app is {:?}, {} sirens stopped", state, stopped);
        stopped
    }

    pub async fn start_fake_call(&self, scenario: Scenario) -> bool {
        match self.sessions.lock().await.get(&scenario) {
            Some(session) => {
                session.start_fake_call();
                true
            }
            None => false,
        }
    }

    pub async fn toggle_beacon(&self, scenario: Scenario) -> Option<bool> {
        self.sessions
            .lock()
            .await
            .get(&scenario)
            .map(|s| s.toggle_beacon())
    }

    pub async fn close_all(&self) {
        let sessions: Vec<EmergencySession> = self.sessions.lock().await.drain().map(|(_, s)| s).collect();
        for session in sessions {
            session.teardown().await;
        }
    }
}
