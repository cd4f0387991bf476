// Emergency session - one open scenario screen with its detectors and handles
use crate::application::action_guard::{ActionGuard, ActionState};
use crate::application::detector::{now_ms, spawn_detector, DetectorHandle};
use crate::application::dispatcher::{DispatchOutcome, DispatchReport, Dispatcher};
use crate::application::fall_detector::FallDetector;
use crate::application::ports::{AudioDevice, DeviceActions, Dialer, PermissionGate, WellbeingPrompt};
use crate::application::shake_detector::ShakeDetector;
use crate::application::signal_source::SignalSource;
use crate::application::stillness_detector::StillnessDetector;
use crate::application::tap_detector::{LongPressDetector, MorseSosDetector, TripleTapDetector};
use crate::domain::alert::{EmergencyEvent, Scenario, Trigger};
use crate::domain::contact::Contact;
use crate::domain::device::{AppLifecycle, DeviceAction, PromptAnswer};
use crate::domain::error::{Permission, SosError};
use crate::domain::reading::ReadingKind;
use crate::infrastructure::config::{DetectorSettings, EmergencySettings};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const BEACON_PATTERN_MS: [u64; 6] = [500; 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorKind {
    Shake,
    Fall,
    TripleTap,
    MorseSos,
    LongPress,
    Stillness,
}

/// What a scenario screen does when it opens and when an emergency is detected
#[derive(Debug, Clone, Copy)]
struct ScenarioProfile {
    detectors: &'static [DetectorKind],
    requires: &'static [Permission],
    dispatch_on_open: bool,
    siren: bool,
    recording: bool,
    dial_emergency: bool,
    /// No success banner after sending
    silent: bool,
    return_route: Option<&'static str>,
    /// Route the screen moves on to by itself once open for a while
    auto_redirect: Option<&'static str>,
    voice_memo: bool,
    /// Siren stops when the app leaves the foreground
    quiet_in_background: bool,
}

impl ScenarioProfile {
    fn of(scenario: Scenario) -> Self {
        let base = ScenarioProfile {
            detectors: &[],
            requires: &[Permission::Location],
            dispatch_on_open: false,
            siren: false,
            recording: false,
            dial_emergency: false,
            silent: false,
            return_route: None,
            auto_redirect: None,
            voice_memo: false,
            quiet_in_background: false,
        };
        match scenario {
            Scenario::Home => ScenarioProfile {
                detectors: &[DetectorKind::Shake],
                ..base
            },
            Scenario::Fire => ScenarioProfile {
                dispatch_on_open: true,
                siren: true,
                silent: true,
                ..base
            },
            Scenario::ChildKidnapping => ScenarioProfile {
                requires: &[Permission::Location, Permission::Audio],
                dispatch_on_open: true,
                recording: true,
                dial_emergency: true,
                ..base
            },
            Scenario::WomenHarassment => ScenarioProfile {
                detectors: &[DetectorKind::TripleTap],
                siren: true,
                quiet_in_background: true,
                ..base
            },
            Scenario::ElderFall => ScenarioProfile {
                detectors: &[DetectorKind::Fall],
                silent: true,
                ..base
            },
            Scenario::DisguiseNews => ScenarioProfile {
                detectors: &[DetectorKind::LongPress],
                return_route: Some("/"),
                auto_redirect: Some("/home"),
                ..base
            },
            Scenario::Trekking => ScenarioProfile {
                detectors: &[DetectorKind::MorseSos, DetectorKind::Stillness],
                voice_memo: true,
                ..base
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Idle,
    Arming,
    Active,
    Dispatched,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAck {
    Queued,
    AlreadyInProgress,
    Closed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub scenario: Scenario,
    pub phase: FlowPhase,
    pub missing_permissions: Vec<Permission>,
    pub detectors: Vec<&'static str>,
    pub siren: ActionState,
    pub recording: ActionState,
    pub beacon_active: bool,
    pub prompt_pending: bool,
    pub dispatches: u32,
    pub last_outcome: Option<DispatchOutcome>,
    pub last_message: Option<String>,
    pub last_recipients: usize,
    /// Alert records the audit trail has written so far
    pub audit_records: usize,
}

/// Collaborators shared by every session
#[derive(Clone)]
pub struct SessionContext {
    pub dispatcher: Arc<Dispatcher>,
    pub signals: Arc<dyn SignalSource>,
    pub permissions: Arc<dyn PermissionGate>,
    pub audio: Arc<dyn AudioDevice>,
    pub dialer: Arc<dyn Dialer>,
    pub prompt: Arc<dyn WellbeingPrompt>,
    pub actions: Arc<dyn DeviceActions>,
    pub detectors: DetectorSettings,
    pub emergency: EmergencySettings,
}

#[derive(Debug)]
struct FlowStatus {
    phase: FlowPhase,
    missing_permissions: Vec<Permission>,
    dispatches: u32,
    last_outcome: Option<DispatchOutcome>,
    last_message: Option<String>,
    last_recipients: usize,
}

struct SessionShared {
    scenario: Scenario,
    profile: ScenarioProfile,
    ctx: SessionContext,
    dispatcher: Dispatcher,
    siren: ActionGuard,
    recording: ActionGuard,
    /// Bumped on every recording start; auto-stop timers only end their own run
    recording_run: AtomicU64,
    prompting: ActionGuard,
    audit_records: AtomicUsize,
    status: Mutex<FlowStatus>,
    timers: Mutex<Vec<JoinHandle<()>>>,
    beacon: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionShared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn notice(&self, title: &str, message: impl Into<String>) {
        self.ctx.actions.push(DeviceAction::notice(title, message));
    }

    /// Recompute the phase from what is currently running
    fn refresh_phase(&self) {
        let mut status = lock(&self.status);
        status.phase = if self.is_closed() {
            FlowPhase::Idle
        } else if self.siren.is_in_progress() || self.recording.is_in_progress() {
            FlowPhase::Active
        } else if status.last_outcome.is_some() {
            FlowPhase::Dispatched
        } else if !status.missing_permissions.is_empty() {
            FlowPhase::Degraded
        } else {
            FlowPhase::Active
        };
    }

    fn track_timer(&self, task: JoinHandle<()>) {
        let mut timers = lock(&self.timers);
        timers.retain(|t| !t.is_finished());
        timers.push(task);
    }

    async fn start_siren(&self) {
        if !self.siren.try_start() {
            tracing::debug!("{} siren already playing", self.scenario);
            return;
        }
        if let Err(e) = self.ctx.audio.start_siren().await {
            tracing::error!("{} siren failed: {}", self.scenario, e);
            self.siren.reset();
        }
    }

    async fn stop_siren(&self) -> bool {
        if !self.siren.is_in_progress() {
            return false;
        }
        if let Err(e) = self.ctx.audio.stop_siren().await {
            tracing::error!("{} stop siren failed: {}", self.scenario, e);
        }
        self.siren.reset();
        self.refresh_phase();
        true
    }

    async fn start_recording(self: &Arc<Self>) {
        if !self.ctx.permissions.permission(Permission::Audio).is_granted() {
            tracing::warn!("{} recording skipped: audio permission not granted", self.scenario);
            self.notice("Permission", SosError::PermissionDenied(Permission::Audio).notice());
            return;
        }
        if !self.recording.try_start() {
            tracing::debug!("{} recording already running", self.scenario);
            return;
        }

        let limit = self.ctx.emergency.recording_limit();
        if let Err(e) = self.ctx.audio.start_recording(limit).await {
            tracing::error!("{} recording failed: {}", self.scenario, e);
            self.recording.reset();
            self.notice("Error", "Could not start audio recording.");
            return;
        }

        self.stop_recording_after(limit);
    }

    fn stop_recording_after(self: &Arc<Self>, limit: Duration) {
        let run = self.recording_run.fetch_add(1, Ordering::AcqRel) + 1;
        let shared = Arc::clone(self);
        self.track_timer(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            if shared.recording_run.load(Ordering::Acquire) != run {
                return;
            }
            if shared.stop_recording().await {
                tracing::info!("{} recording stopped after {:?}", shared.scenario, limit);
            }
        }));
    }

    async fn start_voice_memo(self: &Arc<Self>) -> Result<bool, SosError> {
        if !self.profile.voice_memo {
            return Err(SosError::InvalidInput(format!(
                "{} has no voice memo",
                self.scenario
            )));
        }
        if !self.ctx.permissions.permission(Permission::Audio).is_granted() {
            return Err(SosError::PermissionDenied(Permission::Audio));
        }
        if !self.recording.try_start() {
            return Ok(false);
        }

        let limit = self.ctx.emergency.memo_limit();
        if let Err(e) = self.ctx.audio.start_recording(limit).await {
            tracing::error!("{} voice memo failed: {}", self.scenario, e);
            self.recording.reset();
            self.notice("Error", "Failed to start voice recording.");
            return Err(e);
        }
        tracing::info!("{} voice memo recording", self.scenario);

        self.stop_recording_after(limit);
        self.refresh_phase();
        Ok(true)
    }

    async fn stop_recording(&self) -> bool {
        if !self.recording.is_in_progress() {
            return false;
        }
        match self.ctx.audio.stop_recording().await {
            Ok(()) => {
                self.recording.finish();
                if self.profile.voice_memo {
                    self.notice("Recording Saved", "Voice memo saved.");
                }
            }
            Err(e) => {
                tracing::error!("{} stop recording failed: {}", self.scenario, e);
                self.recording.reset();
                if self.profile.voice_memo {
                    self.notice("Error", "Failed to save voice recording.");
                } else {
                    self.notice("Error", "Failed to stop recording.");
                }
            }
        }
        self.refresh_phase();
        true
    }

    async fn enter_background(&self) -> bool {
        if !self.profile.quiet_in_background {
            return false;
        }
        let stopped = self.stop_siren().await;
        if stopped {
            tracing::info!("{} siren stopped in background", self.scenario);
        }
        stopped
    }

    async fn dial_emergency(&self) {
        let url = match Contact::parse(&self.ctx.emergency.phone_number) {
            Ok(number) => number.dial_url(),
            Err(_) => {
                tracing::error!("{} no emergency number configured", self.scenario);
                return;
            }
        };
        if !self.ctx.dialer.can_open(&url).await {
            tracing::warn!("{} cannot open {}", self.scenario, url);
            return;
        }
        if let Err(e) = self.ctx.dialer.open(&url).await {
            tracing::error!("{} call failed: {}", self.scenario, e);
            self.notice("Call Failed", "Could not initiate call.");
        }
    }

    fn surface(&self, report: &DispatchReport) {
        match report.outcome {
            DispatchOutcome::Sent | DispatchOutcome::Shared => {
                for notice in &report.notices {
                    self.notice("Location", notice.clone());
                }
                if !self.profile.silent {
                    if report.outcome == DispatchOutcome::Sent {
                        self.notice("✅ SOS Sent", "SOS sent to all emergency contacts.");
                    } else {
                        self.notice("SOS Ready", "SMS is not available. Share the message with your contacts.");
                    }
                }
            }
            DispatchOutcome::NoContacts => {
                for notice in &report.notices {
                    self.notice("No Contacts", notice.clone());
                }
            }
            DispatchOutcome::Failed => {
                for notice in &report.notices {
                    self.notice("Error", notice.clone());
                }
            }
            DispatchOutcome::AlreadyInProgress => {}
        }
    }

    async fn handle_event(self: &Arc<Self>, event: EmergencyEvent) {
        if self.is_closed() {
            return;
        }
        if event.trigger == Trigger::Stationary {
            self.check_in(event);
        } else {
            self.respond(event).await;
        }
    }

    /// Ask whether the user is okay without holding up other triggers. One
    /// prompt at a time; anything but "okay" sends the alert.
    fn check_in(self: &Arc<Self>, event: EmergencyEvent) {
        if !self.prompting.try_start() {
            tracing::debug!("{} stationary prompt already showing", self.scenario);
            return;
        }
        let shared = Arc::clone(self);
        self.track_timer(tokio::spawn(async move {
            let message = format!(
                "You haven't moved in {} minutes. Are you okay?",
                shared.ctx.detectors.stationary_minutes
            );
            let answer = shared
                .ctx
                .prompt
                .ask("Stationary Alert", &message, shared.ctx.emergency.prompt_timeout())
                .await;
            shared.prompting.reset();
            if answer == PromptAnswer::Okay {
                tracing::info!("{} user confirmed they are okay", shared.scenario);
                return;
            }
            tracing::warn!("{} stationary prompt answered {:?}, sending SOS", shared.scenario, answer);
            shared.respond(event).await;
        }));
    }

    async fn respond(self: &Arc<Self>, event: EmergencyEvent) {
        if self.is_closed() {
            return;
        }

        if self.profile.siren {
            self.start_siren().await;
        }
        if self.profile.recording {
            self.start_recording().await;
        }

        let mut report = self.dispatcher.dispatch(self.scenario, &event).await;
        if report.outcome != DispatchOutcome::AlreadyInProgress {
            let mut status = lock(&self.status);
            status.dispatches += 1;
            status.last_outcome = Some(report.outcome);
            status.last_message = report.message.clone();
            status.last_recipients = report.recipients;
            if report.degraded && !status.missing_permissions.contains(&Permission::Location) {
                status.missing_permissions.push(Permission::Location);
            }
        }
        if let Some(audit) = report.audit.take() {
            let shared = Arc::clone(self);
            tokio::spawn(async move {
                match audit.await {
                    Ok(written) => {
                        shared.audit_records.fetch_add(written, Ordering::AcqRel);
                    }
                    Err(e) => tracing::error!("{} audit task failed: {}", shared.scenario, e),
                }
            });
        }
        self.surface(&report);

        if self.profile.dial_emergency {
            self.dial_emergency().await;
        }

        let delivered = matches!(report.outcome, DispatchOutcome::Sent | DispatchOutcome::Shared);
        if let (Some(route), true) = (self.profile.return_route, delivered) {
            self.ctx.actions.push(DeviceAction::Navigate {
                route: route.to_string(),
            });
        }

        self.refresh_phase();
    }
}

async fn run_event_loop(shared: Arc<SessionShared>, mut events: mpsc::Receiver<EmergencyEvent>) {
    while let Some(event) = events.recv().await {
        shared.handle_event(event).await;
    }
    tracing::debug!("{} event loop finished", shared.scenario);
}

pub struct EmergencySession {
    shared: Arc<SessionShared>,
    detectors: Vec<DetectorHandle>,
    event_loop: Option<JoinHandle<()>>,
    events: mpsc::Sender<EmergencyEvent>,
}

impl EmergencySession {
    pub fn open(scenario: Scenario, ctx: SessionContext) -> Self {
        let profile = ScenarioProfile::of(scenario);
        let missing_permissions: Vec<Permission> = profile
            .requires
            .iter()
            .copied()
            .filter(|p| !ctx.permissions.permission(*p).is_granted())
            .collect();

        if !missing_permissions.is_empty() {
            tracing::warn!("{} opened without {:?} permission", scenario, missing_permissions);
        }

        let shared = Arc::new(SessionShared {
            scenario,
            profile,
            dispatcher: ctx.dispatcher.for_session(),
            siren: ActionGuard::new(),
            recording: ActionGuard::new(),
            recording_run: AtomicU64::new(0),
            prompting: ActionGuard::new(),
            audit_records: AtomicUsize::new(0),
            status: Mutex::new(FlowStatus {
                phase: FlowPhase::Arming,
                missing_permissions,
                dispatches: 0,
                last_outcome: None,
                last_message: None,
                last_recipients: 0,
            }),
            timers: Mutex::new(Vec::new()),
            beacon: Mutex::new(None),
            closed: AtomicBool::new(false),
            ctx,
        });

        let (events_tx, events_rx) = mpsc::channel(16);
        let detectors = profile
            .detectors
            .iter()
            .map(|kind| start_detector(*kind, &shared.ctx, events_tx.clone()))
            .collect();
        let event_loop = tokio::spawn(run_event_loop(Arc::clone(&shared), events_rx));

        if profile.dispatch_on_open {
            let opened = EmergencyEvent::new(Trigger::ScreenOpened, now_ms());
            if events_tx.try_send(opened).is_err() {
                tracing::error!("{} could not queue the on-open alert", scenario);
            }
        }

        if let Some(route) = profile.auto_redirect {
            let redirect = Arc::clone(&shared);
            let after = shared.ctx.emergency.disguise_redirect();
            shared.track_timer(tokio::spawn(async move {
                tokio::time::sleep(after).await;
                if !redirect.is_closed() {
                    redirect.ctx.actions.push(DeviceAction::Navigate {
                        route: route.to_string(),
                    });
                }
            }));
        }

        shared.refresh_phase();
        tracing::info!("{} session opened", scenario);

        Self {
            shared,
            detectors,
            event_loop: Some(event_loop),
            events: events_tx,
        }
    }

    pub async fn trigger(&self, trigger: Trigger) -> TriggerAck {
        if self.shared.is_closed() {
            return TriggerAck::Closed;
        }
        if self.shared.dispatcher.is_dispatching() {
            return TriggerAck::AlreadyInProgress;
        }
        match self.events.send(EmergencyEvent::new(trigger, now_ms())).await {
            Ok(()) => TriggerAck::Queued,
            Err(_) => TriggerAck::Closed,
        }
    }

    pub async fn stop_siren(&self) -> bool {
        self.shared.stop_siren().await
    }

    pub async fn stop_recording(&self) -> bool {
        self.shared.stop_recording().await
    }

    /// `Ok(false)` when a recording is already running
    pub async fn start_voice_memo(&self) -> Result<bool, SosError> {
        self.shared.start_voice_memo().await
    }

    /// Returns whether a siren was stopped
    pub async fn app_state_changed(&self, state: AppLifecycle) -> bool {
        match state {
            AppLifecycle::Background => self.shared.enter_background().await,
            AppLifecycle::Active | AppLifecycle::Inactive => false,
        }
    }

    /// Ringtone after the configured delay, so the user can walk away "on a call"
    pub fn start_fake_call(&self) {
        let shared = Arc::clone(&self.shared);
        let delay = shared.ctx.emergency.fake_call_delay();
        self.shared.track_timer(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match shared.ctx.audio.play_ringtone().await {
                Ok(()) => shared.notice("📞 Fake Call", "Incoming call simulation started!"),
                Err(e) => {
                    tracing::error!("{} fake call failed: {}", shared.scenario, e);
                    shared.notice("Error", "Could not play fake call sound.");
                }
            }
        }));
    }

    /// Returns whether the beacon is active after the toggle
    pub fn toggle_beacon(&self) -> bool {
        let mut beacon = lock(&self.shared.beacon);
        if let Some(task) = beacon.take() {
            task.abort();
            self.shared.ctx.actions.push(DeviceAction::CancelVibration);
            return false;
        }

        let actions = Arc::clone(&self.shared.ctx.actions);
        let every = self.shared.ctx.emergency.beacon_interval();
        *beacon = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                actions.push(DeviceAction::Vibrate {
                    pattern_ms: BEACON_PATTERN_MS.to_vec(),
                    repeat: true,
                });
            }
        }));
        true
    }

    pub fn status(&self) -> SessionStatus {
        let status = lock(&self.shared.status);
        SessionStatus {
            scenario: self.shared.scenario,
            phase: status.phase,
            missing_permissions: status.missing_permissions.clone(),
            detectors: self
                .detectors
                .iter()
                .filter(|d| d.is_running())
                .map(|d| d.name())
                .collect(),
            siren: self.shared.siren.state(),
            recording: self.shared.recording.state(),
            beacon_active: lock(&self.shared.beacon).is_some(),
            prompt_pending: self.shared.prompting.is_in_progress(),
            dispatches: status.dispatches,
            last_outcome: status.last_outcome,
            last_message: status.last_message.clone(),
            last_recipients: status.last_recipients,
            audit_records: self.shared.audit_records.load(Ordering::Acquire),
        }
    }

    /// Release every listener, timer and audio handle. Nothing fires afterwards.
    pub async fn teardown(mut self) {
        self.release();
        if self.shared.siren.is_in_progress() {
            if let Err(e) = self.shared.ctx.audio.stop_siren().await {
                tracing::warn!("{} siren not stopped on teardown: {}", self.shared.scenario, e);
            }
        }
        if self.shared.recording.is_in_progress() {
            if let Err(e) = self.shared.ctx.audio.stop_recording().await {
                tracing::warn!("{} recording not stopped on teardown: {}", self.shared.scenario, e);
            }
        }
        self.shared.siren.reset();
        self.shared.recording.reset();
        self.shared.prompting.reset();
        self.shared.refresh_phase();
        tracing::info!("{} session closed", self.shared.scenario);
    }

    fn release(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        for detector in &mut self.detectors {
            detector.stop();
        }
        if let Some(event_loop) = self.event_loop.take() {
            event_loop.abort();
        }
        for timer in lock(&self.shared.timers).drain(..) {
            timer.abort();
        }
        if let Some(beacon) = lock(&self.shared.beacon).take() {
            beacon.abort();
            self.shared.ctx.actions.push(DeviceAction::CancelVibration);
        }
    }
}

impl Drop for EmergencySession {
    fn drop(&mut self) {
        if !self.shared.is_closed() {
            self.release();
        }
    }
}

fn start_detector(
    kind: DetectorKind,
    ctx: &SessionContext,
    events: mpsc::Sender<EmergencyEvent>,
) -> DetectorHandle {
    let settings = &ctx.detectors;
    match kind {
        DetectorKind::Shake => spawn_detector(
            ShakeDetector::new(settings.into()),
            ctx.signals.subscribe(ReadingKind::Acceleration),
            events,
        ),
        DetectorKind::Fall => spawn_detector(
            FallDetector::new(settings.into()),
            ctx.signals.subscribe(ReadingKind::Acceleration),
            events,
        ),
        DetectorKind::TripleTap => spawn_detector(
            TripleTapDetector::new(settings.into()),
            ctx.signals.subscribe(ReadingKind::Tap),
            events,
        ),
        DetectorKind::MorseSos => spawn_detector(
            MorseSosDetector::new(settings.into()),
            ctx.signals.subscribe(ReadingKind::Tap),
            events,
        ),
        DetectorKind::LongPress => spawn_detector(
            LongPressDetector,
            ctx.signals.subscribe(ReadingKind::Tap),
            events,
        ),
        DetectorKind::Stillness => spawn_detector(
            StillnessDetector::new(settings.into()),
            ctx.signals.subscribe(ReadingKind::Position),
            events,
        ),
    }
}
