// In-memory fakes of every port, shared by the application tests
use crate::application::dispatcher::DispatchChannels;
use crate::application::ports::{
    AudioDevice, ChecklistStore, ContactStore, DeviceActions, Dialer, EventSink, LocationProvider,
    PermissionGate, ProfileStore, ShareChannel, SmsChannel, WellbeingPrompt,
};
use crate::domain::alert::AlertRecord;
use crate::domain::contact::{Checklist, Contact};
use crate::domain::device::{DeviceAction, PromptAnswer};
use crate::domain::error::{Permission, PermissionState, SosError};
use crate::domain::profile::PersonalInfo;
use crate::domain::reading::Position;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeLocation {
    position: Mutex<Option<Position>>,
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn current_position(&self) -> Result<Position, SosError> {
        self.position
            .lock()
            .unwrap()
            .ok_or(SosError::PermissionDenied(Permission::Location))
    }
}

#[derive(Default)]
pub struct FakeStore {
    contacts: Mutex<Option<Vec<Contact>>>,
    checklist: Mutex<Option<Checklist>>,
}

impl FakeStore {
    pub fn contacts(&self) -> Option<Vec<Contact>> {
        self.contacts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContactStore for FakeStore {
    async fn load_contacts(&self) -> Result<Vec<Contact>, SosError> {
        self.contacts
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SosError::StorageMiss("emergency contacts".to_string()))
    }

    async fn save_contacts(&self, contacts: &[Contact]) -> Result<(), SosError> {
        *self.contacts.lock().unwrap() = Some(contacts.to_vec());
        Ok(())
    }
}

#[async_trait]
impl ChecklistStore for FakeStore {
    async fn load_checklist(&self) -> Result<Checklist, SosError> {
        self.checklist
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SosError::StorageMiss("checklist".to_string()))
    }

    async fn save_checklist(&self, checklist: &Checklist) -> Result<(), SosError> {
        *self.checklist.lock().unwrap() = Some(checklist.clone());
        Ok(())
    }
}

/// Store that yields between reading and returning, so unserialized
/// read-modify-write sequences interleave and lose updates
#[derive(Default)]
pub struct YieldingStore {
    inner: FakeStore,
}

#[async_trait]
impl ContactStore for YieldingStore {
    async fn load_contacts(&self) -> Result<Vec<Contact>, SosError> {
        let contacts = self.inner.load_contacts().await;
        tokio::task::yield_now().await;
        contacts
    }

    async fn save_contacts(&self, contacts: &[Contact]) -> Result<(), SosError> {
        tokio::task::yield_now().await;
        self.inner.save_contacts(contacts).await
    }
}

#[async_trait]
impl ChecklistStore for YieldingStore {
    async fn load_checklist(&self) -> Result<Checklist, SosError> {
        let checklist = self.inner.load_checklist().await;
        tokio::task::yield_now().await;
        checklist
    }

    async fn save_checklist(&self, checklist: &Checklist) -> Result<(), SosError> {
        tokio::task::yield_now().await;
        self.inner.save_checklist(checklist).await
    }
}

#[derive(Default)]
pub struct FakeProfiles {
    profiles: Mutex<HashMap<String, PersonalInfo>>,
}

#[async_trait]
impl ProfileStore for FakeProfiles {
    async fn load_profile(&self, user_id: &str) -> Result<PersonalInfo, SosError> {
        self.profiles
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| SosError::StorageMiss("personal information".to_string()))
    }

    async fn save_profile(&self, user_id: &str, info: &PersonalInfo) -> Result<(), SosError> {
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id.to_string(), info.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSms {
    available: AtomicBool,
    fail: AtomicBool,
    sent: Mutex<Vec<(Vec<String>, String)>>,
}

impl FakeSms {
    pub fn sent(&self) -> Vec<(Vec<String>, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsChannel for FakeSms {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn send(&self, recipients: &[Contact], message: &str) -> Result<(), SosError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SosError::ResourceUnavailable("SMS".to_string()));
        }
        let numbers = recipients.iter().map(|c| c.as_str().to_string()).collect();
        self.sent.lock().unwrap().push((numbers, message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeShare {
    shared: Mutex<Vec<String>>,
}

impl FakeShare {
    pub fn shared(&self) -> Vec<String> {
        self.shared.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShareChannel for FakeShare {
    async fn share(&self, message: &str) -> Result<(), SosError> {
        self.shared.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSink {
    fail: AtomicBool,
    records: Mutex<Vec<AlertRecord>>,
}

impl FakeSink {
    pub fn records(&self) -> Vec<AlertRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for FakeSink {
    async fn append(&self, record: &AlertRecord) -> Result<(), SosError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SosError::RemoteWriteFailure("offline".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Phone shell stand-in: records every effect, answers prompts with a fixed reply
pub struct FakeDevice {
    actions: Mutex<Vec<DeviceAction>>,
    permissions: Mutex<HashMap<Permission, PermissionState>>,
    answer: Mutex<PromptAnswer>,
    unanswered: AtomicBool,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            permissions: Mutex::new(HashMap::new()),
            answer: Mutex::new(PromptAnswer::NoAnswer),
            unanswered: AtomicBool::new(false),
        }
    }
}

impl FakeDevice {
    pub fn actions(&self) -> Vec<DeviceAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn set_permission(&self, permission: Permission, state: PermissionState) {
        self.permissions.lock().unwrap().insert(permission, state);
    }

    pub fn answer_prompts_with(&self, answer: PromptAnswer) {
        *self.answer.lock().unwrap() = answer;
    }

    /// Prompts stay on screen until they time out
    pub fn leave_prompts_unanswered(&self) {
        self.unanswered.store(true, Ordering::SeqCst);
    }
}

impl DeviceActions for FakeDevice {
    fn push(&self, action: DeviceAction) {
        self.actions.lock().unwrap().push(action);
    }
}

impl PermissionGate for FakeDevice {
    fn permission(&self, permission: Permission) -> PermissionState {
        self.permissions
            .lock()
            .unwrap()
            .get(&permission)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AudioDevice for FakeDevice {
    async fn start_siren(&self) -> Result<(), SosError> {
        self.push(DeviceAction::PlaySiren { looping: true });
        Ok(())
    }

    async fn stop_siren(&self) -> Result<(), SosError> {
        self.push(DeviceAction::StopSiren);
        Ok(())
    }

    async fn play_ringtone(&self) -> Result<(), SosError> {
        self.push(DeviceAction::PlayRingtone);
        Ok(())
    }

    async fn start_recording(&self, limit: Duration) -> Result<(), SosError> {
        self.push(DeviceAction::StartRecording {
            max_seconds: limit.as_secs(),
        });
        Ok(())
    }

    async fn stop_recording(&self) -> Result<(), SosError> {
        self.push(DeviceAction::StopRecording);
        Ok(())
    }
}

#[async_trait]
impl Dialer for FakeDevice {
    async fn can_open(&self, url: &str) -> bool {
        url.starts_with("tel:")
    }

    async fn open(&self, url: &str) -> Result<(), SosError> {
        self.push(DeviceAction::OpenUrl {
            url: url.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl WellbeingPrompt for FakeDevice {
    async fn ask(&self, title: &str, message: &str, timeout: Duration) -> PromptAnswer {
        self.push(DeviceAction::Prompt {
            id: 0,
            title: title.to_string(),
            message: message.to_string(),
        });
        if self.unanswered.load(Ordering::SeqCst) {
            tokio::time::sleep(timeout).await;
            return PromptAnswer::NoAnswer;
        }
        *self.answer.lock().unwrap()
    }
}

pub struct Fakes {
    pub location: Arc<FakeLocation>,
    pub store: Arc<FakeStore>,
    pub sms: Arc<FakeSms>,
    pub share: Arc<FakeShare>,
    pub sink: Arc<FakeSink>,
    pub device: Arc<FakeDevice>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            location: Arc::new(FakeLocation::default()),
            store: Arc::new(FakeStore::default()),
            sms: Arc::new(FakeSms::default()),
            share: Arc::new(FakeShare::default()),
            sink: Arc::new(FakeSink::default()),
            device: Arc::new(FakeDevice::default()),
        }
    }

    pub fn with_position(self, position: Position) -> Self {
        *self.location.position.lock().unwrap() = Some(position);
        self
    }

    pub fn with_contacts(self, numbers: &[&str]) -> Self {
        let contacts = numbers.iter().map(|n| Contact::parse(n).unwrap()).collect();
        *self.store.contacts.lock().unwrap() = Some(contacts);
        self
    }

    pub fn with_sms(self, available: bool) -> Self {
        self.sms.available.store(available, Ordering::SeqCst);
        self
    }

    pub fn with_failing_sms(self) -> Self {
        self.sms.available.store(true, Ordering::SeqCst);
        self.sms.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_failing_sink(self) -> Self {
        self.sink.fail.store(true, Ordering::SeqCst);
        self
    }
}

pub fn fake_channels(fakes: &Fakes) -> DispatchChannels {
    DispatchChannels {
        location: fakes.location.clone(),
        contacts: fakes.store.clone(),
        sms: fakes.sms.clone(),
        share: fakes.share.clone(),
        sink: fakes.sink.clone(),
    }
}
