// Port traits for everything the emergency pipeline talks to
use crate::domain::alert::AlertRecord;
use crate::domain::contact::{Checklist, Contact};
use crate::domain::device::{DeviceAction, PromptAnswer};
use crate::domain::error::{Permission, PermissionState, SosError};
use crate::domain::news::Headline;
use crate::domain::profile::PersonalInfo;
use crate::domain::reading::Position;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current position; `PermissionDenied` or `ResourceUnavailable` when there is none
    async fn current_position(&self) -> Result<Position, SosError>;
}

pub trait PermissionGate: Send + Sync {
    fn permission(&self, permission: Permission) -> PermissionState;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// `StorageMiss` when nothing was ever saved
    async fn load_contacts(&self) -> Result<Vec<Contact>, SosError>;

    /// Replaces the whole stored list
    async fn save_contacts(&self, contacts: &[Contact]) -> Result<(), SosError>;
}

#[async_trait]
pub trait ChecklistStore: Send + Sync {
    async fn load_checklist(&self) -> Result<Checklist, SosError>;

    async fn save_checklist(&self, checklist: &Checklist) -> Result<(), SosError>;
}

#[async_trait]
pub trait SmsChannel: Send + Sync {
    async fn is_available(&self) -> bool;

    /// One message to every recipient at once
    async fn send(&self, recipients: &[Contact], message: &str) -> Result<(), SosError>;
}

#[async_trait]
pub trait ShareChannel: Send + Sync {
    async fn share(&self, message: &str) -> Result<(), SosError>;
}

/// Append-only remote alert log
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn append(&self, record: &AlertRecord) -> Result<(), SosError>;
}

#[async_trait]
pub trait Dialer: Send + Sync {
    async fn can_open(&self, url: &str) -> bool;

    async fn open(&self, url: &str) -> Result<(), SosError>;
}

#[async_trait]
pub trait AudioDevice: Send + Sync {
    async fn start_siren(&self) -> Result<(), SosError>;

    async fn stop_siren(&self) -> Result<(), SosError>;

    async fn play_ringtone(&self) -> Result<(), SosError>;

    async fn start_recording(&self, limit: Duration) -> Result<(), SosError>;

    async fn stop_recording(&self) -> Result<(), SosError>;
}

#[async_trait]
pub trait WellbeingPrompt: Send + Sync {
    /// Ask the user whether they are okay; `NoAnswer` once `timeout` elapses
    async fn ask(&self, title: &str, message: &str, timeout: Duration) -> PromptAnswer;
}

/// Fire-and-forget device effects: notices, navigation, vibration
pub trait DeviceActions: Send + Sync {
    fn push(&self, action: DeviceAction);
}

pub trait HeadingSource: Send + Sync {
    /// Last compass heading in degrees, if the magnetometer has reported
    fn last_heading(&self) -> Option<f64>;
}

#[async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn top_headlines(&self) -> Result<Vec<Headline>, SosError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `StorageMiss` when the user never saved a profile
    async fn load_profile(&self, user_id: &str) -> Result<PersonalInfo, SosError>;

    /// Replaces the whole stored profile
    async fn save_profile(&self, user_id: &str, info: &PersonalInfo) -> Result<(), SosError>;
}
