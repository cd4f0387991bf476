// Error taxonomy shared by detectors, the dispatcher and the adapters
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Location,
    Audio,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Location => write!(f, "location"),
            Permission::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }
}

#[derive(Debug, Error)]
pub enum SosError {
    #[error("{0} permission denied")]
    PermissionDenied(Permission),

    #[error("{0} is not available")]
    ResourceUnavailable(String),

    #[error("no {0} found in storage")]
    StorageMiss(String),

    #[error("remote write failed: {0}")]
    RemoteWriteFailure(String),

    #[error("sensor reading dropped: {0}")]
    SensorError(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl SosError {
    /// Plain-language description of the blocking condition, suitable for the user
    pub fn notice(&self) -> String {
        match self {
            SosError::PermissionDenied(Permission::Location) => {
                "Location permission is required to share where you are.".to_string()
            }
            SosError::PermissionDenied(Permission::Audio) => {
                "Microphone permission is required to record audio.".to_string()
            }
            SosError::ResourceUnavailable(what) => format!("{} is not available on this device.", what),
            SosError::StorageMiss(what) if what == "emergency contacts" => {
                "No emergency contacts configured. Please add one in Settings.".to_string()
            }
            SosError::StorageMiss(what) => format!("No {} saved yet.", what),
            SosError::RemoteWriteFailure(_) => "Could not reach the cloud store. Please try again.".to_string(),
            SosError::SensorError(_) => "A sensor reading could not be used.".to_string(),
            SosError::InvalidInput(message) => message.clone(),
        }
    }
}
