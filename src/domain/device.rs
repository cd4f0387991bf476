// Side effects only the phone shell can perform, queued for it to drain
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeviceAction {
    /// Generic platform share sheet with a pre-filled message
    Share { message: String },
    OpenUrl { url: String },
    PlaySiren { looping: bool },
    StopSiren,
    PlayRingtone,
    StartRecording { max_seconds: u64 },
    StopRecording,
    Vibrate { pattern_ms: Vec<u64>, repeat: bool },
    CancelVibration,
    /// "Are you okay?" dialog; the shell answers through the prompt endpoint
    Prompt {
        id: u64,
        title: String,
        message: String,
    },
    Navigate { route: String },
    Notice { title: String, message: String },
}

impl DeviceAction {
    /// Safe to drop when the shell falls behind; a later one supersedes it
    pub fn is_expendable(&self) -> bool {
        matches!(self, DeviceAction::Vibrate { .. } | DeviceAction::Notice { .. })
    }

    pub fn notice(title: impl Into<String>, message: impl Into<String>) -> Self {
        DeviceAction::Notice {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptAnswer {
    Okay,
    NeedHelp,
    NoAnswer,
}

/// Foreground state reported by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycle {
    Active,
    Background,
    Inactive,
}
