// Emergency events and the audit records written for them
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAPS_BASE_URL: &str = "https://maps.google.com/?q=";

/// Link the contact can open to see where the alert came from
pub fn maps_link(latitude: f64, longitude: f64) -> String {
    format!("{}{},{}", MAPS_BASE_URL, latitude, longitude)
}

/// The screen an emergency flow belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Home,
    Fire,
    ChildKidnapping,
    WomenHarassment,
    ElderFall,
    DisguiseNews,
    Trekking,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Home => "home",
            Scenario::Fire => "fire",
            Scenario::ChildKidnapping => "child_kidnapping",
            Scenario::WomenHarassment => "women_harassment",
            Scenario::ElderFall => "elder_fall",
            Scenario::DisguiseNews => "disguise_news",
            Scenario::Trekking => "trekking",
        }
    }

    /// Value stored in the `method` field of every alert record
    pub fn method(&self) -> &'static str {
        match self {
            Scenario::Home => "shake or button",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What made a detector (or the user) decide there is an emergency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Button,
    Shake,
    Fall,
    TripleTap,
    MorseSos,
    LongPress,
    Stationary,
    ScreenOpened,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub trigger: Trigger,
    pub detected_at_ms: u64,
}

impl EmergencyEvent {
    pub fn new(trigger: Trigger, detected_at_ms: u64) -> Self {
        Self {
            trigger,
            detected_at_ms,
        }
    }
}

/// One document in the `sos_alerts` log, written once per contact per dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub contact: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
