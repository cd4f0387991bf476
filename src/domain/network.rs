// Network signal samples logged on the trekking screen
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Wifi,
    Cellular,
    None,
    #[serde(other)]
    Unknown,
}

/// One reading of the connection the phone currently has
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    #[serde(rename = "type")]
    pub kind: NetworkKind,
    /// dBm, when the platform reports it
    #[serde(default)]
    pub strength: Option<i32>,
    #[serde(default)]
    pub generation: Option<String>,
}

impl SignalSample {
    pub fn quality(&self) -> &'static str {
        let Some(strength) = self.strength else {
            return "Unknown";
        };
        let (excellent, good, fair) = match self.kind {
            NetworkKind::Wifi => (-50, -60, -70),
            _ => (-75, -85, -95),
        };
        if strength > excellent {
            "Excellent"
        } else if strength > good {
            "Good"
        } else if strength > fair {
            "Fair"
        } else {
            "Weak"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalLogEntry {
    pub time: String,
    #[serde(flatten)]
    pub sample: SignalSample,
    pub quality: &'static str,
}
