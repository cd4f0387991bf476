use crate::domain::alert::Scenario;
use crate::domain::reading::SamplingIntervals;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub firestore: FirestoreSettings,
    #[serde(default)]
    pub sms_gateway: Option<SmsGatewaySettings>,
    pub emergency: EmergencySettings,
    #[serde(default)]
    pub detectors: DetectorSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub messages: MessageTemplates,
    #[serde(default)]
    pub news: NewsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FirestoreSettings {
    #[serde(default = "default_firestore_base_url")]
    pub base_url: String,
    pub project_id: String,
    pub api_key: String,
    #[serde(default = "default_alert_collection")]
    pub collection: String,
    #[serde(default = "default_users_collection")]
    pub users_collection: String,
}

fn default_firestore_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_alert_collection() -> String {
    "sos_alerts".to_string()
}

fn default_users_collection() -> String {
    "users".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmsGatewaySettings {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmergencySettings {
    /// Number dialled by the child-kidnapping flow
    pub phone_number: String,
    #[serde(default = "default_recording_seconds")]
    pub recording_seconds: u64,
    #[serde(default = "default_fake_call_delay_seconds")]
    pub fake_call_delay_seconds: u64,
    #[serde(default = "default_beacon_interval_seconds")]
    pub beacon_interval_seconds: u64,
    #[serde(default = "default_prompt_timeout_seconds")]
    pub prompt_timeout_seconds: u64,
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
    /// Cap on a trekking voice memo
    #[serde(default = "default_memo_max_seconds")]
    pub memo_max_seconds: u64,
    /// The disguise screen hands over to the home screen after this long
    #[serde(default = "default_disguise_redirect_seconds")]
    pub disguise_redirect_seconds: u64,
}

fn default_recording_seconds() -> u64 {
    30
}

fn default_fake_call_delay_seconds() -> u64 {
    10
}

fn default_beacon_interval_seconds() -> u64 {
    3
}

fn default_prompt_timeout_seconds() -> u64 {
    60
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_memo_max_seconds() -> u64 {
    600
}

fn default_disguise_redirect_seconds() -> u64 {
    7
}

impl EmergencySettings {
    pub fn recording_limit(&self) -> Duration {
        Duration::from_secs(self.recording_seconds)
    }

    pub fn fake_call_delay(&self) -> Duration {
        Duration::from_secs(self.fake_call_delay_seconds)
    }

    pub fn beacon_interval(&self) -> Duration {
        Duration::from_secs(self.beacon_interval_seconds)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_seconds)
    }

    pub fn memo_limit(&self) -> Duration {
        Duration::from_secs(self.memo_max_seconds)
    }

    pub fn disguise_redirect(&self) -> Duration {
        Duration::from_secs(self.disguise_redirect_seconds)
    }
}

/// Headline feed shown on the disguise screen
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NewsSettings {
    pub base_url: String,
    /// Without a key the canned headlines are served
    pub api_key: String,
    pub country: String,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org".to_string(),
            api_key: String::new(),
            country: "us".to_string(),
        }
    }
}

/// Thresholds and windows used by the detectors
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorSettings {
    pub shake_threshold: f64,
    pub shake_cooldown_ms: u64,
    pub fall_movement_threshold: f64,
    pub fall_stillness_threshold: f64,
    pub fall_check_delay_ms: u64,
    pub tap_idle_timeout_ms: u64,
    pub triple_tap_count: u32,
    pub morse_short_max_ms: u64,
    pub morse_long_min_ms: u64,
    pub stationary_minutes: u64,
    pub stationary_check_seconds: u64,
    pub movement_distance_m: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            shake_threshold: 2.0,
            shake_cooldown_ms: 2000,
            fall_movement_threshold: 2.5,
            fall_stillness_threshold: 0.3,
            fall_check_delay_ms: 1500,
            tap_idle_timeout_ms: 1000,
            triple_tap_count: 3,
            morse_short_max_ms: 500,
            morse_long_min_ms: 1000,
            stationary_minutes: 30,
            stationary_check_seconds: 60,
            movement_distance_m: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingSettings {
    pub acceleration_ms: u64,
    pub magnetic_ms: u64,
    pub position_seconds: u64,
    pub position_distance_m: f64,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        let intervals = SamplingIntervals::default();
        Self {
            acceleration_ms: intervals.acceleration.as_millis() as u64,
            magnetic_ms: intervals.magnetic.as_millis() as u64,
            position_seconds: intervals.position.as_secs(),
            position_distance_m: intervals.position_distance_m,
        }
    }
}

impl SamplingSettings {
    pub fn intervals(&self) -> SamplingIntervals {
        SamplingIntervals {
            acceleration: Duration::from_millis(self.acceleration_ms),
            magnetic: Duration::from_millis(self.magnetic_ms),
            position: Duration::from_secs(self.position_seconds),
            position_distance_m: self.position_distance_m,
        }
    }
}

/// Distress message per scenario; `${maps_url}` is replaced at dispatch time
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MessageTemplates {
    pub home: String,
    pub fire: String,
    pub child_kidnapping: String,
    pub women_harassment: String,
    pub elder_fall: String,
    pub disguise_news: String,
    pub trekking: String,
    /// Substituted for `${maps_url}` when no position could be resolved
    pub location_unavailable: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            home: "🚨 SOS Alert!\nI'm in danger. My location: ${maps_url}".to_string(),
            fire: "🔥 Fire Emergency! I need help. My location: ${maps_url}".to_string(),
            child_kidnapping: "🚨 Suspected Child Kidnapping! Location: ${maps_url}".to_string(),
            women_harassment: "🚨 I'm in danger. My location: ${maps_url}".to_string(),
            elder_fall: "🧓 Fall Detected at Home!\nLive Location: ${maps_url}".to_string(),
            disguise_news: "🚨 I need help! My location: ${maps_url}".to_string(),
            trekking: "🚨 SOS! I need help while trekking. My location: ${maps_url}".to_string(),
            location_unavailable: "unavailable".to_string(),
        }
    }
}

impl MessageTemplates {
    pub fn template(&self, scenario: Scenario) -> &str {
        match scenario {
            Scenario::Home => &self.home,
            Scenario::Fire => &self.fire,
            Scenario::ChildKidnapping => &self.child_kidnapping,
            Scenario::WomenHarassment => &self.women_harassment,
            Scenario::ElderFall => &self.elder_fall,
            Scenario::DisguiseNews => &self.disguise_news,
            Scenario::Trekking => &self.trekking,
        }
    }
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/silent_sos"))
        .add_source(config::Environment::with_prefix("SOS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a message template
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
