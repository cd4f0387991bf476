// Shake detector - acceleration magnitude above a threshold, with cooldown
use crate::application::detector::Detector;
use crate::domain::alert::{EmergencyEvent, Trigger};
use crate::domain::reading::Reading;
use crate::infrastructure::config::DetectorSettings;

#[derive(Debug, Clone)]
pub struct ShakeConfig {
    pub threshold: f64,
    pub cooldown_ms: u64,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            cooldown_ms: 2000,
        }
    }
}

impl From<&DetectorSettings> for ShakeConfig {
    fn from(settings: &DetectorSettings) -> Self {
        Self {
            threshold: settings.shake_threshold,
            cooldown_ms: settings.shake_cooldown_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Excursion {
    Below,
    /// Above the threshold but started inside the cooldown
    Held,
    Fired,
}

/// Fires once per excursion above the threshold, never twice within the
/// cooldown window. An excursion that starts inside the cooldown fires on its
/// first reading after the cooldown, if it is still going.
pub struct ShakeDetector {
    config: ShakeConfig,
    last_fired_ms: Option<u64>,
    excursion: Excursion,
}

impl ShakeDetector {
    pub fn new(config: ShakeConfig) -> Self {
        Self {
            config,
            last_fired_ms: None,
            excursion: Excursion::Below,
        }
    }

    fn cooling_down(&self, now_ms: u64) -> bool {
        self.last_fired_ms
            .is_some_and(|fired| now_ms.saturating_sub(fired) < self.config.cooldown_ms)
    }
}

impl Detector for ShakeDetector {
    fn name(&self) -> &'static str {
        "shake"
    }

    fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
        let Reading::Acceleration(sample) = reading else {
            return None;
        };

        if sample.magnitude() <= self.config.threshold {
            self.excursion = Excursion::Below;
            return None;
        }
        if self.excursion == Excursion::Fired {
            return None;
        }
        if self.cooling_down(sample.timestamp_ms) {
            self.excursion = Excursion::Held;
            return None;
        }

        tracing::debug!("shake magnitude {:.2} above {}", sample.magnitude(), self.config.threshold);
        self.excursion = Excursion::Fired;
        self.last_fired_ms = Some(sample.timestamp_ms);
        Some(EmergencyEvent::new(Trigger::Shake, sample.timestamp_ms))
    }

    fn reset(&mut self) {
        self.last_fired_ms = None;
        self.excursion = Excursion::Below;
    }
}
