// Stillness detector - no meaningful movement for a long time
use crate::application::detector::Detector;
use crate::domain::alert::{EmergencyEvent, Trigger};
use crate::domain::reading::{Position, Reading};
use crate::infrastructure::config::DetectorSettings;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StillnessConfig {
    pub threshold_ms: u64,
    pub check_interval: Duration,
    pub movement_distance_m: f64,
}

impl Default for StillnessConfig {
    fn default() -> Self {
        Self {
            threshold_ms: 30 * 60 * 1000,
            check_interval: Duration::from_secs(60),
            movement_distance_m: 10.0,
        }
    }
}

impl From<&DetectorSettings> for StillnessConfig {
    fn from(settings: &DetectorSettings) -> Self {
        Self {
            threshold_ms: settings.stationary_minutes * 60 * 1000,
            check_interval: Duration::from_secs(settings.stationary_check_seconds),
            movement_distance_m: settings.movement_distance_m,
        }
    }
}

/// Reports a stationary event once the user has not moved beyond the distance
/// threshold for longer than the configured window. The window restarts after
/// each report, so the next prompt comes one full window later.
pub struct StillnessDetector {
    config: StillnessConfig,
    anchor: Option<Position>,
    last_movement_ms: Option<u64>,
}

impl StillnessDetector {
    pub fn new(config: StillnessConfig) -> Self {
        Self {
            config,
            anchor: None,
            last_movement_ms: None,
        }
    }

    #[cfg(test)]
    pub fn last_movement_ms(&self) -> Option<u64> {
        self.last_movement_ms
    }
}

impl Detector for StillnessDetector {
    fn name(&self) -> &'static str {
        "stillness"
    }

    fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
        let Reading::Position(position) = reading else {
            return None;
        };

        let moved = match &self.anchor {
            Some(anchor) => anchor.distance_m(position) > self.config.movement_distance_m,
            None => true,
        };
        if moved {
            self.anchor = Some(*position);
            self.last_movement_ms = Some(position.timestamp_ms);
        }
        None
    }

    fn poll(&mut self, now_ms: u64) -> Option<EmergencyEvent> {
        let last = self.last_movement_ms?;
        if now_ms.saturating_sub(last) > self.config.threshold_ms {
            tracing::info!(
                "no movement for {} minutes",
                now_ms.saturating_sub(last) / 60_000
            );
            self.last_movement_ms = Some(now_ms);
            return Some(EmergencyEvent::new(Trigger::Stationary, now_ms));
        }
        None
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(self.config.check_interval)
    }

    fn reset(&mut self) {
        self.anchor = None;
        self.last_movement_ms = None;
    }
}
