// Fall detector - sudden movement followed by stillness
use crate::application::detector::Detector;
use crate::domain::alert::{EmergencyEvent, Trigger};
use crate::domain::reading::{Acceleration, Reading};
use crate::infrastructure::config::DetectorSettings;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FallConfig {
    /// L1 distance between consecutive samples that counts as sudden movement
    pub movement_threshold: f64,
    /// Magnitude below which the device is considered motionless
    pub stillness_threshold: f64,
    pub check_delay_ms: u64,
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 2.5,
            stillness_threshold: 0.3,
            check_delay_ms: 1500,
        }
    }
}

impl From<&DetectorSettings> for FallConfig {
    fn from(settings: &DetectorSettings) -> Self {
        Self {
            movement_threshold: settings.fall_movement_threshold,
            stillness_threshold: settings.fall_stillness_threshold,
            check_delay_ms: settings.fall_check_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FallState {
    Monitoring,
    /// Sudden movement seen; stillness is checked once `deadline_ms` passes
    AwaitingStillness { deadline_ms: u64 },
    /// Fall reported; stays latched until reset
    Fired,
}

pub struct FallDetector {
    config: FallConfig,
    state: FallState,
    last: Option<Acceleration>,
}

impl FallDetector {
    pub fn new(config: FallConfig) -> Self {
        Self {
            config,
            state: FallState::Monitoring,
            last: None,
        }
    }

    #[cfg(test)]
    pub fn is_latched(&self) -> bool {
        self.state == FallState::Fired
    }

    fn resolve(&mut self, sample: Acceleration, at_ms: u64) -> Option<EmergencyEvent> {
        let magnitude = sample.magnitude();
        if magnitude < self.config.stillness_threshold {
            tracing::debug!("stillness after sudden movement (magnitude {:.2})", magnitude);
            self.state = FallState::Fired;
            Some(EmergencyEvent::new(Trigger::Fall, at_ms))
        } else {
            tracing::debug!("movement continued (magnitude {:.2}), not a fall", magnitude);
            self.state = FallState::Monitoring;
            None
        }
    }
}

impl Detector for FallDetector {
    fn name(&self) -> &'static str {
        "fall"
    }

    fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
        let Reading::Acceleration(sample) = reading else {
            return None;
        };

        let movement = self.last.map(|last| sample.l1_distance(&last));
        self.last = Some(*sample);

        match self.state {
            FallState::Fired => None,
            FallState::AwaitingStillness { deadline_ms } => {
                // A second spike while a check is pending does not schedule another one
                if sample.timestamp_ms >= deadline_ms {
                    self.resolve(*sample, sample.timestamp_ms)
                } else {
                    None
                }
            }
            FallState::Monitoring => {
                if movement.is_some_and(|m| m > self.config.movement_threshold) {
                    tracing::debug!("sudden movement, checking for a fall");
                    self.state = FallState::AwaitingStillness {
                        deadline_ms: sample.timestamp_ms.saturating_add(self.config.check_delay_ms),
                    };
                }
                None
            }
        }
    }

    fn poll(&mut self, now_ms: u64) -> Option<EmergencyEvent> {
        match (self.state, self.last) {
            (FallState::AwaitingStillness { deadline_ms }, Some(last)) if now_ms >= deadline_ms => {
                self.resolve(last, now_ms)
            }
            _ => None,
        }
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(Duration::from_millis(250))
    }

    fn reset(&mut self) {
        self.state = FallState::Monitoring;
        self.last = None;
    }
}
