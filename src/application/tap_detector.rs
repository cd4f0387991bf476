// Tap pattern detectors - triple tap, Morse SOS, long press
use crate::application::detector::Detector;
use crate::domain::alert::{EmergencyEvent, Trigger};
use crate::domain::reading::{Reading, Tap, TapKind};
use crate::infrastructure::config::DetectorSettings;
use std::collections::VecDeque;
use std::time::Duration;

fn plain_tap(reading: &Reading) -> Option<&Tap> {
    match reading {
        Reading::Tap(tap) if tap.kind == TapKind::Tap => Some(tap),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct TripleTapConfig {
    pub required_taps: u32,
    pub idle_timeout_ms: u64,
}

impl Default for TripleTapConfig {
    fn default() -> Self {
        Self {
            required_taps: 3,
            idle_timeout_ms: 1000,
        }
    }
}

impl From<&DetectorSettings> for TripleTapConfig {
    fn from(settings: &DetectorSettings) -> Self {
        Self {
            required_taps: settings.triple_tap_count,
            idle_timeout_ms: settings.tap_idle_timeout_ms,
        }
    }
}

/// Counts taps; the count resets after an idle gap longer than the timeout
pub struct TripleTapDetector {
    config: TripleTapConfig,
    count: u32,
    last_tap_ms: Option<u64>,
}

impl TripleTapDetector {
    pub fn new(config: TripleTapConfig) -> Self {
        Self {
            config,
            count: 0,
            last_tap_ms: None,
        }
    }

    #[cfg(test)]
    pub fn count(&self) -> u32 {
        self.count
    }

    fn idle_since(&self, now_ms: u64) -> bool {
        self.last_tap_ms
            .is_some_and(|last| now_ms.saturating_sub(last) > self.config.idle_timeout_ms)
    }
}

impl Detector for TripleTapDetector {
    fn name(&self) -> &'static str {
        "triple-tap"
    }

    fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
        let tap = plain_tap(reading)?;

        if self.idle_since(tap.timestamp_ms) {
            self.count = 0;
        }
        self.count += 1;
        self.last_tap_ms = Some(tap.timestamp_ms);

        if self.count >= self.config.required_taps {
            self.count = 0;
            return Some(EmergencyEvent::new(Trigger::TripleTap, tap.timestamp_ms));
        }
        None
    }

    fn poll(&mut self, now_ms: u64) -> Option<EmergencyEvent> {
        if self.idle_since(now_ms) {
            self.count = 0;
        }
        None
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.config.idle_timeout_ms))
    }

    fn reset(&mut self) {
        self.count = 0;
        self.last_tap_ms = None;
    }
}

#[derive(Debug, Clone)]
pub struct MorseConfig {
    pub short_max_ms: u64,
    pub long_min_ms: u64,
}

impl Default for MorseConfig {
    fn default() -> Self {
        Self {
            short_max_ms: 500,
            long_min_ms: 1000,
        }
    }
}

impl From<&DetectorSettings> for MorseConfig {
    fn from(settings: &DetectorSettings) -> Self {
        Self {
            short_max_ms: settings.morse_short_max_ms,
            long_min_ms: settings.morse_long_min_ms,
        }
    }
}

/// Inter-tap gaps that make up one SOS: three short, three long, three short
pub const SOS_GAPS: usize = 9;

/// Classify nine inter-tap gaps as `... --- ...`
pub fn is_sos(deltas: &[u64], config: &MorseConfig) -> bool {
    if deltas.len() != SOS_GAPS {
        return false;
    }
    let short = |d: &u64| *d < config.short_max_ms;
    let long = |d: &u64| *d > config.long_min_ms;

    deltas[0..3].iter().all(short) && deltas[3..6].iter().all(long) && deltas[6..9].iter().all(short)
}

/// Sliding window over the most recent tap timestamps.
///
/// The window is only cleared after a match. On a mismatch it keeps sliding,
/// so a window can straddle two unrelated bursts of taps.
pub struct MorseSosDetector {
    config: MorseConfig,
    taps: VecDeque<u64>,
}

impl MorseSosDetector {
    pub fn new(config: MorseConfig) -> Self {
        Self {
            config,
            taps: VecDeque::with_capacity(SOS_GAPS + 1),
        }
    }

    #[cfg(test)]
    pub fn window_len(&self) -> usize {
        self.taps.len()
    }
}

impl Detector for MorseSosDetector {
    fn name(&self) -> &'static str {
        "morse-sos"
    }

    fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
        let tap = plain_tap(reading)?;

        if self.taps.back().is_some_and(|last| tap.timestamp_ms < *last) {
            tracing::debug!("tap at {} is older than the window, dropped", tap.timestamp_ms);
            return None;
        }

        self.taps.push_back(tap.timestamp_ms);
        while self.taps.len() > SOS_GAPS + 1 {
            self.taps.pop_front();
        }
        if self.taps.len() < SOS_GAPS + 1 {
            return None;
        }

        let deltas: Vec<u64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();

        if is_sos(&deltas, &self.config) {
            self.taps.clear();
            return Some(EmergencyEvent::new(Trigger::MorseSos, tap.timestamp_ms));
        }
        None
    }

    fn reset(&mut self) {
        self.taps.clear();
    }
}

/// A single long press on the disguise screen is the whole gesture
pub struct LongPressDetector;

impl Detector for LongPressDetector {
    fn name(&self) -> &'static str {
        "long-press"
    }

    fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
        match reading {
            Reading::Tap(tap) if tap.kind == TapKind::LongPress => {
                Some(EmergencyEvent::new(Trigger::LongPress, tap.timestamp_ms))
            }
            _ => None,
        }
    }

    fn reset(&mut self) {}
}
