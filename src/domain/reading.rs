// Sensor reading domain models
use crate::domain::error::SosError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Accelerometer sample in g. Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ms: u64,
}

impl Acceleration {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Sum of absolute per-axis differences between two samples
    pub fn l1_distance(&self, other: &Acceleration) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagneticField {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    pub timestamp_ms: u64,
}

impl MagneticField {
    /// Compass heading in whole degrees, always within [0, 360)
    pub fn heading_degrees(&self) -> f64 {
        let mut heading = self.y.atan2(self.x).to_degrees();
        if heading < 0.0 {
            heading += 360.0;
        }
        heading.round() % 360.0
    }
}

/// Eight-point compass name for a heading in degrees
pub fn cardinal_direction(degrees: f64) -> &'static str {
    const POINTS: [&str; 9] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW", "N"];
    let index = (degrees.rem_euclid(360.0) / 45.0).round() as usize;
    POINTS[index.min(8)]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f64,
    pub timestamp_ms: u64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp_ms,
        }
    }

    /// Great-circle distance in meters (haversine)
    pub fn distance_m(&self, other: &Position) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapKind {
    Tap,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tap {
    pub timestamp_ms: u64,
    #[serde(default = "default_tap_kind")]
    pub kind: TapKind,
}

fn default_tap_kind() -> TapKind {
    TapKind::Tap
}

impl Tap {
    pub fn at(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            kind: TapKind::Tap,
        }
    }

    pub fn long_press(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            kind: TapKind::LongPress,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    Acceleration,
    Magnetic,
    Position,
    Tap,
}

impl ReadingKind {
    pub const ALL: [ReadingKind; 4] = [
        ReadingKind::Acceleration,
        ReadingKind::Magnetic,
        ReadingKind::Position,
        ReadingKind::Tap,
    ];
}

/// One instantaneous sample delivered by a signal source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reading {
    Acceleration(Acceleration),
    Magnetic(MagneticField),
    Position(Position),
    Tap(Tap),
}

impl Reading {
    pub fn kind(&self) -> ReadingKind {
        match self {
            Reading::Acceleration(_) => ReadingKind::Acceleration,
            Reading::Magnetic(_) => ReadingKind::Magnetic,
            Reading::Position(_) => ReadingKind::Position,
            Reading::Tap(_) => ReadingKind::Tap,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Reading::Acceleration(a) => a.timestamp_ms,
            Reading::Magnetic(m) => m.timestamp_ms,
            Reading::Position(p) => p.timestamp_ms,
            Reading::Tap(t) => t.timestamp_ms,
        }
    }

    /// Reject samples a detector must never see (NaN axes, impossible coordinates)
    pub fn validate(&self) -> Result<(), SosError> {
        match self {
            Reading::Acceleration(a) => {
                if !(a.x.is_finite() && a.y.is_finite() && a.z.is_finite()) {
                    return Err(SosError::SensorError(
                        "acceleration has a non-finite axis".to_string(),
                    ));
                }
            }
            Reading::Magnetic(m) => {
                if !(m.x.is_finite() && m.y.is_finite() && m.z.is_finite()) {
                    return Err(SosError::SensorError(
                        "magnetometer has a non-finite axis".to_string(),
                    ));
                }
            }
            Reading::Position(p) => {
                let lat_ok = p.latitude.is_finite() && (-90.0..=90.0).contains(&p.latitude);
                let lon_ok = p.longitude.is_finite() && (-180.0..=180.0).contains(&p.longitude);
                if !(lat_ok && lon_ok) {
                    return Err(SosError::SensorError(format!(
                        "position out of range: {},{}",
                        p.latitude, p.longitude
                    )));
                }
            }
            Reading::Tap(_) => {}
        }
        Ok(())
    }
}

/// Minimum spacing between two delivered readings of each kind
#[derive(Debug, Clone, Copy)]
pub struct SamplingIntervals {
    pub acceleration: Duration,
    pub magnetic: Duration,
    pub position: Duration,
    /// Position updates closer than this are coalesced unless the interval elapsed
    pub position_distance_m: f64,
}

impl Default for SamplingIntervals {
    fn default() -> Self {
        Self {
            acceleration: Duration::from_millis(300),
            magnetic: Duration::from_millis(100),
            position: Duration::from_secs(60),
            position_distance_m: 10.0,
        }
    }
}

impl SamplingIntervals {
    pub fn for_kind(&self, kind: ReadingKind) -> Duration {
        match kind {
            ReadingKind::Acceleration => self.acceleration,
            ReadingKind::Magnetic => self.magnetic,
            ReadingKind::Position => self.position,
            ReadingKind::Tap => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_and_l1() {
        let a = Acceleration::new(3.0, 4.0, 0.0, 0);
        assert_eq!(a.magnitude(), 5.0);

        let b = Acceleration::new(1.0, 1.0, 1.0, 300);
        assert_eq!(a.l1_distance(&b), 2.0 + 3.0 + 1.0);
    }

    #[test]
    fn test_heading_is_normalised() {
        let east = MagneticField { x: 1.0, y: 0.0, z: 0.0, timestamp_ms: 0 };
        assert_eq!(east.heading_degrees(), 0.0);

        let south = MagneticField { x: 0.0, y: -1.0, z: 0.0, timestamp_ms: 0 };
        assert_eq!(south.heading_degrees(), 270.0);

        // 359.7 rounds up to 360, which must wrap to 0
        let almost = MagneticField {
            x: 1.0,
            y: (-0.3f64).to_radians().tan(),
            z: 0.0,
            timestamp_ms: 0,
        };
        assert_eq!(almost.heading_degrees(), 0.0);
    }

    #[test]
    fn test_cardinal_direction() {
        assert_eq!(cardinal_direction(0.0), "N");
        assert_eq!(cardinal_direction(100.0), "E");
        assert_eq!(cardinal_direction(225.0), "SW");
        assert_eq!(cardinal_direction(350.0), "N");
    }

    #[test]
    fn test_distance_between_positions() {
        let a = Position::new(12.0, 77.0, 5.0, 0);
        let b = Position::new(12.0001, 77.0, 5.0, 0);
        let d = a.distance_m(&b);
        assert!((d - 11.1).abs() < 0.2, "distance was {}", d);
        assert_eq!(a.distance_m(&a), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_samples() {
        let nan = Reading::Acceleration(Acceleration::new(f64::NAN, 0.0, 0.0, 0));
        assert!(matches!(nan.validate(), Err(SosError::SensorError(_))));

        let off_globe = Reading::Position(Position::new(91.0, 0.0, 0.0, 0));
        assert!(off_globe.validate().is_err());

        let tap = Reading::Tap(Tap::at(10));
        assert!(tap.validate().is_ok());
    }

    #[test]
    fn test_reading_json_shape() {
        let json = r#"{"type":"acceleration","x":0.1,"y":0.2,"z":0.98,"timestamp_ms":1000}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.kind(), ReadingKind::Acceleration);
        assert_eq!(reading.timestamp_ms(), 1000);

        let tap: Reading = serde_json::from_str(r#"{"type":"tap","timestamp_ms":5}"#).unwrap();
        assert_eq!(tap, Reading::Tap(Tap::at(5)));
    }
}
