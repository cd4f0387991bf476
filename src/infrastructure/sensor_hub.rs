// Sensor hub - Fans readings pushed by the phone out to detector subscriptions
use crate::application::ports::{HeadingSource, LocationProvider, PermissionGate};
use crate::application::signal_source::{SignalSource, Subscription};
use crate::domain::error::{Permission, PermissionState, SosError};
use crate::domain::reading::{Position, Reading, ReadingKind, SamplingIntervals};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    Delivered { subscribers: usize },
    /// Arrived sooner than the sampling interval allows
    Throttled,
    /// Position reading while location permission is not granted
    Blocked,
}

#[derive(Debug, Default)]
struct HubState {
    last_delivered: HashMap<ReadingKind, Reading>,
    last_position: Option<Position>,
    last_heading: Option<f64>,
    permissions: HashMap<Permission, PermissionState>,
}

pub struct SensorHub {
    channels: HashMap<ReadingKind, broadcast::Sender<Reading>>,
    intervals: SamplingIntervals,
    state: Mutex<HubState>,
}

impl SensorHub {
    pub fn new(intervals: SamplingIntervals) -> Self {
        let channels = ReadingKind::ALL
            .iter()
            .map(|kind| (*kind, broadcast::channel(CHANNEL_CAPACITY).0))
            .collect();
        Self {
            channels,
            intervals,
            state: Mutex::new(HubState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_permission(&self, permission: Permission, state: PermissionState) {
        let mut hub = self.state();
        hub.permissions.insert(permission, state);
        if permission == Permission::Location && !state.is_granted() {
            hub.last_position = None;
            hub.last_delivered.remove(&ReadingKind::Position);
        }
        tracing::info!("{} permission is now {:?}", permission, state);
    }

    /// Validate, throttle and broadcast one reading
    pub fn publish(&self, reading: Reading) -> Result<PublishOutcome, SosError> {
        reading.validate()?;
        let kind = reading.kind();

        {
            let mut hub = self.state();
            if kind == ReadingKind::Position
                && !hub
                    .permissions
                    .get(&Permission::Location)
                    .copied()
                    .unwrap_or_default()
                    .is_granted()
            {
                return Ok(PublishOutcome::Blocked);
            }

            if let Some(previous) = hub.last_delivered.get(&kind) {
                if self.too_soon(previous, &reading) {
                    return Ok(PublishOutcome::Throttled);
                }
            }

            hub.last_delivered.insert(kind, reading);
            match reading {
                Reading::Position(position) => hub.last_position = Some(position),
                Reading::Magnetic(field) => hub.last_heading = Some(field.heading_degrees()),
                _ => {}
            }
        }

        let subscribers = match self.channels.get(&kind) {
            Some(tx) => tx.send(reading).unwrap_or(0),
            None => 0,
        };
        Ok(PublishOutcome::Delivered { subscribers })
    }

    fn too_soon(&self, previous: &Reading, next: &Reading) -> bool {
        let interval = self.intervals.for_kind(next.kind()).as_millis() as u64;
        let elapsed = next.timestamp_ms().saturating_sub(previous.timestamp_ms());
        if next.timestamp_ms() >= previous.timestamp_ms() && elapsed >= interval {
            return false;
        }
        // A fix that moved far enough is delivered before the interval is up
        match (previous, next) {
            (Reading::Position(a), Reading::Position(b)) => {
                a.distance_m(b) < self.intervals.position_distance_m
            }
            _ => interval > 0,
        }
    }
}

impl SignalSource for SensorHub {
    fn subscribe(&self, kind: ReadingKind) -> Subscription {
        match self.channels.get(&kind) {
            Some(tx) => Subscription::new(kind, tx.subscribe()),
            None => Subscription::new(kind, broadcast::channel(1).1),
        }
    }
}

#[async_trait]
impl LocationProvider for SensorHub {
    async fn current_position(&self) -> Result<Position, SosError> {
        let hub = self.state();
        let granted = hub
            .permissions
            .get(&Permission::Location)
            .copied()
            .unwrap_or_default()
            .is_granted();
        if !granted {
            return Err(SosError::PermissionDenied(Permission::Location));
        }
        hub.last_position
            .ok_or_else(|| SosError::ResourceUnavailable("location".to_string()))
    }
}

impl PermissionGate for SensorHub {
    fn permission(&self, permission: Permission) -> PermissionState {
        self.state()
            .permissions
            .get(&permission)
            .copied()
            .unwrap_or_default()
    }
}

impl HeadingSource for SensorHub {
    fn last_heading(&self) -> Option<f64> {
        self.state().last_heading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reading::{Acceleration, MagneticField, Tap};

    fn accel(t: u64) -> Reading {
        Reading::Acceleration(Acceleration::new(0.0, 0.0, 1.0, t))
    }

    fn fix(lat: f64, t: u64) -> Reading {
        Reading::Position(Position::new(lat, 77.0, 5.0, t))
    }

    #[tokio::test]
    async fn test_readings_faster_than_interval_dropped() {
        let hub = SensorHub::new(SamplingIntervals::default());
        let mut sub = hub.subscribe(ReadingKind::Acceleration);

        assert_eq!(hub.publish(accel(0)).unwrap(), PublishOutcome::Delivered { subscribers: 1 });
        assert_eq!(hub.publish(accel(100)).unwrap(), PublishOutcome::Throttled);
        assert!(matches!(hub.publish(accel(300)).unwrap(), PublishOutcome::Delivered { .. }));

        assert_eq!(sub.recv().await.unwrap().timestamp_ms(), 0);
        assert_eq!(sub.recv().await.unwrap().timestamp_ms(), 300);
    }

    #[tokio::test]
    async fn test_taps_never_throttled() {
        let hub = SensorHub::new(SamplingIntervals::default());
        let _sub = hub.subscribe(ReadingKind::Tap);
        for t in [0, 0, 5] {
            assert!(matches!(
                hub.publish(Reading::Tap(Tap::at(t))).unwrap(),
                PublishOutcome::Delivered { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_position_requires_permission() {
        let hub = SensorHub::new(SamplingIntervals::default());
        assert_eq!(hub.publish(fix(12.0, 0)).unwrap(), PublishOutcome::Blocked);
        assert!(matches!(
            hub.current_position().await,
            Err(SosError::PermissionDenied(Permission::Location))
        ));

        hub.set_permission(Permission::Location, PermissionState::Granted);
        assert!(matches!(
            hub.current_position().await,
            Err(SosError::ResourceUnavailable(_))
        ));
        hub.publish(fix(12.0, 0)).unwrap();
        assert_eq!(hub.current_position().await.unwrap().latitude, 12.0);

        hub.set_permission(Permission::Location, PermissionState::Denied);
        assert!(hub.current_position().await.is_err());
    }

    #[test]
    fn test_position_moved_far_skips_interval() {
        let hub = SensorHub::new(SamplingIntervals::default());
        hub.set_permission(Permission::Location, PermissionState::Granted);
        hub.publish(fix(12.0, 0)).unwrap();
        // ~1 m in 5 s: coalesced
        assert_eq!(hub.publish(fix(12.00001, 5_000)).unwrap(), PublishOutcome::Throttled);
        // ~111 m in 10 s: delivered
        assert!(matches!(hub.publish(fix(12.001, 10_000)).unwrap(), PublishOutcome::Delivered { .. }));
    }

    #[test]
    fn test_heading_and_validation() {
        let hub = SensorHub::new(SamplingIntervals::default());
        assert_eq!(hub.last_heading(), None);
        hub.publish(Reading::Magnetic(MagneticField {
            x: 0.0,
            y: 1.0,
            z: 0.0,
            timestamp_ms: 0,
        }))
        .unwrap();
        assert_eq!(hub.last_heading(), Some(90.0));

        let bad = Reading::Acceleration(Acceleration::new(f64::NAN, 0.0, 0.0, 1_000));
        assert!(matches!(hub.publish(bad), Err(SosError::SensorError(_))));
    }
}
