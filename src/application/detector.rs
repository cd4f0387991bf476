// Detector contract and the task that drives a detector from a subscription
use crate::application::signal_source::Subscription;
use crate::domain::alert::EmergencyEvent;
use crate::domain::reading::Reading;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Stateful classifier turning readings into emergency events.
///
/// Detectors take time from reading timestamps so the same sequence always
/// produces the same events. `poll` is driven on that same clock, never the
/// host's. Readings of a kind a detector does not watch are ignored.
pub trait Detector: Send {
    fn name(&self) -> &'static str;

    fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent>;

    /// Resolve timers that are due at `now_ms`
    fn poll(&mut self, _now_ms: u64) -> Option<EmergencyEvent> {
        None
    }

    /// How often `poll` must run, if the detector has timers at all
    fn poll_interval(&self) -> Option<Duration> {
        None
    }

    fn reset(&mut self);

    /// `consume` behind reading validation; a malformed reading leaves state untouched
    fn observe(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
        if let Err(e) = reading.validate() {
            tracing::debug!("{} dropped reading: {}", self.name(), e);
            return None;
        }
        self.consume(reading)
    }
}

pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Reading time: the newest reading timestamp, advanced by how long the
/// runner has waited since it arrived. Never runs backwards.
#[derive(Debug, Default)]
struct ReadingClock {
    anchor: Option<(u64, Instant)>,
}

impl ReadingClock {
    fn now_ms(&self) -> Option<u64> {
        self.anchor.map(|(at_ms, seen)| {
            let waited = seen.elapsed().as_millis().min(u64::MAX as u128) as u64;
            at_ms.saturating_add(waited)
        })
    }

    fn observe(&mut self, timestamp_ms: u64) {
        let at_ms = self.now_ms().map_or(timestamp_ms, |now| now.max(timestamp_ms));
        self.anchor = Some((at_ms, Instant::now()));
    }
}

/// Running detector task. The task stops when the handle is stopped or dropped.
pub struct DetectorHandle {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl DetectorHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("detector {} stopped", self.name);
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn spawn_detector<D>(
    mut detector: D,
    mut subscription: Subscription,
    events: mpsc::Sender<EmergencyEvent>,
) -> DetectorHandle
where
    D: Detector + 'static,
{
    let name = detector.name();
    let poll_every = detector.poll_interval();
    tracing::debug!("detector {} watching {:?} readings", name, subscription.kind());

    let task = tokio::spawn(async move {
        let mut clock = ReadingClock::default();
        let mut ticker = tokio::time::interval(poll_every.unwrap_or(Duration::from_secs(3600)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                reading = subscription.recv() => match reading {
                    Some(reading) => {
                        clock.observe(reading.timestamp_ms());
                        detector.observe(&reading)
                    }
                    None => break,
                },
                // Nothing to time against before the first reading
                _ = ticker.tick(), if poll_every.is_some() => match clock.now_ms() {
                    Some(now) => detector.poll(now),
                    None => None,
                },
            };

            if let Some(event) = event {
                tracing::info!("{} detected {:?}", detector.name(), event.trigger);
                if events.send(event).await.is_err() {
                    break;
                }
            }
        }

        subscription.unsubscribe();
        detector.reset();
        tracing::debug!("detector {} finished", detector.name());
    });

    DetectorHandle {
        name,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fall_detector::{FallConfig, FallDetector};
    use crate::domain::alert::Trigger;
    use crate::domain::reading::{Acceleration, ReadingKind, Tap};
    use tokio::sync::broadcast;

    struct EveryTap;

    impl Detector for EveryTap {
        fn name(&self) -> &'static str {
            "every-tap"
        }

        fn consume(&mut self, reading: &Reading) -> Option<EmergencyEvent> {
            match reading {
                Reading::Tap(tap) => Some(EmergencyEvent::new(Trigger::Button, tap.timestamp_ms)),
                _ => None,
            }
        }

        fn reset(&mut self) {}
    }

    #[tokio::test]
    async fn test_runner_forwards_events() {
        let (tx, rx) = broadcast::channel(8);
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let _handle = spawn_detector(EveryTap, Subscription::new(ReadingKind::Tap, rx), events_tx);

        tx.send(Reading::Tap(Tap::at(42))).unwrap();
        let event = events_rx.recv().await.unwrap();
        assert_eq!(event.detected_at_ms, 42);
    }

    #[tokio::test]
    async fn test_no_events_after_stop() {
        let (tx, rx) = broadcast::channel(8);
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let mut handle = spawn_detector(EveryTap, Subscription::new(ReadingKind::Tap, rx), events_tx);

        tx.send(Reading::Tap(Tap::at(1))).unwrap();
        assert!(events_rx.recv().await.is_some());

        handle.stop();
        assert!(!handle.is_running());

        // Readings keep arriving on the same source, but nobody listens any more
        let _ = tx.send(Reading::Tap(Tap::at(2)));
        let _ = tx.send(Reading::Tap(Tap::at(3)));
        assert_eq!(events_rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_run_on_reading_clock() {
        let (tx, rx) = broadcast::channel(16);
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let _handle = spawn_detector(
            FallDetector::new(FallConfig::default()),
            Subscription::new(ReadingKind::Acceleration, rx),
            events_tx,
        );

        // Phone clock counts from boot, far behind the host's wall clock
        let magnitudes = [1.0, 3.8, 2.0, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1];
        for (i, z) in magnitudes.iter().enumerate() {
            tx.send(Reading::Acceleration(Acceleration::new(0.0, 0.0, *z, i as u64 * 300)))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        let event = events_rx.recv().await.unwrap();
        assert_eq!(event.trigger, Trigger::Fall);
        assert!(event.detected_at_ms < 10_000);
        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_clock_advances_and_never_rewinds() {
        let mut clock = ReadingClock::default();
        assert_eq!(clock.now_ms(), None);

        clock.observe(5_000);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(clock.now_ms(), Some(5_400));

        // A late reading stamped in the past does not pull the clock back
        clock.observe(4_000);
        assert_eq!(clock.now_ms(), Some(5_400));

        clock.observe(u64::MAX - 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(clock.now_ms(), Some(u64::MAX));
    }
}
