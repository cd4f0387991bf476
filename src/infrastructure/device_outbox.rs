// Device outbox - Effects the phone shell must carry out, queued until drained
use crate::application::ports::{AudioDevice, DeviceActions, Dialer, ShareChannel, WellbeingPrompt};
use crate::domain::device::{DeviceAction, PromptAnswer};
use crate::domain::error::SosError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

const DIALABLE_SCHEMES: [&str; 2] = ["tel:", "sms:"];

pub struct DeviceOutbox {
    capacity: usize,
    queue: Mutex<VecDeque<DeviceAction>>,
    live: broadcast::Sender<DeviceAction>,
    prompts: Mutex<HashMap<u64, oneshot::Sender<PromptAnswer>>>,
    next_prompt: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

impl DeviceOutbox {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            live: broadcast::channel(capacity).0,
            prompts: Mutex::new(HashMap::new()),
            next_prompt: AtomicU64::new(1),
        }
    }

    /// Everything queued since the last drain, oldest first
    pub fn drain(&self) -> Vec<DeviceAction> {
        lock(&self.queue).drain(..).collect()
    }

    /// Live feed of actions as they are pushed; queued actions are not replayed
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceAction> {
        self.live.subscribe()
    }

    /// Deliver the user's reply to a pending prompt
    pub fn answer(&self, id: u64, answer: PromptAnswer) -> bool {
        match lock(&self.prompts).remove(&id) {
            Some(reply) => reply.send(answer).is_ok(),
            None => false,
        }
    }
}

impl DeviceActions for DeviceOutbox {
    /// When full, the oldest expendable action makes room. Shares, prompts
    /// and calls are never evicted; the queue grows past capacity for them.
    fn push(&self, action: DeviceAction) {
        {
            let mut queue = lock(&self.queue);
            if queue.len() >= self.capacity {
                match queue.iter().position(DeviceAction::is_expendable) {
                    Some(index) => {
                        if let Some(dropped) = queue.remove(index) {
                            tracing::warn!("device outbox full, dropping {:?}", dropped);
                        }
                        queue.push_back(action.clone());
                    }
                    None if action.is_expendable() => {
                        tracing::warn!("device outbox full, not queueing {:?}", action);
                    }
                    None => {
                        tracing::warn!("device outbox over capacity ({} queued)", queue.len() + 1);
                        queue.push_back(action.clone());
                    }
                }
            } else {
                queue.push_back(action.clone());
            }
        }
        let _ = self.live.send(action);
    }
}

#[async_trait]
impl ShareChannel for DeviceOutbox {
    async fn share(&self, message: &str) -> Result<(), SosError> {
        self.push(DeviceAction::Share {
            message: message.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl Dialer for DeviceOutbox {
    async fn can_open(&self, url: &str) -> bool {
        DIALABLE_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) && url.len() > 4
    }

    async fn open(&self, url: &str) -> Result<(), SosError> {
        if !self.can_open(url).await {
            return Err(SosError::ResourceUnavailable(format!("handler for {}", url)));
        }
        self.push(DeviceAction::OpenUrl { url: url.to_string() });
        Ok(())
    }
}

#[async_trait]
impl AudioDevice for DeviceOutbox {
    async fn start_siren(&self) -> Result<(), SosError> {
        self.push(DeviceAction::PlaySiren { looping: true });
        Ok(())
    }

    async fn stop_siren(&self) -> Result<(), SosError> {
        self.push(DeviceAction::StopSiren);
        Ok(())
    }

    async fn play_ringtone(&self) -> Result<(), SosError> {
        self.push(DeviceAction::PlayRingtone);
        Ok(())
    }

    async fn start_recording(&self, limit: Duration) -> Result<(), SosError> {
        self.push(DeviceAction::StartRecording {
            max_seconds: limit.as_secs(),
        });
        Ok(())
    }

    async fn stop_recording(&self) -> Result<(), SosError> {
        self.push(DeviceAction::StopRecording);
        Ok(())
    }
}

#[async_trait]
impl WellbeingPrompt for DeviceOutbox {
    async fn ask(&self, title: &str, message: &str, timeout: Duration) -> PromptAnswer {
        let id = self.next_prompt.fetch_add(1, Ordering::Relaxed);
        let (reply, answer) = oneshot::channel();
        lock(&self.prompts).insert(id, reply);

        self.push(DeviceAction::Prompt {
            id,
            title: title.to_string(),
            message: message.to_string(),
        });

        let answer = match tokio::time::timeout(timeout, answer).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(_)) => PromptAnswer::NoAnswer,
            Err(_) => {
                tracing::warn!("prompt {} unanswered after {:?}", id, timeout);
                PromptAnswer::NoAnswer
            }
        };
        lock(&self.prompts).remove(&id);
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn vibrate() -> DeviceAction {
        DeviceAction::Vibrate {
            pattern_ms: vec![500; 6],
            repeat: true,
        }
    }

    #[test]
    fn test_drain_in_order_and_capped() {
        let outbox = DeviceOutbox::new(2);
        outbox.push(DeviceAction::notice("a", "first"));
        outbox.push(DeviceAction::notice("b", "second"));
        outbox.push(DeviceAction::StopSiren);

        assert_eq!(
            outbox.drain(),
            vec![DeviceAction::notice("b", "second"), DeviceAction::StopSiren]
        );
        assert!(outbox.drain().is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_keeps_share() {
        let outbox = DeviceOutbox::new(3);
        outbox.share("🚨 help").await.unwrap();
        for _ in 0..10 {
            outbox.push(vibrate());
        }

        let drained = outbox.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0], DeviceAction::Share { message: "🚨 help".to_string() });
    }

    #[test]
    fn test_essential_actions_exceed_capacity() {
        let outbox = DeviceOutbox::new(1);
        outbox.push(DeviceAction::OpenUrl { url: "tel:112".to_string() });
        outbox.push(vibrate());
        outbox.push(DeviceAction::Share { message: "help".to_string() });

        assert_eq!(
            outbox.drain(),
            vec![
                DeviceAction::OpenUrl { url: "tel:112".to_string() },
                DeviceAction::Share { message: "help".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_dialer_only_opens_phone_urls() {
        let outbox = DeviceOutbox::new(8);
        assert!(outbox.can_open("tel:112").await);
        assert!(!outbox.can_open("https://example.com").await);
        assert!(outbox.open("javascript:alert(1)").await.is_err());
        outbox.open("tel:112").await.unwrap();
        assert_eq!(outbox.drain(), vec![DeviceAction::OpenUrl { url: "tel:112".to_string() }]);
    }

    #[tokio::test]
    async fn test_prompt_answered() {
        let outbox = Arc::new(DeviceOutbox::new(8));
        let asking = {
            let outbox = outbox.clone();
            tokio::spawn(async move {
                outbox
                    .ask("Stationary Alert", "Are you okay?", Duration::from_secs(60))
                    .await
            })
        };

        let mut id = None;
        for _ in 0..50 {
            tokio::task::yield_now().await;
            if let Some(DeviceAction::Prompt { id: prompt, .. }) = outbox.drain().pop() {
                id = Some(prompt);
                break;
            }
        }
        let id = id.expect("prompt was queued");
        assert!(outbox.answer(id, PromptAnswer::Okay));
        assert_eq!(asking.await.unwrap(), PromptAnswer::Okay);
        assert!(!outbox.answer(id, PromptAnswer::NeedHelp));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_times_out() {
        let outbox = DeviceOutbox::new(8);
        let answer = outbox.ask("t", "m", Duration::from_secs(60)).await;
        assert_eq!(answer, PromptAnswer::NoAnswer);
        // The expired prompt no longer accepts a reply
        assert!(!outbox.answer(1, PromptAnswer::Okay));
    }

    #[tokio::test]
    async fn test_live_feed() {
        let outbox = DeviceOutbox::new(8);
        let mut live = outbox.subscribe();
        outbox.share("🚨 help").await.unwrap();
        assert_eq!(
            live.recv().await.unwrap(),
            DeviceAction::Share { message: "🚨 help".to_string() }
        );
    }
}
