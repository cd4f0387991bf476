// Signal source contract - subscriptions to a stream of readings
use crate::domain::reading::{Reading, ReadingKind};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub trait SignalSource: Send + Sync {
    fn subscribe(&self, kind: ReadingKind) -> Subscription;
}

/// Live feed of one reading kind. Dropping or unsubscribing releases it.
pub struct Subscription {
    kind: ReadingKind,
    receiver: Option<broadcast::Receiver<Reading>>,
}

impl Subscription {
    pub fn new(kind: ReadingKind, receiver: broadcast::Receiver<Reading>) -> Self {
        Self {
            kind,
            receiver: Some(receiver),
        }
    }

    pub fn kind(&self) -> ReadingKind {
        self.kind
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Next reading, or `None` once unsubscribed or the source is gone
    pub async fn recv(&mut self) -> Option<Reading> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(reading) => return Some(reading),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("{:?} subscriber lagged, skipped {} readings", self.kind, skipped);
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }
}
