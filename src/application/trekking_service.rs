// Trekking service - Checklist, compass read-out and network signal log
use crate::application::ports::{ChecklistStore, HeadingSource};
use crate::domain::contact::{Checklist, ChecklistItem};
use crate::domain::error::SosError;
use crate::domain::network::{SignalLogEntry, SignalSample};
use crate::domain::reading::cardinal_direction;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

const SIGNAL_LOG_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompassReading {
    pub degrees: f64,
    pub direction: &'static str,
}

#[derive(Clone)]
pub struct TrekkingService {
    checklist: Arc<dyn ChecklistStore>,
    heading: Arc<dyn HeadingSource>,
    signal_log: Arc<Mutex<VecDeque<SignalLogEntry>>>,
    /// Held across load-modify-save of the checklist
    checklist_writes: Arc<AsyncMutex<()>>,
}

impl TrekkingService {
    pub fn new(checklist: Arc<dyn ChecklistStore>, heading: Arc<dyn HeadingSource>) -> Self {
        Self {
            checklist,
            heading,
            signal_log: Arc::new(Mutex::new(VecDeque::with_capacity(SIGNAL_LOG_LEN))),
            checklist_writes: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Saved checklist, or the default items when nothing was saved yet
    pub async fn checklist(&self) -> Result<Checklist, SosError> {
        match self.checklist.load_checklist().await {
            Ok(checklist) => Ok(checklist),
            Err(SosError::StorageMiss(_)) => Ok(Checklist::default()),
            Err(e) => Err(e),
        }
    }

    pub async fn toggle(&self, id: &str) -> Result<Option<Checklist>, SosError> {
        let _write = self.checklist_writes.lock().await;
        let mut checklist = self.checklist().await?;
        if !checklist.toggle(id) {
            return Ok(None);
        }
        self.checklist.save_checklist(&checklist).await?;
        Ok(Some(checklist))
    }

    pub async fn add(&self, text: &str) -> Result<ChecklistItem, SosError> {
        let _write = self.checklist_writes.lock().await;
        let mut checklist = self.checklist().await?;
        let mut id = chrono::Utc::now().timestamp_millis();
        while checklist.items().iter().any(|item| item.id == id.to_string()) {
            id += 1;
        }
        let item = checklist.add(id.to_string(), text)?;
        self.checklist.save_checklist(&checklist).await?;
        tracing::debug!("checklist item {} added", item.id);
        Ok(item)
    }

    pub async fn remove(&self, id: &str) -> Result<bool, SosError> {
        let _write = self.checklist_writes.lock().await;
        let mut checklist = self.checklist().await?;
        if !checklist.remove(id) {
            return Ok(false);
        }
        self.checklist.save_checklist(&checklist).await?;
        Ok(true)
    }

    pub fn compass(&self) -> Option<CompassReading> {
        self.heading.last_heading().map(|degrees| CompassReading {
            degrees,
            direction: cardinal_direction(degrees),
        })
    }

    /// Keep the sample; only the newest entries are retained
    pub fn record_signal(&self, sample: SignalSample) -> SignalLogEntry {
        let entry = SignalLogEntry {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            quality: sample.quality(),
            sample,
        };
        let mut log = self.signal_log.lock().unwrap_or_else(|p| p.into_inner());
        if log.len() == SIGNAL_LOG_LEN {
            log.pop_front();
        }
        log.push_back(entry.clone());
        entry
    }

    pub fn signal_log(&self) -> Vec<SignalLogEntry> {
        let log = self.signal_log.lock().unwrap_or_else(|p| p.into_inner());
        log.iter().cloned().collect()
    }
}
