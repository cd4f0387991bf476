// Dispatcher - turns an emergency event into SMS/share plus an audit trail
use crate::application::action_guard::ActionGuard;
use crate::application::ports::{ContactStore, EventSink, LocationProvider, ShareChannel, SmsChannel};
use crate::domain::alert::{maps_link, AlertRecord, EmergencyEvent, Scenario};
use crate::domain::contact::Contact;
use crate::domain::error::SosError;
use crate::domain::reading::Position;
use crate::infrastructure::config::{render_template, MessageTemplates};
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// SMS handed to the channel for every contact
    Sent,
    /// SMS unavailable; the share action was invoked instead
    Shared,
    NoContacts,
    Failed,
    AlreadyInProgress,
}

impl DispatchOutcome {
    fn status(&self) -> &'static str {
        match self {
            DispatchOutcome::Sent => "sent",
            DispatchOutcome::Shared => "shared",
            _ => "failed",
        }
    }
}

#[derive(Debug)]
pub struct DispatchReport {
    pub outcome: DispatchOutcome,
    pub message: Option<String>,
    /// Sent without a location link
    pub degraded: bool,
    pub recipients: usize,
    /// Plain-language notices for the user, in the order they arose
    pub notices: Vec<String>,
    /// Background append of the alert records; resolves to the number written
    pub audit: Option<JoinHandle<usize>>,
}

impl DispatchReport {
    fn aborted(outcome: DispatchOutcome, notices: Vec<String>) -> Self {
        Self {
            outcome,
            message: None,
            degraded: false,
            recipients: 0,
            notices,
            audit: None,
        }
    }
}

/// Shared channels every dispatcher talks to
#[derive(Clone)]
pub struct DispatchChannels {
    pub location: Arc<dyn LocationProvider>,
    pub contacts: Arc<dyn ContactStore>,
    pub sms: Arc<dyn SmsChannel>,
    pub share: Arc<dyn ShareChannel>,
    pub sink: Arc<dyn EventSink>,
}

/// One dispatcher per session; a second dispatch while one is in flight is rejected
pub struct Dispatcher {
    channels: DispatchChannels,
    templates: MessageTemplates,
    guard: ActionGuard,
}

impl Dispatcher {
    pub fn new(channels: DispatchChannels, templates: MessageTemplates) -> Self {
        Self {
            channels,
            templates,
            guard: ActionGuard::new(),
        }
    }

    /// Fresh dispatcher over the same channels with its own in-progress guard
    pub fn for_session(&self) -> Self {
        Self::new(self.channels.clone(), self.templates.clone())
    }

    pub fn is_dispatching(&self) -> bool {
        self.guard.is_in_progress()
    }

    pub fn compose_message(&self, scenario: Scenario, position: Option<&Position>) -> String {
        let link = match position {
            Some(p) => maps_link(p.latitude, p.longitude),
            None => self.templates.location_unavailable.clone(),
        };
        let mut vars = HashMap::new();
        vars.insert("maps_url".to_string(), link);
        render_template(self.templates.template(scenario), &vars)
    }

    pub async fn dispatch(&self, scenario: Scenario, event: &EmergencyEvent) -> DispatchReport {
        let Some(ticket) = self.guard.begin() else {
            tracing::warn!("{} dispatch already in progress, ignoring {:?}", scenario, event.trigger);
            return DispatchReport::aborted(
                DispatchOutcome::AlreadyInProgress,
                vec!["An SOS is already being sent.".to_string()],
            );
        };

        let mut notices = Vec::new();

        // 1. Location: missing location degrades the message, it never blocks it
        let position = match self.channels.location.current_position().await {
            Ok(position) => Some(position),
            Err(e) => {
                tracing::warn!("{} dispatch without location: {}", scenario, e);
                notices.push(format!("{} Sending without your location.", e.notice()));
                None
            }
        };

        // 2. Contacts
        let contacts = match self.channels.contacts.load_contacts().await {
            Ok(contacts) if !contacts.is_empty() => contacts,
            Ok(_) | Err(SosError::StorageMiss(_)) => {
                tracing::warn!("{} dispatch aborted: no contacts configured", scenario);
                notices.push(SosError::StorageMiss("emergency contacts".to_string()).notice());
                ticket.complete();
                return DispatchReport::aborted(DispatchOutcome::NoContacts, notices);
            }
            Err(e) => {
                tracing::error!("{} dispatch aborted: contacts unreadable: {}", scenario, e);
                notices.push("Could not read your emergency contacts.".to_string());
                ticket.complete();
                return DispatchReport::aborted(DispatchOutcome::Failed, notices);
            }
        };

        // 3. Message
        let message = self.compose_message(scenario, position.as_ref());

        // 4. SMS, or the share action when SMS is unavailable
        let outcome = if self.channels.sms.is_available().await {
            match self.channels.sms.send(&contacts, &message).await {
                Ok(()) => DispatchOutcome::Sent,
                Err(e) => {
                    tracing::error!("{} SMS send failed: {}", scenario, e);
                    notices.push("Failed to send SOS. Please try again.".to_string());
                    DispatchOutcome::Failed
                }
            }
        } else {
            tracing::info!("{} SMS unavailable, falling back to share", scenario);
            match self.channels.share.share(&message).await {
                Ok(()) => DispatchOutcome::Shared,
                Err(e) => {
                    tracing::error!("{} share fallback failed: {}", scenario, e);
                    notices.push("Failed to send SOS. Please try again.".to_string());
                    DispatchOutcome::Failed
                }
            }
        };

        // 5. Audit trail, fire-and-forget
        let records = build_records(scenario, position.as_ref(), &contacts, outcome);
        let audit = spawn_audit(self.channels.sink.clone(), records);

        tracing::info!(
            "{} dispatch {:?} to {} contacts (trigger {:?}, location {})",
            scenario,
            outcome,
            contacts.len(),
            event.trigger,
            if position.is_some() { "attached" } else { "missing" }
        );

        ticket.complete();
        DispatchReport {
            outcome,
            message: Some(message),
            degraded: position.is_none(),
            recipients: contacts.len(),
            notices,
            audit: Some(audit),
        }
    }
}

fn build_records(
    scenario: Scenario,
    position: Option<&Position>,
    contacts: &[Contact],
    outcome: DispatchOutcome,
) -> Vec<AlertRecord> {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    contacts
        .iter()
        .map(|contact| AlertRecord {
            timestamp: timestamp.clone(),
            latitude: position.map(|p| p.latitude),
            longitude: position.map(|p| p.longitude),
            contact: contact.as_str().to_string(),
            method: scenario.method().to_string(),
            status: Some(outcome.status().to_string()),
        })
        .collect()
}

fn spawn_audit(sink: Arc<dyn EventSink>, records: Vec<AlertRecord>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut written = 0;
        for record in &records {
            match sink.append(record).await {
                Ok(()) => written += 1,
                Err(e) => tracing::warn!("alert log for {} not written: {}", record.contact, e),
            }
        }
        tracing::debug!("alert log: {}/{} records written", written, records.len());
        written
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{fake_channels, Fakes};
    use crate::domain::alert::Trigger;
    use crate::domain::reading::Position;

    fn event() -> EmergencyEvent {
        EmergencyEvent::new(Trigger::Button, 0)
    }

    #[tokio::test]
    async fn test_no_contacts_never_sends() {
        let fakes = Fakes::new().with_position(Position::new(1.0, 2.0, 5.0, 0));
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        let report = dispatcher.dispatch(Scenario::Home, &event()).await;

        assert_eq!(report.outcome, DispatchOutcome::NoContacts);
        assert!(fakes.sms.sent().is_empty());
        assert!(fakes.share.shared().is_empty());
        assert_eq!(
            report.notices,
            vec!["No emergency contacts configured. Please add one in Settings.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_saved_list_counts_as_no_contacts() {
        let fakes = Fakes::new().with_contacts(&[]);
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        let report = dispatcher.dispatch(Scenario::Home, &event()).await;
        assert_eq!(report.outcome, DispatchOutcome::NoContacts);
        assert!(fakes.sms.sent().is_empty());
    }

    #[tokio::test]
    async fn test_sms_to_all_contacts_and_one_record_each() {
        let fakes = Fakes::new()
            .with_contacts(&["111", "222"])
            .with_position(Position::new(12.34, 56.78, 5.0, 0))
            .with_sms(true);
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        let report = dispatcher.dispatch(Scenario::Home, &event()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert!(!report.degraded);
        let expected = "🚨 SOS Alert!\nI'm in danger. My location: https://maps.google.com/?q=12.34,56.78";
        assert_eq!(report.message.as_deref(), Some(expected));

        let sent = fakes.sms.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["111".to_string(), "222".to_string()]);
        assert_eq!(sent[0].1, expected);

        let written = report.audit.unwrap().await.unwrap();
        assert_eq!(written, 2);
        let records = fakes.sink.records();
        assert_eq!(records[0].contact, "111");
        assert_eq!(records[1].method, "shake or button");
        assert_eq!(records[1].latitude, Some(12.34));
        assert_eq!(records[1].status.as_deref(), Some("sent"));
    }

    #[tokio::test]
    async fn test_share_fallback_uses_identical_message() {
        let fakes = Fakes::new()
            .with_contacts(&["111"])
            .with_position(Position::new(1.5, 2.5, 5.0, 0))
            .with_sms(false);
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        let report = dispatcher.dispatch(Scenario::DisguiseNews, &event()).await;

        assert_eq!(report.outcome, DispatchOutcome::Shared);
        assert!(fakes.sms.sent().is_empty());
        assert_eq!(fakes.share.shared(), vec![report.message.clone().unwrap()]);
        assert_eq!(
            report.message.as_deref(),
            Some("🚨 I need help! My location: https://maps.google.com/?q=1.5,2.5")
        );
    }

    #[tokio::test]
    async fn test_missing_location_degrades() {
        let fakes = Fakes::new().with_contacts(&["111"]).with_sms(true);
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        let report = dispatcher.dispatch(Scenario::Fire, &event()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert!(report.degraded);
        assert_eq!(
            report.message.as_deref(),
            Some("🔥 Fire Emergency! I need help. My location: unavailable")
        );
        assert!(report.notices[0].starts_with("Location permission is required"));

        report.audit.unwrap().await.unwrap();
        assert_eq!(fakes.sink.records()[0].latitude, None);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let fakes = Fakes::new()
            .with_contacts(&["111", "222"])
            .with_sms(true)
            .with_failing_sink();
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        let report = dispatcher.dispatch(Scenario::Trekking, &event()).await;

        assert_eq!(report.outcome, DispatchOutcome::Sent);
        assert_eq!(report.audit.unwrap().await.unwrap(), 0);
        assert!(report.notices.iter().all(|n| !n.contains("log")));
    }

    #[tokio::test]
    async fn test_send_failure_reported() {
        let fakes = Fakes::new().with_contacts(&["111"]).with_failing_sms();
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        let report = dispatcher.dispatch(Scenario::Home, &event()).await;
        assert_eq!(report.outcome, DispatchOutcome::Failed);
        report.audit.unwrap().await.unwrap();
        assert_eq!(fakes.sink.records()[0].status.as_deref(), Some("failed"));
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_rejected() {
        let fakes = Fakes::new().with_contacts(&["111"]).with_sms(true);
        let dispatcher = Dispatcher::new(fake_channels(&fakes), MessageTemplates::default());

        assert!(dispatcher.guard.try_start());
        let report = dispatcher.dispatch(Scenario::Home, &event()).await;
        assert_eq!(report.outcome, DispatchOutcome::AlreadyInProgress);
        assert!(fakes.sms.sent().is_empty());

        dispatcher.guard.finish();
        let report = dispatcher.dispatch(Scenario::Home, &event()).await;
        assert_eq!(report.outcome, DispatchOutcome::Sent);
    }
}
