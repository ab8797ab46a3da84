//! Notifier fanning one collection out to every configured recipient.

use std::sync::Arc;

use crate::model::{CollectionEvent, Delivery, Recipient};
use crate::ports::DispatchError;
use crate::registry::ChannelRegistry;

/// Outcome of dispatching one message to one recipient.
#[derive(Debug)]
pub struct RecipientReport {
    /// Who the message was for.
    pub recipient: Recipient,
    /// What the channel reported.
    pub result: Result<Delivery, DispatchError>,
}

/// What happened to the message for one event.
#[derive(Debug)]
pub enum NotifyOutcome {
    /// Sending is disabled; the message was only rendered.
    Previewed,
    /// The message was handed to each recipient's channel.
    Dispatched(Vec<RecipientReport>),
}

/// Result of notifying about one event.
#[derive(Debug)]
pub struct Notification {
    /// Text that was (or would have been) sent.
    pub message: String,
    /// Per-recipient results, or preview.
    pub outcome: NotifyOutcome,
}

impl Notification {
    /// Number of recipients whose dispatch failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        match &self.outcome {
            NotifyOutcome::Previewed => 0,
            NotifyOutcome::Dispatched(reports) => reports
                .iter()
                .filter(|report| report.result.is_err())
                .count(),
        }
    }
}

/// Compose the reminder text for an event.
///
/// The description carries its own trailing space from the page wording.
#[must_use]
pub fn compose_message(event: &CollectionEvent) -> String {
    format!("{}tomorrow, {}", event.description(), event.date_display())
}

/// Sends reminders through the registered channels.
pub struct Notifier {
    registry: Arc<ChannelRegistry>,
    send_notification: bool,
}

impl Notifier {
    /// Create a notifier; with `send_notification` off every call is a preview.
    #[must_use]
    pub fn new(registry: Arc<ChannelRegistry>, send_notification: bool) -> Self {
        Self {
            registry,
            send_notification,
        }
    }

    /// Notify every recipient about `event`.
    ///
    /// Recipients are tried in order and a failure never stops the remaining ones.
    pub async fn notify(&self, event: &CollectionEvent, recipients: &[Recipient]) -> Notification {
        let message = compose_message(event);

        if !self.send_notification {
            tracing::info!(%message, "notifications disabled, previewing");
            return Notification {
                message,
                outcome: NotifyOutcome::Previewed,
            };
        }

        let mut reports = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let result = self.dispatch(recipient, &message).await;
            match &result {
                Ok(Delivery::Delivered) => {
                    tracing::info!(method = %recipient.method, contact = %recipient.contact, "notification sent");
                }
                Ok(Delivery::Suppressed(reason)) => {
                    tracing::info!(method = %recipient.method, contact = %recipient.contact, reason, "notification suppressed");
                }
                Err(err) => {
                    tracing::warn!(method = %recipient.method, contact = %recipient.contact, error = %err, "notification failed");
                }
            }
            reports.push(RecipientReport {
                recipient: recipient.clone(),
                result,
            });
        }

        Notification {
            message,
            outcome: NotifyOutcome::Dispatched(reports),
        }
    }

    async fn dispatch(&self, recipient: &Recipient, message: &str) -> Result<Delivery, DispatchError> {
        let channel = self.registry.channel(recipient.method)?;
        channel.send(recipient, message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::model::Method;
    use crate::ports::NotificationChannel;

    // Records every send and answers with a fixed result.
    struct StubChannel {
        method: Method,
        fail: bool,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl StubChannel {
        fn new(method: Method, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                method,
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl NotificationChannel for StubChannel {
        fn method(&self) -> Method {
            self.method
        }

        async fn send(&self, recipient: &Recipient, text: &str) -> Result<Delivery, DispatchError> {
            self.sent
                .lock()
                .expect("lock")
                .push((recipient.contact.clone(), text.to_owned()));
            if self.fail {
                Err(DispatchError::Rejected {
                    channel: self.method,
                    reason: "unreachable".into(),
                })
            } else {
                Ok(Delivery::Delivered)
            }
        }
    }

    fn event() -> CollectionEvent {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid test date");
        CollectionEvent::new("Recycling ", date)
    }

    fn registry(channels: &[Arc<StubChannel>]) -> Arc<ChannelRegistry> {
        Arc::new(ChannelRegistry::new(
            channels
                .iter()
                .map(|channel| Arc::clone(channel) as Arc<dyn NotificationChannel>)
                .collect(),
        ))
    }

    #[test]
    fn message_keeps_description_spacing() {
        assert_eq!(compose_message(&event()), "Recycling tomorrow, Fri 15");
        let unspaced = CollectionEvent::new("Refuse", event().date());
        assert_eq!(compose_message(&unspaced), "Refusetomorrow, Fri 15");
    }

    #[tokio::test]
    async fn preview_mode_sends_nothing() {
        let email = StubChannel::new(Method::Email, false);
        let slack = StubChannel::new(Method::Slack, false);
        let notifier = Notifier::new(registry(&[Arc::clone(&email), Arc::clone(&slack)]), false);
        let recipients = [
            Recipient::new(Method::Email, "a@example.com"),
            Recipient::new(Method::Slack, "C1"),
        ];

        let notification = notifier.notify(&event(), &recipients).await;

        assert_eq!(notification.message, "Recycling tomorrow, Fri 15");
        assert!(matches!(notification.outcome, NotifyOutcome::Previewed));
        assert!(email.sent().is_empty());
        assert!(slack.sent().is_empty());
    }

    #[tokio::test]
    async fn failure_does_not_stop_later_recipients() {
        let email = StubChannel::new(Method::Email, true);
        let slack = StubChannel::new(Method::Slack, false);
        let notifier = Notifier::new(registry(&[Arc::clone(&email), Arc::clone(&slack)]), true);
        let recipients = [
            Recipient::new(Method::Email, "a@example.com"),
            Recipient::new(Method::Slack, "C1"),
        ];

        let notification = notifier.notify(&event(), &recipients).await;

        assert_eq!(notification.failures(), 1);
        assert_eq!(
            slack.sent(),
            vec![("C1".to_owned(), "Recycling tomorrow, Fri 15".to_owned())]
        );
        let NotifyOutcome::Dispatched(reports) = notification.outcome else {
            panic!("expected dispatch");
        };
        assert!(matches!(reports[0].result, Err(DispatchError::Rejected { .. })));
        assert!(matches!(reports[1].result, Ok(Delivery::Delivered)));
    }

    #[tokio::test]
    async fn missing_channel_is_reported_per_recipient() {
        let slack = StubChannel::new(Method::Slack, false);
        let notifier = Notifier::new(registry(&[Arc::clone(&slack)]), true);
        let recipients = [
            Recipient::new(Method::Twitter, "12345"),
            Recipient::new(Method::Slack, "C1"),
        ];

        let notification = notifier.notify(&event(), &recipients).await;

        let NotifyOutcome::Dispatched(reports) = notification.outcome else {
            panic!("expected dispatch");
        };
        assert!(matches!(
            reports[0].result,
            Err(DispatchError::ChannelUnavailable(Method::Twitter))
        ));
        assert_eq!(slack.sent().len(), 1);
    }
}
