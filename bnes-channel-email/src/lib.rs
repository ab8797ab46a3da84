//! Channel delivering reminders as subject-only emails over STARTTLS SMTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use bnes_core::{
    config::EmailSenderConfig,
    model::{Delivery, Method, Recipient},
    ports::{DispatchError, NotificationChannel},
};

/// Email channel bound to one SMTP submission account.
pub struct EmailChannel {
    sender: EmailSenderConfig,
    timeout: Duration,
}

impl EmailChannel {
    /// Create a channel sending from `sender`, bounding each SMTP session by `timeout`.
    #[must_use]
    pub fn new(sender: EmailSenderConfig, timeout: Duration) -> Self {
        Self { sender, timeout }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DispatchError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.sender.host)
            .map_err(|err| DispatchError::transport(Method::Email, err))?
            .port(self.sender.port)
            .credentials(Credentials::new(
                self.sender.username.clone(),
                self.sender.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();
        Ok(transport)
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn method(&self) -> Method {
        Method::Email
    }

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<Delivery, DispatchError> {
        let message = build_message(&self.sender, &recipient.contact, text)?;

        // One session per message; nothing is pooled between recipients.
        self.transport()?
            .send(message)
            .await
            .map_err(|err| DispatchError::transport(Method::Email, err))?;

        Ok(Delivery::Delivered)
    }
}

/// Build the channel for the registry.
#[must_use]
pub fn channel(sender: EmailSenderConfig, timeout: Duration) -> Arc<dyn NotificationChannel> {
    Arc::new(EmailChannel::new(sender, timeout))
}

// Plain-text email whose subject carries the reminder and whose body is empty.
fn build_message(
    sender: &EmailSenderConfig,
    contact: &str,
    subject: &str,
) -> Result<Message, DispatchError> {
    let from_address = sender
        .username
        .parse::<Address>()
        .map_err(|err| DispatchError::invalid_contact(&sender.username, err))?;
    let to = contact
        .trim()
        .parse::<Mailbox>()
        .map_err(|err| DispatchError::invalid_contact(contact, err))?;

    Message::builder()
        .from(Mailbox::new(Some(sender.name.clone()), from_address))
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(String::new())
        .map_err(|err| DispatchError::transport(Method::Email, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(host: &str, port: u16) -> EmailSenderConfig {
        EmailSenderConfig {
            username: "bins@example.com".into(),
            password: "hunter2".into(),
            host: host.into(),
            port,
            name: "Bin Bot".into(),
        }
    }

    #[test]
    fn message_uses_reminder_as_subject() {
        let message = build_message(
            &sender("smtp.example.com", 587),
            "someone@example.com",
            "Recycling tomorrow, Fri 15",
        )
        .expect("valid message");

        let raw = String::from_utf8(message.formatted()).expect("ascii headers");
        assert!(raw.contains("Subject: Recycling tomorrow, Fri 15"));
        assert!(raw.contains("To: someone@example.com"));
        assert!(raw.contains("Bin Bot"));
        assert!(raw.contains("<bins@example.com>"));
    }

    #[test]
    fn rejects_malformed_contact() {
        let result = build_message(&sender("smtp.example.com", 587), "not an address", "hi");
        assert!(matches!(result, Err(DispatchError::InvalidContact { .. })));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Grab a free port and release it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .map(|addr| addr.port())
            .expect("free port");
        let channel = EmailChannel::new(sender("127.0.0.1", port), Duration::from_secs(5));

        let result = channel
            .send(&Recipient::new(Method::Email, "someone@example.com"), "hi")
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::Transport {
                channel: Method::Email,
                ..
            })
        ));
    }
}
