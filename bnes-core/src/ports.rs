//! Traits describing notification channels and their shared error type.

use std::error::Error as StdError;

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{Delivery, Method, Recipient};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while delivering a message to one recipient.
pub enum DispatchError {
    /// HTTP layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Channel-specific transport (e.g. SMTP) failed.
    #[error("{channel} transport error: {source}")]
    Transport {
        /// Channel that failed.
        channel: Method,
        /// Underlying transport error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// The remote API answered but refused the message.
    #[error("{channel} rejected the message: {reason}")]
    Rejected {
        /// Channel that refused the message.
        channel: Method,
        /// Reason reported by the remote side.
        reason: String,
    },
    /// Contact or sender address is not usable for the channel.
    #[error("Invalid contact {contact:?}: {reason}")]
    InvalidContact {
        /// The offending contact value.
        contact: String,
        /// Why it was rejected.
        reason: String,
    },
    /// No channel is registered for the recipient's method.
    #[error("No {0} channel configured")]
    ChannelUnavailable(Method),
}

impl DispatchError {
    /// Wrap a transport failure for `channel`.
    pub fn transport<E>(channel: Method, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Transport {
            channel,
            source: Box::new(source),
        }
    }

    /// Build an invalid-contact error.
    pub fn invalid_contact(contact: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidContact {
            contact: contact.into(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
/// A single delivery channel such as email, Twitter, or Slack.
pub trait NotificationChannel: Send + Sync {
    /// Recipient method handled by this channel.
    fn method(&self) -> Method;

    /// Deliver `text` to `recipient`.
    ///
    /// Known benign conditions are reported as [`Delivery::Suppressed`] rather than as errors.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the message could not be delivered.
    async fn send(&self, recipient: &Recipient, text: &str) -> Result<Delivery, DispatchError>;
}
