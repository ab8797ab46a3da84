//! Domain data structures for collections, recipients, and dispatch outcomes.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Rendering used for the short date shown in outgoing messages, e.g. `Fri 15` or `Sat  2`.
const DATE_DISPLAY_FORMAT: &str = "%a %e";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Delivery channel a recipient wants to be reached on.
pub enum Method {
    /// SMTP email.
    Email,
    /// Twitter direct message.
    Twitter,
    /// Slack channel message.
    Slack,
}

impl fmt::Display for Method {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Method::Email => "email",
            Method::Twitter => "twitter",
            Method::Slack => "slack",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One notification target from the configuration.
pub struct Recipient {
    /// Channel used to reach the recipient.
    pub method: Method,
    /// Address, handle, or channel id appropriate to `method`.
    pub contact: String,
}

impl Recipient {
    /// Construct a recipient.
    #[must_use]
    pub fn new<C: Into<String>>(method: Method, contact: C) -> Self {
        Self {
            method,
            contact: contact.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single upcoming collection scraped from the council page.
///
/// The display date is always derived from `date`, so the two cannot drift apart.
pub struct CollectionEvent {
    description: String,
    date: NaiveDate,
    date_display: String,
}

impl CollectionEvent {
    /// Build an event, rendering its display date from `date`.
    #[must_use]
    pub fn new<S: Into<String>>(description: S, date: NaiveDate) -> Self {
        Self {
            description: description.into(),
            date,
            date_display: render_date(date),
        }
    }

    /// Human-readable collection type, e.g. `Recycling `.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Day of the collection.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Short weekday plus day-of-month rendering of [`Self::date`].
    #[must_use]
    pub fn date_display(&self) -> &str {
        &self.date_display
    }
}

/// Render a date as abbreviated weekday and space-padded day of month.
#[must_use]
pub fn render_date(date: NaiveDate) -> String {
    date.format(DATE_DISPLAY_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Successful result of handing a message to a channel.
pub enum Delivery {
    /// The channel accepted the message.
    Delivered,
    /// The channel reported a known limitation and the message was dropped on purpose.
    Suppressed(String),
}
