//! Channel posting reminders to Slack through the Web API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use bnes_core::{
    config::SlackLoginConfig,
    model::{Delivery, Method, Recipient},
    ports::{DispatchError, NotificationChannel},
};

const BASE_URL: &str = "https://slack.com/api";

/// Body of chat.postMessage
#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Response envelope shared by every Web API method.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Slack channel authenticated with a bot token.
pub struct SlackChannel {
    client: Client,
    bot_token: String,
    base_url: String,
}

impl SlackChannel {
    /// Create a channel bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, login: SlackLoginConfig) -> Self {
        Self::with_base_url(client, login, BASE_URL)
    }

    /// Create a channel talking to a different Web API root.
    #[must_use]
    pub fn with_base_url(client: Client, login: SlackLoginConfig, base_url: &str) -> Self {
        Self {
            client,
            bot_token: login.bot_token,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn method(&self) -> Method {
        Method::Slack
    }

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<Delivery, DispatchError> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(&PostMessage {
                channel: &recipient.contact,
                text,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<ApiResponse>()
            .await?;

        interpret(response)
    }
}

/// Build the channel for the registry.
#[must_use]
pub fn channel(client: Client, login: SlackLoginConfig) -> Arc<dyn NotificationChannel> {
    Arc::new(SlackChannel::new(client, login))
}

// Slack answers 200 even on failure; `ok` is the only success signal.
fn interpret(response: ApiResponse) -> Result<Delivery, DispatchError> {
    if response.ok {
        Ok(Delivery::Delivered)
    } else {
        Err(DispatchError::Rejected {
            channel: Method::Slack,
            reason: response.error.unwrap_or_else(|| "unknown error".to_owned()),
        })
    }
}
