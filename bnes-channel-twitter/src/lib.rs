//! Channel sending reminders as Twitter direct messages through the v1.1 API.

mod oauth;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use bnes_core::{
    config::TwitterApiConfig,
    model::{Delivery, Method, Recipient},
    ports::{DispatchError, NotificationChannel},
};

const BASE_URL: &str = "https://api.twitter.com/1.1";

// "You cannot send messages to users who are not following you" and
// "You cannot send messages to this user".
const NOT_FOLLOWING_CODES: [u32; 2] = [150, 349];

/// Body of POST /direct_messages/events/new.json
#[derive(Debug, Serialize)]
struct NewDirectMessage<'a> {
    event: MessageEvent<'a>,
}

#[derive(Debug, Serialize)]
struct MessageEvent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message_create: MessageCreate<'a>,
}

#[derive(Debug, Serialize)]
struct MessageCreate<'a> {
    target: Target<'a>,
    message_data: MessageData<'a>,
}

#[derive(Debug, Serialize)]
struct Target<'a> {
    recipient_id: &'a str,
}

#[derive(Debug, Serialize)]
struct MessageData<'a> {
    text: &'a str,
}

/// Successful answer to a new direct message; only the presence of `event` matters.
#[derive(Debug, Deserialize)]
struct DirectMessageResponse {
    #[serde(default)]
    event: Option<IgnoredAny>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u32,
    message: String,
}

/// User as returned by /users/show.json
#[derive(Debug, Deserialize)]
struct User {
    id_str: String,
}

/// Twitter channel signing requests with the configured account keys.
pub struct TwitterChannel {
    client: Client,
    keys: TwitterApiConfig,
    base_url: String,
}

impl TwitterChannel {
    /// Create a channel bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, keys: TwitterApiConfig) -> Self {
        Self::with_base_url(client, keys, BASE_URL)
    }

    /// Create a channel talking to a different API root.
    #[must_use]
    pub fn with_base_url(client: Client, keys: TwitterApiConfig, base_url: &str) -> Self {
        Self {
            client,
            keys,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn authorization(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let now = Utc::now();
        let nonce = format!(
            "{:x}{:x}",
            now.timestamp_nanos_opt().unwrap_or_default(),
            std::process::id()
        );
        oauth::authorization_header(&self.keys, method, url, params, &nonce, now.timestamp())
    }

    // Contacts made only of digits are user ids; anything else is a screen name.
    async fn resolve_recipient(&self, contact: &str) -> Result<String, DispatchError> {
        let handle = contact.trim().trim_start_matches('@');
        if handle.is_empty() {
            return Err(DispatchError::invalid_contact(contact, "empty Twitter handle"));
        }
        if handle.chars().all(|ch| ch.is_ascii_digit()) {
            return Ok(handle.to_owned());
        }

        let url = format!("{}/users/show.json", self.base_url);
        let params = [("screen_name", handle)];
        let response = self
            .client
            .get(&url)
            .query(&params)
            .header(AUTHORIZATION, self.authorization("GET", &url, &params))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                channel: Method::Twitter,
                reason: describe_errors(status, &parse_errors(&body)),
            });
        }

        let user = serde_json::from_str::<User>(&body)
            .map_err(|err| DispatchError::transport(Method::Twitter, err))?;
        Ok(user.id_str)
    }
}

#[async_trait]
impl NotificationChannel for TwitterChannel {
    fn method(&self) -> Method {
        Method::Twitter
    }

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<Delivery, DispatchError> {
        let recipient_id = self.resolve_recipient(&recipient.contact).await?;

        let url = format!("{}/direct_messages/events/new.json", self.base_url);
        let request = NewDirectMessage {
            event: MessageEvent {
                kind: "message_create",
                message_create: MessageCreate {
                    target: Target {
                        recipient_id: &recipient_id,
                    },
                    message_data: MessageData { text },
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.authorization("POST", &url, &[]))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        classify(status, &body)
    }
}

/// Build the channel for the registry.
#[must_use]
pub fn channel(client: Client, keys: TwitterApiConfig) -> Arc<dyn NotificationChannel> {
    Arc::new(TwitterChannel::new(client, keys))
}

// Sort a direct message response into delivered, suppressed, or failed.
fn classify(status: StatusCode, body: &str) -> Result<Delivery, DispatchError> {
    if status.is_success() {
        let parsed = serde_json::from_str::<DirectMessageResponse>(body)
            .map_err(|err| DispatchError::transport(Method::Twitter, err))?;
        return Ok(match parsed.event {
            Some(_) => Delivery::Delivered,
            None => Delivery::Suppressed(
                "response carried no message event; the account likely does not follow the recipient"
                    .to_owned(),
            ),
        });
    }

    let errors = parse_errors(body);
    if let Some(not_following) = errors
        .errors
        .iter()
        .find(|error| NOT_FOLLOWING_CODES.contains(&error.code))
    {
        return Ok(Delivery::Suppressed(not_following.message.clone()));
    }

    Err(DispatchError::Rejected {
        channel: Method::Twitter,
        reason: describe_errors(status, &errors),
    })
}

fn parse_errors(body: &str) -> ErrorResponse {
    serde_json::from_str(body).unwrap_or_default()
}

fn describe_errors(status: StatusCode, errors: &ErrorResponse) -> String {
    if errors.errors.is_empty() {
        return format!("HTTP {status}");
    }
    errors
        .errors
        .iter()
        .map(|error| format!("{} (code {})", error.message, error.code))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    fn test_client() -> Client {
        Client::builder().no_proxy().build().expect("test client")
    }

    fn keys() -> TwitterApiConfig {
        TwitterApiConfig {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_key: "ak".into(),
            access_secret: "as".into(),
        }
    }

    // Answers one request and hands back the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0_u8; 4096];
            while !request.ends_with(b"}") {
                let read = socket.read(&mut buf).await.expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(buf.get(..read).unwrap_or_default());
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}/1.1"), handle)
    }

    #[test]
    fn event_in_response_is_delivered() {
        let result = classify(
            StatusCode::OK,
            r#"{"event":{"type":"message_create","id":"1"}}"#,
        );
        assert!(matches!(result, Ok(Delivery::Delivered)));
    }

    #[test]
    fn missing_event_is_suppressed() {
        let result = classify(StatusCode::OK, "{}");
        assert!(matches!(result, Ok(Delivery::Suppressed(_))));
    }

    #[test]
    fn not_following_errors_are_suppressed() {
        let result = classify(
            StatusCode::FORBIDDEN,
            r#"{"errors":[{"code":150,"message":"You cannot send messages to users who are not following you."}]}"#,
        );
        match result {
            Ok(Delivery::Suppressed(reason)) => assert!(reason.contains("not following")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn other_errors_are_rejected() {
        let result = classify(
            StatusCode::UNAUTHORIZED,
            r#"{"errors":[{"code":32,"message":"Could not authenticate you."}]}"#,
        );
        match result {
            Err(DispatchError::Rejected { channel, reason }) => {
                assert_eq!(channel, Method::Twitter);
                assert_eq!(reason, "Could not authenticate you. (code 32)");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let opaque = classify(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(opaque, Err(DispatchError::Rejected { .. })));
    }

    #[tokio::test]
    async fn numeric_contact_needs_no_lookup() {
        let channel = TwitterChannel::with_base_url(test_client(), keys(), "http://127.0.0.1:9");
        let id = channel
            .resolve_recipient("@12345")
            .await
            .expect("numeric id");
        assert_eq!(id, "12345");
    }

    #[tokio::test]
    async fn sends_signed_direct_message() {
        let (base_url, server) =
            serve_once("200 OK", r#"{"event":{"type":"message_create","id":"9"}}"#).await;
        let channel = TwitterChannel::with_base_url(test_client(), keys(), &base_url);

        let result = channel
            .send(&Recipient::new(Method::Twitter, "12345"), "Refuse tomorrow, Fri 15")
            .await;

        assert!(matches!(result, Ok(Delivery::Delivered)));
        let request = server.await.expect("server task");
        assert!(request.starts_with("POST /1.1/direct_messages/events/new.json "));
        assert!(request.contains("OAuth oauth_consumer_key=\"ck\""));
        assert!(request.contains(r#""recipient_id":"12345""#));
        assert!(request.contains(r#""text":"Refuse tomorrow, Fri 15""#));
    }
}
