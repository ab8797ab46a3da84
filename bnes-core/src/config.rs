//! Run configuration loaded once from the YAML config file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::model::{Method, Recipient};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading or validating the configuration.
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid YAML for [`RunConfig`].
    #[error("Malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The document parsed but holds unusable values.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
/// Process-wide settings for one run.
pub struct RunConfig {
    /// Council page listing the upcoming collections.
    #[serde(rename = "target-url")]
    pub target_url: String,
    /// When false, messages are only previewed and never dispatched.
    #[serde(rename = "SEND_NOTIFICATION")]
    pub send_notification: bool,
    /// Notify about every collection, not only tomorrow's.
    #[serde(rename = "ignore-date-check", default)]
    pub ignore_date_check: bool,
    /// People to notify.
    #[serde(default)]
    pub users: Vec<Recipient>,
    /// SMTP submission account.
    #[serde(rename = "email-sender", default)]
    pub email_sender: Option<EmailSenderConfig>,
    /// Twitter application and account keys.
    #[serde(rename = "twitter-api", default)]
    pub twitter_api: Option<TwitterApiConfig>,
    /// Slack bot login.
    #[serde(rename = "slack_login", default)]
    pub slack_login: Option<SlackLoginConfig>,
    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Where bodies of failed page fetches are written.
    #[serde(rename = "diagnostics-dir", default = "default_diagnostics_dir")]
    pub diagnostics_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
/// SMTP account used to send email notifications.
pub struct EmailSenderConfig {
    /// Login name, also used as the sender address.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Submission server host.
    pub host: String,
    /// Submission server port.
    pub port: u16,
    /// Display name for the From header.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
/// OAuth 1.0a keys for the Twitter account sending direct messages.
pub struct TwitterApiConfig {
    /// Application consumer key.
    pub consumer_key: String,
    /// Application consumer secret.
    pub consumer_secret: String,
    /// Account access token.
    pub access_key: String,
    /// Account access token secret.
    pub access_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Slack bot credentials.
pub struct SlackLoginConfig {
    /// Bot user OAuth token (`xoxb-...`).
    pub bot_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Settings applied to every network call.
pub struct HttpConfig {
    /// Upper bound for a single request or SMTP session, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User agent sent with HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Log level and log file.
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// File receiving a copy of every log line.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("bnes/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("bnes.log")
}

fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from(".")
}

impl RunConfig {
    /// Read, parse, and validate the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable, malformed, or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the document is malformed or invalid.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that the YAML schema alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.target_url)
            .map_err(|err| ConfigError::Invalid(format!("target-url: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "target-url must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout-secs must be greater than zero".into(),
            ));
        }

        for user in &self.users {
            if user.contact.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{} recipient has an empty contact",
                    user.method
                )));
            }
            if self.send_notification && !self.has_credentials(user.method) {
                return Err(ConfigError::Invalid(format!(
                    "recipient {} uses {} but no credentials are configured for it",
                    user.contact, user.method
                )));
            }
        }

        Ok(())
    }

    /// Whether the credential block for `method` is present.
    #[must_use]
    pub fn has_credentials(&self, method: Method) -> bool {
        match method {
            Method::Email => self.email_sender.is_some(),
            Method::Twitter => self.twitter_api.is_some(),
            Method::Slack => self.slack_login.is_some(),
        }
    }
}
