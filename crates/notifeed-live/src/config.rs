//! Feed configuration, loadable from TOML.
//!
//! ```toml
//! api_base = "https://app.example.com"
//! ws_base = "wss://app.example.com"
//! history_path = "/api/notifications/"
//! live_path = "/ws/notifications/{user_id}/"
//! heartbeat_interval_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use notifeed_core::ConnectionTarget;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::session::Credentials;

/// Placeholder in [`FeedConfig::live_path`] replaced by the user id.
pub const USER_ID_PLACEHOLDER: &str = "{user_id}";

/// Query parameter carrying the credential on the live channel.
pub const TOKEN_PARAM: &str = "token";

const REDACTED: &str = "REDACTED";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme {scheme:?} for {field}")]
    UnsupportedScheme { field: &'static str, scheme: String },

    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base of the history endpoint (`http`/`https`).
    pub api_base: String,
    /// Base of the live channel (`ws`/`wss`).
    pub ws_base: String,
    pub history_path: String,
    /// Live channel path; `{user_id}` is substituted.
    pub live_path: String,
    /// Probe resend period while connected; 0 disables.
    pub heartbeat_interval_secs: u64,
    pub connect_timeout_secs: u64,
    /// Whole-request timeout for history calls. Off by default.
    pub request_timeout_secs: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000".to_string(),
            ws_base: "ws://127.0.0.1:8000".to_string(),
            history_path: "/api/notifications/".to_string(),
            live_path: format!("/ws/notifications/{USER_ID_PLACEHOLDER}/"),
            heartbeat_interval_secs: 30,
            connect_timeout_secs: 10,
            request_timeout_secs: None,
        }
    }
}

impl FeedConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check that both bases parse and use the right schemes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let api = parse_url(&self.api_base)?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                field: "api_base",
                scheme: api.scheme().to_string(),
            });
        }
        let ws = parse_url(&self.ws_base)?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(ConfigError::UnsupportedScheme {
                field: "ws_base",
                scheme: ws.scheme().to_string(),
            });
        }
        Ok(())
    }

    pub fn history_url(&self) -> Result<Url, ConfigError> {
        parse_url(&join(&self.api_base, &self.history_path))
    }

    /// Live channel address for `creds`, with the token as a query parameter
    /// since the websocket handshake carries no custom headers.
    pub fn live_target(&self, creds: &Credentials) -> Result<ConnectionTarget, ConfigError> {
        let path = self.live_path.replace(USER_ID_PLACEHOLDER, &creds.user_id);
        let base = parse_url(&join(&self.ws_base, &path))?;

        let mut url = base.clone();
        url.query_pairs_mut().append_pair(TOKEN_PARAM, &creds.token);
        let mut redacted = base;
        redacted.query_pairs_mut().append_pair(TOKEN_PARAM, REDACTED);

        Ok(ConnectionTarget::new(url.to_string(), redacted.to_string()))
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}
