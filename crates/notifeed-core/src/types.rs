use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::FeedError;

// ─── Identifiers ──────────────────────────────────────────────────

/// Server-assigned notification id, carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Number(i64),
    Text(String),
}

impl NotificationId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => Some(
                n.as_i64()
                    .map(Self::Number)
                    .unwrap_or_else(|| Self::Text(n.to_string())),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ─── Raw payload ──────────────────────────────────────────────────

/// A server payload as delivered by either transport: a JSON object with
/// `id`, `title`, `message`, `event`, `created_at` and a topic field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Parse a live-channel text frame.
    pub fn parse_frame(text: &str) -> Result<Self, FeedError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FeedError::MalformedFrame(e.to_string()))?;
        Self::from_value(value)
            .ok_or_else(|| FeedError::MalformedFrame("frame is not a JSON object".into()))
    }

    /// String field lookup. Non-string values count as absent.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Topic field: `event_type`, falling back to `type` when `event_type`
    /// is absent or empty.
    pub fn topic(&self) -> Option<&str> {
        ["event_type", "type"]
            .into_iter()
            .filter_map(|key| self.str_field(key))
            .find(|value| !value.is_empty())
    }

    pub fn id(&self) -> Option<NotificationId> {
        self.0.get("id").and_then(NotificationId::from_value)
    }
}

// ─── Feed item ────────────────────────────────────────────────────

/// Canonical feed entry. `text` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NotificationId>,
    pub text: String,
    pub time: DateTime<Utc>,
}

// ─── Connection state ─────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
