//! History endpoint request parameters and response parsing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FeedError;
use crate::feed::FEED_CAPACITY;
use crate::normalize::accept;
use crate::types::{NotificationItem, RawPayload};

/// Query for one page of history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub page: u32,
    pub page_size: u32,
    pub unread_only: bool,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            unread_only: false,
        }
    }
}

impl HistoryQuery {
    /// Query-string pairs. `unread_only` is only sent when set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if self.unread_only {
            pairs.push(("unread_only", "true".to_string()));
        }
        pairs
    }
}

/// The two envelope shapes the server uses. `notifications` wins when both
/// are present.
#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    notifications: Option<Vec<Value>>,
    #[serde(default)]
    results: Option<Vec<Value>>,
}

/// Parse a history response body into raw payloads, preserving server order.
/// Array entries that are not objects are skipped.
pub fn parse_history_body(body: &str) -> Result<Vec<RawPayload>, FeedError> {
    let envelope: HistoryEnvelope = serde_json::from_str(body)
        .map_err(|e| FeedError::Transport(format!("invalid response body: {e}")))?;

    let list = envelope
        .notifications
        .or(envelope.results)
        .ok_or_else(|| {
            FeedError::Transport("response has neither `notifications` nor `results`".into())
        })?;

    Ok(list.into_iter().filter_map(RawPayload::from_value).collect())
}

/// Filter and normalize a history page, truncated to [`FEED_CAPACITY`].
#[must_use]
pub fn items_from_history(raws: Vec<RawPayload>, now: DateTime<Utc>) -> Vec<NotificationItem> {
    raws.iter()
        .filter_map(|raw| accept(raw, now))
        .take(FEED_CAPACITY)
        .collect()
}
