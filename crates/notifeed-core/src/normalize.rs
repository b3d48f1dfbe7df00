//! Payload normalizer: raw server payload to [`NotificationItem`].

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::filter::matches;
use crate::types::{NotificationItem, RawPayload};

/// Separator between the text components.
pub const TEXT_SEPARATOR: &str = " — ";

/// Text used when a payload carries no title, message or event.
pub const FALLBACK_TEXT: &str = "Notification";

const TEXT_FIELDS: [&str; 3] = ["title", "message", "event"];

/// Join the non-empty `title`, `message` and `event` fields, in that order.
#[must_use]
pub fn compose_text(raw: &RawPayload) -> String {
    let parts: Vec<&str> = TEXT_FIELDS
        .iter()
        .filter_map(|field| raw.str_field(field))
        .filter(|value| !value.is_empty())
        .collect();

    if parts.is_empty() {
        FALLBACK_TEXT.to_string()
    } else {
        parts.join(TEXT_SEPARATOR)
    }
}

/// Parse `created_at`. RFC 3339 first; a bare `YYYY-MM-DDTHH:MM:SS[.f]`
/// is read as UTC.
#[must_use]
pub fn parse_created_at(raw: &RawPayload) -> Option<DateTime<Utc>> {
    let value = raw.str_field("created_at")?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Normalize a payload. Never fails: missing text falls back to
/// [`FALLBACK_TEXT`], a missing or unparseable `created_at` to `now`.
#[must_use]
pub fn normalize(raw: &RawPayload, now: DateTime<Utc>) -> NotificationItem {
    NotificationItem {
        id: raw.id(),
        text: compose_text(raw),
        time: parse_created_at(raw).unwrap_or(now),
    }
}

/// Filter then normalize. `None` when the topic does not belong in the feed.
#[must_use]
pub fn accept(raw: &RawPayload, now: DateTime<Utc>) -> Option<NotificationItem> {
    matches(raw).then(|| normalize(raw, now))
}
