//! Plain-text rendering of the feed for the terminal.

use chrono::{DateTime, Utc};
use notifeed_core::{ConnectionState, FeedState, NotificationItem};

/// Whether to emit ANSI colors. `auto` follows the terminal and honours
/// `NO_COLOR`.
pub fn resolve_color(color: &str) -> bool {
    use std::io::IsTerminal;
    match color {
        "always" => true,
        "never" => false,
        _ => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
    }
}

/// Age label for a notification: "just now", "5m ago", "3h ago", "2d ago",
/// then the calendar date once it is a week old. Timestamps ahead of `now`
/// (server clock skew) read as "just now".
pub fn age_label(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - time).num_seconds();
    match secs {
        ..60 => "just now".to_string(),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86_400 => format!("{}h ago", secs / 3600),
        86_400..604_800 => format!("{}d ago", secs / 86_400),
        _ => time.format("%Y-%m-%d").to_string(),
    }
}

pub fn format_item(item: &NotificationItem, now: DateTime<Utc>, use_color: bool) -> String {
    let age = age_label(item.time, now);
    if use_color {
        format!("\x1b[2m{age:>10}\x1b[0m  {}", item.text)
    } else {
        format!("{age:>10}  {}", item.text)
    }
}

fn state_marker(state: ConnectionState, use_color: bool) -> String {
    if !use_color {
        return state.to_string();
    }
    let code = match state {
        ConnectionState::Connected => "32",
        ConnectionState::Connecting => "33",
        ConnectionState::Disconnected => "31",
    };
    format!("\x1b[{code}m{state}\x1b[0m")
}

/// Header line: connection state, unseen bell, loading and last error.
pub fn format_status(state: &FeedState, use_color: bool) -> String {
    let mut line = format!("[{}]", state_marker(state.connection_state, use_color));
    if state.unseen {
        line.push_str(" *new*");
    }
    if state.loading {
        line.push_str(" loading…");
    }
    if let Some(err) = &state.last_error {
        line.push_str(&format!(" error: {err}"));
    }
    line
}

/// Status line followed by the newest `limit` items.
pub fn format_feed(state: &FeedState, limit: usize, now: DateTime<Utc>, use_color: bool) -> String {
    let mut out = format_status(state, use_color);
    out.push('\n');
    if state.items.is_empty() {
        out.push_str("(no notifications)");
        return out;
    }
    let lines: Vec<String> = state
        .items
        .iter()
        .take(limit)
        .map(|item| format_item(item, now, use_color))
        .collect();
    out.push_str(&lines.join("\n"));
    if state.items.len() > limit {
        out.push_str(&format!("\n… {} more", state.items.len() - limit));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(text: &str, secs_ago: i64, now: DateTime<Utc>) -> NotificationItem {
        NotificationItem {
            id: None,
            text: text.to_string(),
            time: now - chrono::Duration::seconds(secs_ago),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn age_label_recent_buckets() {
        let now = now();
        let ago = |secs| now - chrono::Duration::seconds(secs);
        assert_eq!(age_label(ago(30), now), "just now");
        assert_eq!(age_label(ago(180), now), "3m ago");
        assert_eq!(age_label(ago(7200), now), "2h ago");
        assert_eq!(age_label(ago(86_400 * 3), now), "3d ago");
    }

    #[test]
    fn age_label_switches_to_date_after_a_week() {
        let now = now();
        let old = now - chrono::Duration::days(40);
        assert_eq!(age_label(old, now), "2024-03-22");
    }

    #[test]
    fn future_timestamp_reads_as_just_now() {
        let now = now();
        assert_eq!(age_label(now + chrono::Duration::minutes(5), now), "just now");
    }

    #[test]
    fn resolve_color_explicit_modes() {
        assert!(resolve_color("always"));
        assert!(!resolve_color("never"));
    }

    #[test]
    fn item_line_without_color() {
        let now = now();
        let line = format_item(&item("Referral accepted", 300, now), now, false);
        assert_eq!(line, "    5m ago  Referral accepted");
    }

    #[test]
    fn status_shows_bell_and_error() {
        let state = FeedState {
            unseen: true,
            connection_state: ConnectionState::Connecting,
            last_error: Some("live channel error: refused".into()),
            ..FeedState::default()
        };
        assert_eq!(
            format_status(&state, false),
            "[connecting] *new* error: live channel error: refused"
        );
    }

    #[test]
    fn feed_truncates_to_limit() {
        let now = now();
        let state = FeedState {
            items: vec![item("a", 0, now), item("b", 0, now), item("c", 0, now)],
            ..FeedState::default()
        };
        let out = format_feed(&state, 2, now, false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[disconnected]");
        assert!(lines[1].ends_with("a"));
        assert!(lines[2].ends_with("b"));
        assert_eq!(lines[3], "… 1 more");
    }

    #[test]
    fn empty_feed_placeholder() {
        let out = format_feed(&FeedState::default(), 10, now(), false);
        assert!(out.ends_with("(no notifications)"));
    }
}
