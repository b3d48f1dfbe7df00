//! End-to-end feed scenarios replayed through the channel state machine and
//! the feed state, without any socket.

use std::time::Duration;

use chrono::{DateTime, Utc};
use notifeed_core::{
    ChannelEffect, ChannelEvent, ChannelMachine, ConnectionState, ConnectionTarget, FeedState,
    MergeMode, items_from_history, parse_history_body,
};

/// Minimal effect executor: what the IO layer does with the feed, minus IO.
#[derive(Default)]
struct Harness {
    machine: ChannelMachine,
    feed: FeedState,
    scheduled: Vec<Duration>,
    probes: u32,
}

impl Harness {
    fn connected() -> Self {
        let mut h = Self::default();
        h.step(ChannelEvent::Connect(Some(target())));
        h.step(ChannelEvent::Opened { generation: 1 });
        h
    }

    fn step(&mut self, event: ChannelEvent) {
        for effect in self.machine.handle(event) {
            match effect {
                ChannelEffect::SetConnectionState(state) => {
                    self.feed.set_connection_state(state);
                }
                ChannelEffect::SetError(error) => {
                    self.feed.set_error(error);
                }
                ChannelEffect::Deliver(item) => self.feed.deliver(item),
                ChannelEffect::ScheduleReconnect { delay } => self.scheduled.push(delay),
                ChannelEffect::SendProbe { .. } => self.probes += 1,
                ChannelEffect::Refused { .. }
                | ChannelEffect::OpenSocket { .. }
                | ChannelEffect::CloseSocket { .. }
                | ChannelEffect::CancelReconnect => {}
            }
        }
    }

    fn frame(&mut self, text: &str) {
        let generation = self.machine.generation();
        self.step(ChannelEvent::Frame {
            generation,
            text: text.to_string(),
            received_at: Utc::now(),
        });
    }
}

fn target() -> ConnectionTarget {
    ConnectionTarget::new(
        "ws://api.test/ws/notifications/42/?token=t",
        "ws://api.test/ws/notifications/42/?token=REDACTED",
    )
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[test]
fn scenario_a_live_referral_is_delivered() {
    let mut h = Harness::connected();
    assert_eq!(h.feed.connection_state, ConnectionState::Connected);
    assert_eq!(h.probes, 1);

    h.frame(
        r#"{"event_type":"referral.created","title":"New referral","created_at":"2024-01-01T10:00:00Z"}"#,
    );

    assert_eq!(h.feed.items.len(), 1);
    assert_eq!(h.feed.items[0].text, "New referral");
    assert_eq!(h.feed.items[0].time, ts("2024-01-01T10:00:00Z"));
    assert!(h.feed.unseen);
}

#[test]
fn scenario_b_other_topic_changes_nothing() {
    let mut h = Harness::connected();
    let before = h.feed.clone();
    h.frame(r#"{"event_type":"billing.invoice","title":"Invoice ready"}"#);
    assert_eq!(h.feed, before);
    assert!(!h.feed.unseen);
}

#[test]
fn scenario_c_history_keeps_only_referrals_in_server_order() {
    let body = r#"{"notifications":[
        {"id":1,"event_type":"referral.created","title":"r1","created_at":"2024-01-03T00:00:00Z"},
        {"id":2,"event_type":"billing.invoice","title":"b1"},
        {"id":3,"type":"referral.paid","title":"r2","created_at":"2024-01-01T00:00:00Z"},
        {"id":4,"type":"team.invite","title":"t1"},
        {"id":5,"event_type":"REFERRAL.expired","title":"r3","created_at":"2024-01-02T00:00:00Z"}
    ]}"#;

    let mut feed = FeedState::new();
    let items = items_from_history(parse_history_body(body).unwrap(), Utc::now());
    feed.merge(items, MergeMode::Replace);

    let texts: Vec<_> = feed.items.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(texts, vec!["r1", "r2", "r3"]);
    assert!(!feed.unseen);
}

#[test]
fn scenario_c_replace_is_idempotent() {
    let body = r#"{"results":[
        {"id":1,"type":"referral","title":"a","created_at":"2024-01-01T00:00:00Z"},
        {"id":2,"type":"referral","title":"b","created_at":"2024-01-01T00:00:01Z"}
    ]}"#;
    let now = Utc::now();

    let mut feed = FeedState::new();
    feed.merge(items_from_history(parse_history_body(body).unwrap(), now), MergeMode::Replace);
    let first = feed.items.clone();
    feed.merge(items_from_history(parse_history_body(body).unwrap(), now), MergeMode::Replace);
    assert_eq!(feed.items, first);
}

#[test]
fn scenario_d_three_drops_back_off_one_two_four() {
    let mut h = Harness::default();
    h.step(ChannelEvent::Connect(Some(target())));
    for _ in 0..3 {
        let generation = h.machine.generation();
        h.step(ChannelEvent::Errored {
            generation,
            reason: "connection refused".into(),
        });
        h.step(ChannelEvent::Closed { generation });
        h.step(ChannelEvent::ReconnectDue(Some(target())));
    }
    assert_eq!(
        h.scheduled,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    assert_eq!(
        h.feed.last_error.as_deref(),
        Some("live channel error: connection refused")
    );
}

#[test]
fn scenario_e_acknowledge_then_new_delivery() {
    let mut h = Harness::connected();
    h.frame(r#"{"type":"referral.created","title":"one"}"#);
    assert!(h.feed.unseen);

    h.feed.set_unseen(false);
    assert!(!h.feed.unseen);

    h.frame(r#"{"type":"billing.invoice","title":"ignored"}"#);
    assert!(!h.feed.unseen);

    h.frame(r#"{"type":"referral.paid","title":"two"}"#);
    assert!(h.feed.unseen);
    assert_eq!(h.feed.items[0].text, "two");
}

#[test]
fn live_then_history_may_duplicate() {
    let mut h = Harness::connected();
    h.frame(r#"{"id":9,"type":"referral.created","title":"dup"}"#);

    let body = r#"{"notifications":[{"id":9,"type":"referral.created","title":"dup"}]}"#;
    let mut items = items_from_history(parse_history_body(body).unwrap(), Utc::now());
    h.feed.merge(std::mem::take(&mut items), MergeMode::Replace);
    h.frame(r#"{"id":9,"type":"referral.created","title":"dup"}"#);

    assert_eq!(h.feed.items.len(), 2);
    assert!(h.feed.items.iter().all(|i| i.text == "dup"));
}
