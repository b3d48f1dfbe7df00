//! notifeed-core: pure notification feed logic.
//! Topic filtering, payload normalization, history envelope parsing, the
//! bounded feed state and the live channel state machine. No IO, no async.

pub mod channel;
pub mod error;
pub mod feed;
pub mod filter;
pub mod history;
pub mod normalize;
pub mod types;

pub use channel::{
    Backoff, ChannelEffect, ChannelEvent, ChannelMachine, ConnectionTarget, PROBE_FRAME,
    Transition, transition,
};
pub use error::FeedError;
pub use feed::{FEED_CAPACITY, FeedState, MergeMode};
pub use filter::matches;
pub use history::{HistoryQuery, items_from_history, parse_history_body};
pub use normalize::{accept, normalize};
pub use types::{ConnectionState, NotificationId, NotificationItem, RawPayload};
