//! notifeed-live: IO boundary of the notification feed.
//! Owns the websocket channel actor, the history HTTP client and the shared
//! feed store, and exposes them through [`NotificationFeed`].

pub mod config;
pub mod facade;
pub mod history;
pub mod live;
pub mod session;
pub mod store;

#[cfg(test)]
mod testutil;

pub use config::{ConfigError, FeedConfig};
pub use facade::NotificationFeed;
pub use history::HistoryFetcher;
pub use live::LiveChannel;
pub use session::{Credentials, EnvSession, SessionSource, StaticSession};
pub use store::FeedStore;

pub use notifeed_core::{
    ConnectionState, FeedError, FeedState, HistoryQuery, NotificationId, NotificationItem,
};
