//! The feed as seen by the rest of the application.
//!
//! Every failure is reported as state (`last_error`, `connection_state`),
//! never as an error return, so consumers observe the store instead of
//! handling errors.

use std::sync::Arc;

use notifeed_core::{
    ConnectionState, FeedError, FeedState, HistoryQuery, MergeMode, NotificationItem,
};
use tokio::sync::watch;

use crate::config::{ConfigError, FeedConfig};
use crate::history::HistoryFetcher;
use crate::live::LiveChannel;
use crate::session::SessionSource;
use crate::store::FeedStore;

/// One per signed-in session. Dropping it closes the live channel and
/// discards the feed.
pub struct NotificationFeed {
    store: FeedStore,
    history: HistoryFetcher,
    live: LiveChannel,
}

impl NotificationFeed {
    /// Build the feed and spawn its channel actor on the current tokio
    /// runtime. Does not connect.
    pub fn new(config: FeedConfig, session: Arc<dyn SessionSource>) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = FeedStore::new();
        let history = HistoryFetcher::new(&config, Arc::clone(&session))?;
        let live = LiveChannel::spawn(Arc::new(config), session, store.clone());
        Ok(Self {
            store,
            history,
            live,
        })
    }

    pub fn items(&self) -> Vec<NotificationItem> {
        self.store.with(|state| state.items.clone())
    }

    pub fn unseen(&self) -> bool {
        self.store.with(|state| state.unseen)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.store.with(|state| state.connection_state)
    }

    pub fn last_error(&self) -> Option<String> {
        self.store.with(|state| state.last_error.clone())
    }

    pub fn loading(&self) -> bool {
        self.store.with(|state| state.loading)
    }

    pub fn snapshot(&self) -> FeedState {
        self.store.snapshot()
    }

    /// Receiver that wakes on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    /// Fetch one history page and replace the visible window with it.
    ///
    /// Without a session this is a logged no-op. A failed request leaves
    /// `items` untouched and sets `last_error`. `unseen` is never touched.
    pub async fn fetch_history(&self, query: HistoryQuery) {
        let creds = match self.history.session().credentials() {
            Ok(creds) => creds,
            Err(e) => {
                tracing::warn!("history: skipped, {e}");
                return;
            }
        };

        self.store.set_loading(true);
        match self.history.fetch_with(&creds, &query).await {
            Ok(items) => {
                self.store.update(|state| {
                    state.merge(items, MergeMode::Replace);
                    state.set_error(None);
                    state.set_loading(false);
                    true
                });
            }
            Err(e) => {
                tracing::warn!(page = query.page, "history: {e}");
                self.record_failure(e);
            }
        }
    }

    fn record_failure(&self, error: FeedError) {
        self.store.update(|state| {
            let error_changed = state.set_error(Some(error.to_string()));
            state.set_loading(false) || error_changed
        });
    }

    /// Open the live channel. Refused (and logged) without a session.
    pub fn connect(&self) {
        self.live.connect();
    }

    /// Close the live channel and stop reconnecting until the next
    /// [`NotificationFeed::connect`].
    pub fn disconnect(&self) {
        self.live.disconnect();
    }

    /// Clear the unseen flag. Nothing is marked read on the server.
    pub fn acknowledge_seen(&self) {
        self.store.set_unseen(false);
    }

    /// Stop the channel actor for good.
    pub fn shutdown(&self) {
        self.live.shutdown();
    }
}
