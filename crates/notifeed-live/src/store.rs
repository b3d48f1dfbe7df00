//! Shared feed store: the single source of truth every consumer reads.
//!
//! Backed by a `watch` channel. Each mutation is applied to the state in one
//! step and published as a whole, so a reader never observes half of a
//! logically related update. Subscribers are only woken when something
//! actually changed.

use std::sync::Arc;

use notifeed_core::{ConnectionState, FeedState, MergeMode, NotificationItem};
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct FeedStore {
    tx: Arc<watch::Sender<FeedState>>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FeedState::new());
        Self { tx: Arc::new(tx) }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> FeedState {
        self.tx.borrow().clone()
    }

    /// Read the current state without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        f(&*self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.tx.subscribe()
    }

    /// Apply `f` atomically; `f` returns whether the state changed.
    pub fn update(&self, f: impl FnOnce(&mut FeedState) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    pub fn merge(&self, items: Vec<NotificationItem>, mode: MergeMode) {
        self.tx.send_modify(|state| state.merge(items, mode));
    }

    pub fn deliver(&self, item: NotificationItem) {
        self.tx.send_modify(|state| state.deliver(item));
    }

    pub fn set_unseen(&self, unseen: bool) -> bool {
        self.update(|state| state.set_unseen(unseen))
    }

    pub fn set_connection_state(&self, connection_state: ConnectionState) -> bool {
        self.update(|state| state.set_connection_state(connection_state))
    }

    pub fn set_error(&self, error: Option<String>) -> bool {
        self.update(|state| state.set_error(error))
    }

    pub fn set_loading(&self, loading: bool) -> bool {
        self.update(|state| state.set_loading(loading))
    }
}
