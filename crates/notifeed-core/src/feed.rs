//! Bounded, ordered feed state shared by every consumer.
//!
//! Items are kept newest first. Arrival order is authoritative: there is no
//! sort by timestamp and no deduplication by id, so the same notification
//! delivered live and later fetched through history shows up twice.

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionState, NotificationItem};

/// Maximum number of items held; older entries are dropped first.
pub const FEED_CAPACITY: usize = 500;

/// How a batch of items enters the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Replace the whole window (history results).
    Replace,
    /// Insert in front of the existing items (live deliveries). The batch is
    /// expected newest first.
    Prepend,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedState {
    pub items: Vec<NotificationItem>,
    /// Set by live deliveries, cleared only by an explicit acknowledge.
    pub unseen: bool,
    pub connection_state: ConnectionState,
    pub last_error: Option<String>,
    /// A history fetch is in flight.
    pub loading: bool,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch and trim to [`FEED_CAPACITY`].
    pub fn merge(&mut self, items: Vec<NotificationItem>, mode: MergeMode) {
        match mode {
            MergeMode::Replace => self.items = items,
            MergeMode::Prepend => {
                self.items.splice(0..0, items);
            }
        }
        self.items.truncate(FEED_CAPACITY);
    }

    /// A live delivery: prepend one item and raise `unseen`.
    pub fn deliver(&mut self, item: NotificationItem) {
        self.merge(vec![item], MergeMode::Prepend);
        self.unseen = true;
    }

    // The setters below return whether anything changed so the shared store
    // can skip waking subscribers on no-op updates.

    pub fn set_unseen(&mut self, unseen: bool) -> bool {
        replace_if_changed(&mut self.unseen, unseen)
    }

    pub fn set_connection_state(&mut self, state: ConnectionState) -> bool {
        replace_if_changed(&mut self.connection_state, state)
    }

    pub fn set_error(&mut self, error: Option<String>) -> bool {
        replace_if_changed(&mut self.last_error, error)
    }

    pub fn set_loading(&mut self, loading: bool) -> bool {
        replace_if_changed(&mut self.loading, loading)
    }

    pub fn latest(&self) -> Option<&NotificationItem> {
        self.items.first()
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
