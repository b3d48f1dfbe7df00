//! Live channel finite state machine.
//!
//! Pure and side-effect free: [`ChannelMachine::handle`] (or the
//! [`transition`] free function) takes an event and returns the effects the
//! IO layer must execute. Sockets are tagged with a generation so that events
//! from a socket that has already been torn down are ignored.
//!
//! ```text
//! Disconnected --Connect--> Connecting --Opened--> Connected
//!      ^                        |                      |
//!      +-------- Closed --------+----------------------+
//!      (schedules a reconnect unless closed manually)
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::FeedError;
use crate::normalize::accept;
use crate::types::{ConnectionState, NotificationItem, RawPayload};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// First reconnect delay, and the value restored on every successful open.
pub const BACKOFF_FLOOR: Duration = Duration::from_secs(1);

/// Reconnect delay ceiling.
pub const BACKOFF_CEILING: Duration = Duration::from_secs(30);

/// Liveness probe sent right after the socket opens.
pub const PROBE_FRAME: &str = r#"{"type":"ping"}"#;

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Doubling reconnect delay, capped at [`BACKOFF_CEILING`].
///
/// Only a successful open resets it. A manual disconnect followed by a
/// connect that fails again resumes from the delay already reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next: BACKOFF_FLOOR,
        }
    }
}

impl Backoff {
    /// Delay the next reconnect will use.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.next
    }

    /// Take the current delay and double the stored one.
    pub fn advance(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(BACKOFF_CEILING);
        delay
    }

    pub fn reset(&mut self) {
        self.next = BACKOFF_FLOOR;
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Resolved live channel address. `url` embeds the credential; `redacted`
/// is the same address safe to log.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    url: String,
    redacted: String,
}

impl ConnectionTarget {
    pub fn new(url: impl Into<String>, redacted: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            redacted: redacted.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn redacted(&self) -> &str {
        &self.redacted
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("url", &self.redacted)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Events & effects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Explicit connect. `None` when the session has no credential or id.
    Connect(Option<ConnectionTarget>),
    /// The reconnect timer fired; the session was resolved again.
    ReconnectDue(Option<ConnectionTarget>),
    Opened {
        generation: u64,
    },
    Frame {
        generation: u64,
        text: String,
        received_at: DateTime<Utc>,
    },
    Errored {
        generation: u64,
        reason: String,
    },
    Closed {
        generation: u64,
    },
    /// Manual disconnect; the only event that suppresses reconnects.
    Disconnect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEffect {
    /// Connect was refused; log and stay put.
    Refused { reason: String },
    OpenSocket {
        generation: u64,
        target: ConnectionTarget,
    },
    CloseSocket {
        generation: u64,
    },
    SendProbe {
        generation: u64,
    },
    /// Cancel any pending timer and start a new one.
    ScheduleReconnect {
        delay: Duration,
    },
    CancelReconnect,
    SetConnectionState(ConnectionState),
    SetError(Option<String>),
    Deliver(NotificationItem),
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelMachine {
    state: ConnectionState,
    backoff: Backoff,
    manual_close: bool,
    reconnect_pending: bool,
    /// Generation of the most recently opened socket; 0 before the first.
    generation: u64,
    socket_live: bool,
}

/// Result of a pure transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: ChannelMachine,
    pub effects: Vec<ChannelEffect>,
}

/// Pure transition: the machine after `event`, plus the effects to run.
#[must_use]
pub fn transition(machine: &ChannelMachine, event: ChannelEvent) -> Transition {
    let mut next = *machine;
    let effects = next.handle(event);
    Transition { next, effects }
}

impl ChannelMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn manual_close(&self) -> bool {
        self.manual_close
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Disconnected with a reconnect timer pending.
    pub fn is_reconnecting(&self) -> bool {
        self.state == ConnectionState::Disconnected && self.reconnect_pending
    }

    /// Apply `event` in place and return the effects to execute, in order.
    pub fn handle(&mut self, event: ChannelEvent) -> Vec<ChannelEffect> {
        match event {
            ChannelEvent::Connect(target) => self.connect(target),
            ChannelEvent::ReconnectDue(target) => {
                // A timer cancelled after it already fired still delivers.
                if !self.reconnect_pending || self.manual_close {
                    return Vec::new();
                }
                self.reconnect_pending = false;
                self.connect(target)
            }
            ChannelEvent::Opened { generation } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                self.state = ConnectionState::Connected;
                self.backoff.reset();
                vec![
                    ChannelEffect::SetConnectionState(ConnectionState::Connected),
                    ChannelEffect::SetError(None),
                    ChannelEffect::SendProbe { generation },
                ]
            }
            ChannelEvent::Frame {
                generation,
                text,
                received_at,
            } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                RawPayload::parse_frame(&text)
                    .ok()
                    .and_then(|raw| accept(&raw, received_at))
                    .map(ChannelEffect::Deliver)
                    .into_iter()
                    .collect()
            }
            ChannelEvent::Errored { generation, reason } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                vec![ChannelEffect::SetError(Some(
                    FeedError::Connection(reason).to_string(),
                ))]
            }
            ChannelEvent::Closed { generation } => {
                if !self.is_current(generation) {
                    return Vec::new();
                }
                self.socket_live = false;
                self.state = ConnectionState::Disconnected;
                let mut effects =
                    vec![ChannelEffect::SetConnectionState(ConnectionState::Disconnected)];
                if !self.manual_close {
                    self.reconnect_pending = true;
                    effects.push(ChannelEffect::ScheduleReconnect {
                        delay: self.backoff.advance(),
                    });
                }
                effects
            }
            ChannelEvent::Disconnect => {
                self.manual_close = true;
                self.reconnect_pending = false;
                let mut effects = vec![ChannelEffect::CancelReconnect];
                if self.socket_live {
                    self.socket_live = false;
                    effects.push(ChannelEffect::CloseSocket {
                        generation: self.generation,
                    });
                }
                self.state = ConnectionState::Disconnected;
                effects.push(ChannelEffect::SetConnectionState(
                    ConnectionState::Disconnected,
                ));
                effects
            }
        }
    }

    fn connect(&mut self, target: Option<ConnectionTarget>) -> Vec<ChannelEffect> {
        let Some(target) = target else {
            return vec![ChannelEffect::Refused {
                reason: "missing bearer token or user id".to_string(),
            }];
        };

        let mut effects = Vec::new();
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(ChannelEffect::CancelReconnect);
        }
        if self.socket_live {
            effects.push(ChannelEffect::CloseSocket {
                generation: self.generation,
            });
        }

        self.manual_close = false;
        self.generation += 1;
        self.socket_live = true;
        self.state = ConnectionState::Connecting;

        effects.push(ChannelEffect::OpenSocket {
            generation: self.generation,
            target,
        });
        effects.push(ChannelEffect::SetConnectionState(ConnectionState::Connecting));
        effects
    }

    fn is_current(&self, generation: u64) -> bool {
        self.socket_live && generation == self.generation
    }
}
