//! Live channel manager: runs the channel state machine against a real
//! websocket.
//!
//! One actor task owns the [`ChannelMachine`], the current socket and the
//! single reconnect timer. Socket tasks and the timer never touch shared
//! state; they post events to the actor's inbox, which handles them one at a
//! time in arrival order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use notifeed_core::{
    ChannelEffect, ChannelEvent, ChannelMachine, ConnectionTarget, PROBE_FRAME,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::config::FeedConfig;
use crate::session::SessionSource;
use crate::store::FeedStore;

#[derive(Debug)]
enum Input {
    Connect,
    Disconnect,
    /// Posted by the reconnect timer scheduled as `epoch`.
    ReconnectDue { epoch: u64 },
    Socket { generation: u64, event: SocketEvent },
}

#[derive(Debug)]
enum SocketEvent {
    Opened,
    Frame(String),
    Errored(String),
    Closed,
}

/// Handle to the channel actor. Dropping it stops the actor and closes the
/// socket.
pub struct LiveChannel {
    inbox: mpsc::UnboundedSender<Input>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LiveChannel {
    /// Spawn the actor on the current tokio runtime. Nothing connects until
    /// [`LiveChannel::connect`] is called.
    pub fn spawn(
        config: Arc<FeedConfig>,
        session: Arc<dyn SessionSource>,
        store: FeedStore,
    ) -> Self {
        let (inbox, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let actor = ChannelActor {
            config,
            session,
            store,
            machine: ChannelMachine::new(),
            inbox: inbox.clone(),
            socket: None,
            reconnect_timer: None,
            timer_epoch: 0,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(actor.run(rx));
        Self {
            inbox,
            cancel,
            task,
        }
    }

    pub fn connect(&self) {
        self.post(Input::Connect);
    }

    pub fn disconnect(&self) {
        self.post(Input::Disconnect);
    }

    /// Stop the actor. The socket is closed and no reconnect happens.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    fn post(&self, input: Input) {
        if self.inbox.send(input).is_err() {
            tracing::debug!("live channel: actor already stopped");
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct SocketHandle {
    generation: u64,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

struct ChannelActor {
    config: Arc<FeedConfig>,
    session: Arc<dyn SessionSource>,
    store: FeedStore,
    machine: ChannelMachine,
    inbox: mpsc::UnboundedSender<Input>,
    socket: Option<SocketHandle>,
    reconnect_timer: Option<JoinHandle<()>>,
    timer_epoch: u64,
    cancel: CancellationToken,
}

impl ChannelActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                input = rx.recv() => match input {
                    Some(input) => self.handle(input),
                    None => break,
                },
            }
        }

        self.abort_reconnect();
        if let Some(socket) = self.socket.take() {
            socket.cancel.cancel();
        }
        tracing::debug!("live channel: actor stopped");
    }

    fn handle(&mut self, input: Input) {
        let event = match input {
            Input::Connect => ChannelEvent::Connect(self.resolve_target()),
            Input::ReconnectDue { epoch } => {
                if epoch != self.timer_epoch {
                    tracing::trace!(epoch, "live channel: stale reconnect timer");
                    return;
                }
                self.reconnect_timer = None;
                ChannelEvent::ReconnectDue(self.resolve_target())
            }
            Input::Disconnect => ChannelEvent::Disconnect,
            Input::Socket { generation, event } => match event {
                SocketEvent::Opened => ChannelEvent::Opened { generation },
                SocketEvent::Frame(text) => ChannelEvent::Frame {
                    generation,
                    text,
                    received_at: Utc::now(),
                },
                SocketEvent::Errored(reason) => ChannelEvent::Errored { generation, reason },
                SocketEvent::Closed => ChannelEvent::Closed { generation },
            },
        };

        let frame_generation = match &event {
            ChannelEvent::Frame { generation, .. } => Some(*generation),
            _ => None,
        };
        let effects = self.machine.handle(event);
        if let (Some(generation), true) = (frame_generation, effects.is_empty()) {
            tracing::trace!(generation, "live channel: frame dropped");
        }
        for effect in effects {
            self.apply(effect);
        }
    }

    /// Read the session again; credentials may have rotated.
    fn resolve_target(&self) -> Option<ConnectionTarget> {
        let creds = match self.session.credentials() {
            Ok(creds) => creds,
            Err(e) => {
                tracing::debug!("live channel: {e}");
                return None;
            }
        };
        match self.config.live_target(&creds) {
            Ok(target) => Some(target),
            Err(e) => {
                tracing::warn!("live channel: cannot build address: {e}");
                None
            }
        }
    }

    fn apply(&mut self, effect: ChannelEffect) {
        match effect {
            ChannelEffect::Refused { reason } => {
                tracing::warn!(%reason, "live channel: refusing to connect");
            }
            ChannelEffect::OpenSocket { generation, target } => self.open_socket(generation, target),
            ChannelEffect::CloseSocket { generation } => {
                if let Some(socket) = self.socket.take_if(|s| s.generation == generation) {
                    tracing::info!(generation, "live channel: closing socket");
                    socket.cancel.cancel();
                }
            }
            ChannelEffect::SendProbe { generation } => {
                if let Some(socket) = self.socket.as_ref().filter(|s| s.generation == generation) {
                    let _ = socket.outbound.send(Message::Text(PROBE_FRAME.to_string()));
                }
            }
            ChannelEffect::ScheduleReconnect { delay } => self.schedule_reconnect(delay),
            ChannelEffect::CancelReconnect => self.abort_reconnect(),
            ChannelEffect::SetConnectionState(state) => {
                if self.store.set_connection_state(state) {
                    tracing::info!(state = %state, "live channel: state changed");
                }
            }
            ChannelEffect::SetError(error) => {
                if let Some(reason) = &error {
                    tracing::warn!(%reason, "live channel: error");
                }
                self.store.set_error(error);
            }
            ChannelEffect::Deliver(item) => {
                tracing::debug!(id = ?item.id, "live channel: notification delivered");
                self.store.deliver(item);
            }
        }
    }

    fn open_socket(&mut self, generation: u64, target: ConnectionTarget) {
        tracing::info!(url = %target.redacted(), generation, "live channel: connecting");

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = self.cancel.child_token();
        let link = SocketLink {
            generation,
            inbox: self.inbox.clone(),
        };
        tokio::spawn(run_socket(
            target,
            link,
            self.config.connect_timeout(),
            self.config.heartbeat_interval(),
            outbound_rx,
            cancel.clone(),
        ));

        self.socket = Some(SocketHandle {
            generation,
            outbound,
            cancel,
        });
    }

    /// At most one timer exists: the previous one is aborted first.
    fn schedule_reconnect(&mut self, delay: Duration) {
        self.abort_reconnect();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "live channel: reconnect scheduled");

        self.timer_epoch += 1;
        let epoch = self.timer_epoch;
        let inbox = self.inbox.clone();
        self.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inbox.send(Input::ReconnectDue { epoch });
        }));
    }

    /// Abort the pending timer. A firing it already posted goes stale.
    fn abort_reconnect(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
            self.timer_epoch += 1;
        }
    }
}

/// Posts socket events to the actor, tagged with the socket generation.
struct SocketLink {
    generation: u64,
    inbox: mpsc::UnboundedSender<Input>,
}

impl SocketLink {
    fn report(&self, event: SocketEvent) {
        let _ = self.inbox.send(Input::Socket {
            generation: self.generation,
            event,
        });
    }

    fn fail(&self, reason: String) {
        self.report(SocketEvent::Errored(reason));
        self.report(SocketEvent::Closed);
    }
}

/// One socket's lifetime: connect, pump frames both ways, report closure.
/// Cancellation closes the socket without reporting anything.
async fn run_socket(
    target: ConnectionTarget,
    link: SocketLink,
    connect_timeout: Duration,
    heartbeat: Option<Duration>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    let connecting = tokio::time::timeout(
        connect_timeout,
        tokio_tungstenite::connect_async(target.url()),
    );
    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connecting => result,
    };

    let ws = match connected {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(e)) => return link.fail(e.to_string()),
        Err(_) => {
            return link.fail(format!(
                "connect timed out after {}s",
                connect_timeout.as_secs()
            ));
        }
    };

    tracing::info!(url = %target.redacted(), generation = link.generation, "live channel: open");
    link.report(SocketEvent::Opened);

    let (mut write, mut read) = ws.split();
    let mut heartbeat = heartbeat.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return;
            }
            Some(message) = outbound.recv() => {
                if let Err(e) = write.send(message).await {
                    return link.fail(e.to_string());
                }
            }
            _ = next_tick(&mut heartbeat) => {
                if let Err(e) = write.send(Message::Text(PROBE_FRAME.to_string())).await {
                    return link.fail(e.to_string());
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => link.report(SocketEvent::Frame(text)),
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(generation = link.generation, "live channel: closed by server");
                    return link.report(SocketEvent::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return link.fail(e.to_string()),
            },
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
