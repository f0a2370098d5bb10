//! The live sync channel: transport events in, typed events out.
//!
//! The channel sits between a transport (out of scope here; anything that
//! can produce text messages on an mpsc) and any number of reactors
//! subscribed to a broadcast bus. Messages are demultiplexed strictly in
//! arrival order. The channel never reconnects: an error or closure
//! transitions it to `Closed` for good, and editing continues without live
//! sync.

use inkpad_types::LiveEvent;
use tokio::sync::{broadcast, mpsc, watch};

use crate::protocol::{parse_message, ProtocolError};

const BUS_CAPACITY: usize = 64;

/// Connection lifecycle of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Transport not yet confirmed open.
    Connecting,
    /// Receiving messages.
    Open,
    /// Terminal. No reconnect.
    Closed,
}

/// What the transport layer reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established.
    Opened,
    /// One inbound text message.
    Message(String),
    /// Abnormal transport failure.
    Error(String),
    /// Orderly shutdown.
    Closed,
}

/// Demultiplexes a transport's message stream onto a typed event bus.
///
/// Cheap to clone; clones share the bus and the state.
#[derive(Clone)]
pub struct LiveSyncChannel {
    bus: broadcast::Sender<LiveEvent>,
    state: watch::Sender<ChannelState>,
}

impl LiveSyncChannel {
    /// A channel in the `Connecting` state with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (bus, _) = broadcast::channel(BUS_CAPACITY);
        let (state, _) = watch::channel(ChannelState::Connecting);
        Self { bus, state }
    }

    /// A new subscription to the event bus. Subscribers see every event
    /// published after this call, in publish order.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.bus.subscribe()
    }

    /// Current channel state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// A watch on the channel state, for callers that want to await the
    /// transition to `Closed`.
    #[must_use]
    pub fn state_watch(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// Publishes an already-typed event onto the bus.
    ///
    /// Used by alternate transports that deliver structured events instead
    /// of wire text. Dropped silently when no reactor is subscribed.
    pub fn publish(&self, event: LiveEvent) {
        let _ = self.bus.send(event);
    }

    /// Consumes the transport stream until it errors or closes.
    ///
    /// Messages are parsed and published one at a time, in arrival order.
    /// Unparseable messages are skipped with a log, not fatal.
    pub async fn run(self, mut transport: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = transport.recv().await {
            match event {
                TransportEvent::Opened => {
                    tracing::debug!("live sync channel open");
                    let _ = self.state.send(ChannelState::Open);
                }
                TransportEvent::Message(text) => match parse_message(&text) {
                    Ok(event) => self.publish(event),
                    Err(ProtocolError::UnknownKind(kind)) => {
                        tracing::trace!(%kind, "ignoring unknown live sync message kind");
                    }
                    Err(e) => {
                        tracing::debug!("ignoring malformed live sync message: {e}");
                    }
                },
                TransportEvent::Error(reason) => {
                    tracing::warn!(%reason, "live sync transport failed, channel closed");
                    let _ = self.state.send(ChannelState::Closed);
                    return;
                }
                TransportEvent::Closed => {
                    tracing::debug!("live sync transport closed");
                    let _ = self.state.send(ChannelState::Closed);
                    return;
                }
            }
        }
        // Transport handle dropped without an explicit close.
        tracing::debug!("live sync transport ended");
        let _ = self.state.send(ChannelState::Closed);
    }
}

impl Default for LiveSyncChannel {
    fn default() -> Self {
        Self::new()
    }
}
